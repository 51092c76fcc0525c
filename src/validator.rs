//! Link resolution against the corpus indexes.
//!
//! Resolution order for a page target: namespace selection, route lookup,
//! then fragment lookup on the target page. A failure at any step yields one
//! diagnostic with a best-effort suggestion from the search index.

use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::config::{CURRENT_NAMESPACE, Config};
use crate::corpus::Corpus;
use crate::headings::PageOutline;
use crate::links::{self, TargetParts};
use crate::routes::{self, Lookup, RouteTable};
use crate::search::{SearchIndex, SearchScope};
use crate::types::{
    CORPUS_DOCUMENT, Diagnostic, DiagnosticKind, DocId, Document, LinkKind, LinkReference, LinkStatus, Resolution,
};

/// A link together with the outcome of resolving it.
#[derive(Debug, Clone)]
pub struct CheckedLink {
    /// The extracted link.
    pub link: LinkReference,
    /// What resolving it produced.
    pub resolution: Resolution,
}

/// What a target path points at inside one namespace.
enum PageLookup {
    /// A claimed route; the route and its claimant count.
    Ambiguous(String, usize),
    /// A non-document file that exists.
    Asset,
    /// Nothing; the route that was tried.
    Missing(String),
    /// Exactly one document.
    Page(DocId),
}

/// Read-only view over every index, shared by all validation threads.
pub struct Validator<'a> {
    /// Project configuration.
    config: &'a Config,
    /// Loaded documents and assets.
    corpus: &'a Corpus,
    /// Outline of each document, indexed by `DocId`.
    outlines: &'a [PageOutline],
    /// Route table.
    routes: &'a RouteTable,
    /// Suggestion index.
    search: &'a SearchIndex,
}

impl<'a> Validator<'a> {
    /// Extract and resolve every link of every document, in document order.
    pub fn check_all(&self) -> Vec<CheckedLink> {
        let per_document: Vec<Vec<CheckedLink>> = self
            .corpus
            .documents
            .par_iter()
            .enumerate()
            .map(|(id, document)| return self.check_document(id, document))
            .collect();
        return per_document.into_iter().flatten().collect();
    }

    /// Extract and resolve the links of one document.
    pub fn check_document(&self, id: DocId, document: &Document) -> Vec<CheckedLink> {
        let checked: Vec<CheckedLink> = links::extract(id, document, self.config)
            .into_iter()
            .map(|link| {
                let resolution = self.resolve(&link);
                trace!(
                    line = link.line,
                    target = %link.raw_target,
                    route = ?resolution.resolved_route,
                    fragment = ?resolution.resolved_fragment,
                    status = ?resolution.status,
                    "link resolved"
                );
                return CheckedLink { link, resolution };
            })
            .collect();
        debug!(document = %document.source_path.display(), links = checked.len(), "links checked");
        return checked;
    }

    /// Bundle the indexes.
    pub const fn new(
        config: &'a Config,
        corpus: &'a Corpus,
        outlines: &'a [PageOutline],
        routes: &'a RouteTable,
        search: &'a SearchIndex,
    ) -> Self {
        return Self {
            config,
            corpus,
            outlines,
            routes,
            search,
        };
    }

    /// Resolve one link.
    pub fn resolve(&self, link: &LinkReference) -> Resolution {
        let parts = links::split_target(&link.raw_target);
        return match link.kind {
            LinkKind::Excluded | LinkKind::External => Resolution::skipped(),
            LinkKind::Fragment => self.check_fragment(link, link.source, parts.fragment.as_deref(), ""),
            LinkKind::Relative => self.resolve_relative(link, &parts),
            LinkKind::Rooted => self.resolve_rooted(link, &parts),
        };
    }

    /// Verify a fragment on a target page. An absent or empty fragment
    /// means the top of the page.
    fn check_fragment(&self, link: &LinkReference, target: DocId, fragment: Option<&str>, written_path: &str) -> Resolution {
        let route = self.routes.routes_of(target).first().cloned();
        let Some(fragment) = fragment.filter(|f| return !f.is_empty()) else {
            return valid(route, None);
        };
        let exists = self.outlines.get(target).is_some_and(|o| return o.fragments.contains(fragment));
        if exists {
            return valid(route, Some(fragment.to_string()));
        }

        let suggestion = self
            .search
            .best_match(fragment, SearchScope::Document(target))
            .and_then(|entry| return entry.fragment.as_ref())
            .map(|slug| return format!("{written_path}#{slug}"));
        let page = self
            .corpus
            .document(target)
            .map_or_else(|| return CORPUS_DOCUMENT.to_string(), |d| return d.source_path.display().to_string());
        let diagnostic = self
            .diagnostic(
                link,
                DiagnosticKind::BrokenFragment,
                format!("broken fragment in `{}`: no heading `#{fragment}` in {page}", link.raw_target),
            )
            .with_suggestion(suggestion);
        return Resolution {
            diagnostic: Some(diagnostic),
            resolved_fragment: Some(fragment.to_string()),
            resolved_route: route,
            status: LinkStatus::BrokenFragment,
        };
    }

    /// Diagnostic located at a link.
    fn diagnostic(&self, link: &LinkReference, kind: DiagnosticKind, message: String) -> Diagnostic {
        let document = self
            .corpus
            .document(link.source)
            .map_or_else(|| return Path::new(CORPUS_DOCUMENT).to_path_buf(), |d| return d.source_path.clone());
        return Diagnostic::new(document, link.line, kind, message);
    }

    /// Turn a lookup into a resolution, checking the fragment on success.
    fn finish(&self, link: &LinkReference, lookup: PageLookup, namespace: &str, parts: &TargetParts<'_>) -> Resolution {
        return match lookup {
            PageLookup::Ambiguous(route, claimants) => {
                let diagnostic = self.diagnostic(
                    link,
                    DiagnosticKind::AmbiguousRoute,
                    format!(
                        "ambiguous link `{}`: route `{route}` in namespace `{namespace}` is claimed by {claimants} documents",
                        link.raw_target
                    ),
                );
                Resolution {
                    diagnostic: Some(diagnostic),
                    resolved_fragment: parts.fragment.as_deref().map(String::from),
                    resolved_route: None,
                    status: LinkStatus::AmbiguousRoute,
                }
            },
            PageLookup::Asset => valid(None, None),
            PageLookup::Missing(route) => {
                let suggestion = self
                    .search
                    .best_match(&parts.path, SearchScope::Namespace(namespace))
                    .map(|entry| return self.public_route(namespace, &entry.route));
                let diagnostic = self
                    .diagnostic(
                        link,
                        DiagnosticKind::BrokenRoute,
                        format!(
                            "broken link `{}`: nothing at `{route}` in namespace `{namespace}`",
                            link.raw_target
                        ),
                    )
                    .with_suggestion(suggestion);
                Resolution {
                    diagnostic: Some(diagnostic),
                    resolved_fragment: None,
                    resolved_route: None,
                    status: LinkStatus::BrokenRoute,
                }
            },
            PageLookup::Page(id) => self.check_fragment(link, id, parts.fragment.as_deref(), &parts.path),
        };
    }

    /// Whether the last segment carries a non-document extension.
    fn is_asset_path(&self, path: &str) -> bool {
        let last = path.rsplit('/').next().unwrap_or(path);
        return last
            .rsplit_once('.')
            .is_some_and(|(stem, ext)| return !stem.is_empty() && !self.config.is_document_extension(ext));
    }

    /// Find what a namespace-relative path or route names.
    fn lookup_path(&self, namespace: &str, path: &str) -> PageLookup {
        if self.is_asset_path(path) && self.corpus.has_asset(namespace, Path::new(path.trim_start_matches('/'))) {
            return PageLookup::Asset;
        }
        let route = if routes::has_document_extension(path, self.config) {
            routes::route_from_file_path(path, self.config)
        } else {
            routes::normalize_route(path)
        };
        return match self.routes.lookup(namespace, &route) {
            Lookup::Ambiguous(claimants) => PageLookup::Ambiguous(route, claimants.len()),
            Lookup::Found(id) => PageLookup::Page(id),
            Lookup::Missing => PageLookup::Missing(route),
        };
    }

    /// How a route of a namespace is written in a rooted link.
    fn public_route(&self, namespace: &str, route: &str) -> String {
        let base = self.config.base_path.as_deref().unwrap_or("");
        let prefix = self.config.namespace(namespace).and_then(|ns| return ns.prefix.as_deref()).unwrap_or("");
        if route == "/" && !(base.is_empty() && prefix.is_empty()) {
            return format!("{base}{prefix}");
        }
        return format!("{base}{prefix}{route}");
    }

    /// Resolve a path relative to the source document's directory, falling
    /// back to the parent of each of the source's routes.
    fn resolve_relative(&self, link: &LinkReference, parts: &TargetParts<'_>) -> Resolution {
        let Some(source) = self.corpus.document(link.source) else {
            return Resolution::skipped();
        };
        if parts.path.is_empty() {
            return self.check_fragment(link, link.source, parts.fragment.as_deref(), "");
        }

        let directory = source
            .path
            .parent()
            .map(|p| return p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        let lookup = join_relative(&directory, &parts.path).map_or_else(
            || return PageLookup::Missing(parts.path.to_string()),
            |joined| return self.lookup_path(&source.namespace, &joined),
        );
        if !matches!(lookup, PageLookup::Missing(_)) {
            return self.finish(link, lookup, &source.namespace, parts);
        }

        for route in self.routes.routes_of(link.source) {
            let parent = route.rsplit_once('/').map_or("", |(parent, _)| return parent);
            let Some(candidate) = join_relative(parent, &parts.path) else {
                continue;
            };
            let fallback = self.lookup_path(&source.namespace, &candidate);
            if !matches!(fallback, PageLookup::Missing(_)) {
                debug!(target = %link.raw_target, via = %route, "relative link resolved against route");
                return self.finish(link, fallback, &source.namespace, parts);
            }
        }
        return self.finish(link, lookup, &source.namespace, parts);
    }

    /// Resolve a `/`-rooted link: strip the base path, pick the namespace,
    /// look up the route.
    fn resolve_rooted(&self, link: &LinkReference, parts: &TargetParts<'_>) -> Resolution {
        let path = self.strip_base_path(&parts.path);
        let (namespace, rest) = self.select_namespace(path);
        let lookup = self.lookup_path(namespace, rest);
        return self.finish(link, lookup, namespace, parts);
    }

    /// Pick the namespace whose prefix leads `path`, returning the rest.
    /// The longest matching prefix wins.
    fn select_namespace<'p>(&self, path: &'p str) -> (&'a str, &'p str) {
        let config: &'a Config = self.config;
        let mut best: Option<(&'a str, usize, &'p str)> = None;
        for namespace in &config.namespaces {
            let Some(prefix) = namespace.prefix.as_deref() else {
                continue;
            };
            let rest = if path == prefix {
                "/"
            } else {
                match path.strip_prefix(prefix) {
                    Some(rest) if rest.starts_with('/') => rest,
                    _ => continue,
                }
            };
            if best.is_none_or(|(_, len, _)| return prefix.len() > len) {
                best = Some((namespace.name.as_str(), prefix.len(), rest));
            }
        }
        return best.map_or((CURRENT_NAMESPACE, path), |(name, _, rest)| return (name, rest));
    }

    /// Remove the configured base path from a rooted link.
    fn strip_base_path<'p>(&self, path: &'p str) -> &'p str {
        let Some(base) = self.config.base_path.as_deref() else {
            return path;
        };
        if path == base {
            return "/";
        }
        return match path.strip_prefix(base) {
            Some(rest) if rest.starts_with('/') => rest,
            _ => path,
        };
    }
}

/// Apply a relative path to a `/`-separated directory. `None` when `..`
/// climbs above the namespace root.
fn join_relative(directory: &str, target: &str) -> Option<String> {
    let mut segments: Vec<&str> = directory.split('/').filter(|s| return !s.is_empty() && *s != ".").collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                segments.pop()?;
            },
            other => segments.push(other),
        }
    }
    return Some(format!("/{}", segments.join("/")));
}

/// A resolution with no problem.
const fn valid(route: Option<String>, fragment: Option<String>) -> Resolution {
    return Resolution {
        diagnostic: None,
        resolved_fragment: fragment,
        resolved_route: route,
        status: LinkStatus::Valid,
    };
}
