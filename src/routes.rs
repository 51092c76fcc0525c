//! Route derivation and the namespace-scoped route table.
//!
//! Every document gets a primary route from its file path and optional alias
//! routes from front-matter. A route claimed by two documents is kept for
//! traceability but never resolves.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::warn;

use crate::config::Config;
use crate::types::{Diagnostic, DiagnosticKind, DocId, Document};

/// Result of looking up a route in one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// The route is collision-marked; these documents all claim it.
    Ambiguous(&'a [DocId]),
    /// Exactly one document answers the route.
    Found(DocId),
    /// No document answers the route.
    Missing,
}

/// Immutable `namespace → route → documents` map plus the reverse
/// `document → routes` map.
#[derive(Debug, Default)]
pub struct RouteTable {
    /// Routes of each document, indexed by `DocId`.
    by_document: Vec<Vec<String>>,
    /// Claimants of each route, per namespace.
    namespaces: BTreeMap<String, BTreeMap<String, Vec<DocId>>>,
}

/// Write phase of the route table. Consumed by `build`.
pub struct RouteTableBuilder<'a> {
    /// Route derivation settings.
    config: &'a Config,
    /// Table under construction.
    table: RouteTable,
}

impl RouteTable {
    /// Whether a route is claimed by more than one document.
    pub fn is_collision(&self, namespace: &str, route: &str) -> bool {
        return matches!(self.lookup(namespace, route), Lookup::Ambiguous(_));
    }

    /// Resolve a route within a namespace.
    pub fn lookup(&self, namespace: &str, route: &str) -> Lookup<'_> {
        let Some(claimants) = self.namespaces.get(namespace).and_then(|routes| return routes.get(route)) else {
            return Lookup::Missing;
        };
        return match claimants.as_slice() {
            [] => Lookup::Missing,
            [only] => Lookup::Found(*only),
            many => Lookup::Ambiguous(many),
        };
    }

    /// Every `(route, claimants)` pair of a namespace, in route order.
    pub fn namespace_routes(&self, namespace: &str) -> impl Iterator<Item = (&str, &[DocId])> {
        return self
            .namespaces
            .get(namespace)
            .into_iter()
            .flat_map(|routes| return routes.iter().map(|(r, docs)| return (r.as_str(), docs.as_slice())));
    }

    /// Names of every namespace with at least one route.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        return self.namespaces.keys().map(String::as_str);
    }

    /// Routes of one document, primary first.
    pub fn routes_of(&self, document: DocId) -> &[String] {
        return self.by_document.get(document).map_or(&[], Vec::as_slice);
    }
}

impl<'a> RouteTableBuilder<'a> {
    /// Register every route of one document.
    pub fn add_document(&mut self, id: DocId, document: &Document) {
        let explicit = document.front_matter.route_override().map(normalize_alias);
        let replaces = self.config.alias_replaces_primary && explicit.is_some();
        let primary = (!replaces).then(|| return primary_route(&document.path, self.config));
        let aliases = document.front_matter.aliases();

        let mut routes: Vec<String> = Vec::new();
        for route in primary.into_iter().chain(explicit).chain(aliases.iter().map(|a| return normalize_alias(a))) {
            if !routes.contains(&route) {
                routes.push(route);
            }
        }

        let namespace = self.table.namespaces.entry(document.namespace.clone()).or_default();
        for route in &routes {
            let claimants = namespace.entry(route.clone()).or_default();
            if !claimants.contains(&id) {
                claimants.push(id);
            }
        }

        if self.table.by_document.len() <= id {
            self.table.by_document.resize_with(id.saturating_add(1), Vec::new);
        }
        if let Some(slot) = self.table.by_document.get_mut(id) {
            *slot = routes;
        }
    }

    /// Freeze the table and report every collision once.
    pub fn build(self, documents: &[Document]) -> (RouteTable, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        for (namespace, routes) in &self.table.namespaces {
            for (route, claimants) in routes {
                if claimants.len() < 2 {
                    continue;
                }
                let paths: Vec<String> = claimants
                    .iter()
                    .filter_map(|id| return documents.get(*id))
                    .map(|d| return d.source_path.display().to_string())
                    .collect();
                let Some(first) = claimants.first().and_then(|id| return documents.get(*id)) else {
                    continue;
                };
                warn!(%namespace, %route, claimants = claimants.len(), "route collision");
                diagnostics.push(Diagnostic::new(
                    first.source_path.clone(),
                    0,
                    DiagnosticKind::RouteCollision,
                    format!(
                        "route `{route}` in namespace `{namespace}` is claimed by {} documents: {}",
                        claimants.len(),
                        paths.join(", ")
                    ),
                ));
            }
        }
        return (self.table, diagnostics);
    }

    /// Start an empty table.
    pub fn new(config: &'a Config) -> Self {
        return Self {
            config,
            table: RouteTable::default(),
        };
    }
}

/// Collapse a route path: drop empty and `.` segments, strip trailing slash.
pub fn normalize_route(raw: &str) -> String {
    let segments: Vec<&str> = raw.split('/').filter(|s| return !s.is_empty() && *s != ".").collect();
    return format!("/{}", segments.join("/"));
}

/// Normalize a front-matter route: lowercase, leading slash, no trailing slash.
pub fn normalize_alias(raw: &str) -> String {
    return normalize_route(&raw.trim().to_lowercase());
}

/// Derive the primary route of a namespace-relative file path.
pub fn primary_route(path: &Path, config: &Config) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    return route_from_file_path(&text, config);
}

/// Turn a `/`-separated file path into a route: ordering prefixes and the
/// document extension stripped, a trailing index segment dropped.
pub fn route_from_file_path(path: &str, config: &Config) -> String {
    let mut segments: Vec<String> = path
        .split('/')
        .filter(|s| return !s.is_empty() && *s != ".")
        .map(|s| return strip_order_prefix(s).to_string())
        .collect();
    if let Some(last) = segments.pop() {
        let stem = strip_document_extension(&last, config);
        if stem != config.index {
            segments.push(stem.to_string());
        }
    }
    return format!("/{}", segments.join("/"));
}

/// Extension of a route's final segment, when it names a document file.
pub fn has_document_extension(path: &str, config: &Config) -> bool {
    let last = path.rsplit('/').next().unwrap_or(path);
    return last
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| return !stem.is_empty() && config.is_document_extension(ext));
}

/// Remove a configured document extension from a file name.
fn strip_document_extension<'s>(name: &'s str, config: &Config) -> &'s str {
    return match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && config.is_document_extension(ext) => stem,
        _ => name,
    };
}

/// Strip a purely numeric `NN-` ordering prefix, unless nothing would remain.
fn strip_order_prefix(segment: &str) -> &str {
    let Some((prefix, rest)) = segment.split_once('-') else {
        return segment;
    };
    if !prefix.is_empty() && !rest.is_empty() && prefix.chars().all(|c| return c.is_ascii_digit()) {
        return rest;
    }
    return segment;
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::frontmatter;

    fn config() -> Config {
        Config::parse("").unwrap()
    }

    fn doc(path: &str, content: &str) -> Document {
        let split = frontmatter::split(content);
        Document {
            body: split.body.to_string(),
            body_offset: split.body_offset,
            front_matter: split.front_matter,
            namespace: "current".to_string(),
            path: PathBuf::from(path),
            source_path: PathBuf::from("docs").join(path),
        }
    }

    fn table(docs: &[Document], config: &Config) -> (RouteTable, Vec<Diagnostic>) {
        let mut builder = RouteTableBuilder::new(config);
        for (id, d) in docs.iter().enumerate() {
            builder.add_document(id, d);
        }
        builder.build(docs)
    }

    #[test]
    fn primary_routes_strip_prefixes_extensions_and_index() {
        let config = config();
        assert_eq!(primary_route(Path::new("01-intro/02-getting-started.md"), &config), "/intro/getting-started");
        assert_eq!(primary_route(Path::new("guide/index.mdx"), &config), "/guide");
        assert_eq!(primary_route(Path::new("index.md"), &config), "/");
        assert_eq!(primary_route(Path::new("2024-notes.md"), &config), "/notes");
        assert_eq!(primary_route(Path::new("v1.2-notes.md"), &config), "/v1.2-notes");
        assert_eq!(primary_route(Path::new("123.md"), &config), "/123");
    }

    #[test]
    fn aliases_layer_on_top_of_primary() {
        let config = config();
        let docs = vec![doc("intro.md", "---\nslug: /Start/\naliases: [/begin]\n---\n")];
        let (table, diagnostics) = table(&docs, &config);

        assert!(diagnostics.is_empty());
        assert_eq!(table.routes_of(0), &["/intro".to_string(), "/start".to_string(), "/begin".to_string()]);
        assert_eq!(table.lookup("current", "/intro"), Lookup::Found(0));
        assert_eq!(table.lookup("current", "/start"), Lookup::Found(0));
    }

    #[test]
    fn alias_can_replace_primary() {
        let config = Config::parse("alias_replaces_primary = true").unwrap();
        let docs = vec![doc("intro.md", "---\nslug: start\n---\n")];
        let (table, _) = table(&docs, &config);

        assert_eq!(table.lookup("current", "/intro"), Lookup::Missing);
        assert_eq!(table.lookup("current", "/start"), Lookup::Found(0));
    }

    #[test]
    fn colliding_routes_are_marked_and_reported_once() {
        let config = config();
        let docs = vec![doc("guide.md", ""), doc("guide/index.md", ""), doc("other.md", "---\nslug: /guide\n---\n")];
        let (table, diagnostics) = table(&docs, &config);

        assert_eq!(table.lookup("current", "/guide"), Lookup::Ambiguous(&[0, 1, 2]));
        assert!(table.is_collision("current", "/guide"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::RouteCollision);
        assert_eq!(diagnostics[0].document, PathBuf::from("docs/guide.md"));
        assert!(diagnostics[0].message.contains("claimed by 3 documents"));
        assert_eq!(table.lookup("current", "/other"), Lookup::Found(2));
    }

    #[test]
    fn same_document_twice_is_not_a_collision() {
        let config = config();
        let docs = vec![doc("intro.md", "---\nslug: /intro\n---\n")];
        let (table, diagnostics) = table(&docs, &config);
        assert!(diagnostics.is_empty());
        assert_eq!(table.lookup("current", "/intro"), Lookup::Found(0));
    }

    #[test]
    fn namespaces_are_separate() {
        let config = config();
        let mut old = doc("intro.md", "");
        old.namespace = "1.0".to_string();
        let docs = vec![doc("intro.md", ""), old];
        let (table, diagnostics) = table(&docs, &config);

        assert!(diagnostics.is_empty());
        assert_eq!(table.lookup("1.0", "/intro"), Lookup::Found(1));
        assert_eq!(table.namespaces().collect::<Vec<_>>(), vec!["1.0", "current"]);
    }

    #[test]
    fn document_extension_detection() {
        let config = config();
        assert!(has_document_extension("../guide/setup.md", &config));
        assert!(!has_document_extension("../img/logo.png", &config));
        assert!(!has_document_extension("/v1.2/intro", &config));
        assert!(!has_document_extension("/.md", &config));
    }
}
