//! One checking pass: load, index, validate, report.
//!
//! Every index is built before validation starts and is only read after.

use std::path::Path;

use rayon::prelude::*;
use tracing::info;

use crate::config::Config;
use crate::corpus::{self, Corpus};
use crate::error::Error;
use crate::headings::{self, PageOutline};
use crate::links;
use crate::probe::{self, HttpProbe, LinkProbe};
use crate::report::{Report, Stats};
use crate::routes::{RouteTable, RouteTableBuilder};
use crate::search::SearchIndex;
use crate::types::{Diagnostic, LinkKind, LinkStatus};
use crate::validator::{CheckedLink, Validator};

/// What `check` should look at.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    /// Probe external `http`/`https` links.
    pub external: bool,
    /// Report heading structure only.
    pub headings_only: bool,
    /// Report links only.
    pub links_only: bool,
}

/// Every index derived from a corpus.
#[derive(Debug)]
pub struct Indexes {
    /// Outline of each document, indexed by `DocId`.
    pub outlines: Vec<PageOutline>,
    /// Collisions found while building the route table.
    pub route_diagnostics: Vec<Diagnostic>,
    /// Namespace-scoped route table.
    pub routes: RouteTable,
    /// Suggestion index.
    pub search: SearchIndex,
}

impl Indexes {
    /// Build outlines (in parallel), the route table, then the search index.
    ///
    /// # Errors
    ///
    /// Returns `Error::ParseFailed` if the markdown grammar cannot be loaded.
    pub fn build(corpus: &Corpus, config: &Config) -> Result<Self, Error> {
        let outlines = corpus
            .documents
            .par_iter()
            .map(|document| return headings::index_document(document, config.min_heading_level))
            .collect::<Result<Vec<PageOutline>, Error>>()?;

        let mut builder = RouteTableBuilder::new(config);
        for (id, document) in corpus.documents.iter().enumerate() {
            builder.add_document(id, document);
        }
        let (routes, route_diagnostics) = builder.build(&corpus.documents);
        let search = SearchIndex::build(&corpus.documents, &outlines, &routes);

        info!(
            headings = outlines.iter().map(|o| return o.headings.len()).sum::<usize>(),
            entries = search.len(),
            collisions = route_diagnostics.len(),
            "indexes built"
        );
        return Ok(Self {
            outlines,
            route_diagnostics,
            routes,
            search,
        });
    }
}

/// Run a full check, probing external links over HTTP when asked.
///
/// # Errors
///
/// Returns fatal errors from loading, indexing, or probe setup.
pub fn run(root: &Path, config: &Config, options: CheckOptions) -> Result<Report, Error> {
    if options.external && !options.headings_only {
        let probe = HttpProbe::new(config.external_timeout_secs)?;
        return run_with_probe(root, config, options, Some(&probe));
    }
    return run_with_probe(root, config, options, None);
}

/// Run a full check with a caller-supplied external probe.
///
/// # Errors
///
/// Returns fatal errors from loading or indexing.
pub fn run_with_probe(
    root: &Path,
    config: &Config,
    options: CheckOptions,
    external: Option<&dyn LinkProbe>,
) -> Result<Report, Error> {
    let corpus = corpus::load(root, config)?;
    let indexes = Indexes::build(&corpus, config)?;

    let mut diagnostics = corpus.diagnostics.clone();
    diagnostics.extend(indexes.route_diagnostics.iter().cloned());
    let mut stats = Stats {
        files: corpus.documents.len(),
        headings: indexes.outlines.iter().map(|o| return o.headings.len()).sum(),
        ..Stats::default()
    };

    if !options.links_only {
        diagnostics.extend(indexes.outlines.iter().flat_map(|o| return o.diagnostics.iter().cloned()));
    }

    if !options.headings_only {
        let validator = Validator::new(config, &corpus, &indexes.outlines, &indexes.routes, &indexes.search);
        let checked = validator.check_all();
        tally(&checked, &mut stats);
        diagnostics.extend(checked.iter().filter_map(|c| return c.resolution.diagnostic.clone()));
        if let Some(probe) = external {
            diagnostics.extend(probe::probe_external(&checked, &corpus, probe));
        }
    }

    let report = Report::new(diagnostics, stats);
    info!(problems = report.len(), files = stats.files, "check finished");
    return Ok(report);
}

/// Count link outcomes into the run statistics.
fn tally(checked: &[CheckedLink], stats: &mut Stats) {
    stats.links = checked.len();
    for item in checked {
        let counter = match (item.resolution.status, item.link.kind) {
            (LinkStatus::Skipped, LinkKind::External) => &mut stats.external,
            (LinkStatus::Skipped, _) => &mut stats.excluded,
            (LinkStatus::Valid, _) => &mut stats.valid,
            (LinkStatus::AmbiguousRoute | LinkStatus::BrokenFragment | LinkStatus::BrokenRoute, _) => &mut stats.invalid,
        };
        *counter = counter.saturating_add(1);

        if item.resolution.status == LinkStatus::BrokenFragment {
            stats.broken_fragments = stats.broken_fragments.saturating_add(1);
        }
        let checked_kind = !matches!(item.link.kind, LinkKind::External | LinkKind::Excluded);
        let has_fragment = links::split_target(&item.link.raw_target).fragment.is_some_and(|f| return !f.is_empty());
        if checked_kind && has_fragment {
            stats.fragment_links = stats.fragment_links.saturating_add(1);
        }
    }
    return;
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::types::DiagnosticKind;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "docs/a.md", "## Intro\n\n#### Deep\n");
        write(
            root,
            "docs/b.md",
            "## B\n\n[ok](/a#intro) [bad](/a#unknown) [gone](/nonexistent) [web](https://example.com/x) [frag](#b)\n",
        );
        dir
    }

    struct DeadProbe;

    impl LinkProbe for DeadProbe {
        fn probe(&self, _url: &str) -> Result<(), String> {
            Err("HTTP 500 Internal Server Error".to_string())
        }
    }

    fn kinds(report: &Report) -> Vec<DiagnosticKind> {
        report.diagnostics().map(|d| d.kind).collect()
    }

    #[test]
    fn full_run_reports_headings_and_links() {
        let dir = project();
        let config = Config::parse("").unwrap();
        let report = run(dir.path(), &config, CheckOptions::default()).unwrap();

        assert_eq!(
            kinds(&report),
            vec![DiagnosticKind::NonConsecutiveHeading, DiagnosticKind::BrokenFragment, DiagnosticKind::BrokenRoute]
        );
        assert_eq!(report.exit_code(), 1);
        assert_eq!(
            report.stats,
            Stats {
                broken_fragments: 1,
                excluded: 0,
                external: 1,
                files: 2,
                fragment_links: 3,
                headings: 2,
                invalid: 2,
                links: 5,
                valid: 2,
            }
        );
    }

    #[test]
    fn links_only_and_headings_only_split_the_work() {
        let dir = project();
        let config = Config::parse("").unwrap();

        let links = CheckOptions { links_only: true, ..CheckOptions::default() };
        let report = run(dir.path(), &config, links).unwrap();
        assert_eq!(kinds(&report), vec![DiagnosticKind::BrokenFragment, DiagnosticKind::BrokenRoute]);

        let headings = CheckOptions { headings_only: true, ..CheckOptions::default() };
        let report = run(dir.path(), &config, headings).unwrap();
        assert_eq!(kinds(&report), vec![DiagnosticKind::NonConsecutiveHeading]);
        assert_eq!(report.stats.links, 0);
    }

    #[test]
    fn external_probe_failures_are_reported() {
        let dir = project();
        let config = Config::parse("").unwrap();
        let options = CheckOptions { external: true, links_only: true, ..CheckOptions::default() };
        let report = run_with_probe(dir.path(), &config, options, Some(&DeadProbe)).unwrap();

        let external: Vec<&Diagnostic> =
            report.diagnostics().filter(|d| d.kind == DiagnosticKind::ExternalLink).collect();
        assert_eq!(external.len(), 1);
        assert_eq!(external[0].document, PathBuf::from("docs/b.md"));
        assert_eq!(external[0].line, 3);
    }

    #[test]
    fn collisions_are_reported_in_every_mode() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/guide.md", "## Guide\n");
        write(dir.path(), "docs/guide/index.md", "## Guide\n");
        let config = Config::parse("").unwrap();

        for options in [
            CheckOptions::default(),
            CheckOptions { headings_only: true, ..CheckOptions::default() },
            CheckOptions { links_only: true, ..CheckOptions::default() },
        ] {
            let report = run(dir.path(), &config, options).unwrap();
            assert_eq!(kinds(&report), vec![DiagnosticKind::RouteCollision]);
        }
    }

    #[test]
    fn clean_corpus_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/index.md", "## Welcome\n\nSee [guide](guide.md#usage).\n");
        write(dir.path(), "docs/guide.md", "## Usage\n\n### Details\n\nBack [home](/).\n");
        let config = Config::parse("").unwrap();
        let report = run(dir.path(), &config, CheckOptions::default()).unwrap();
        assert!(report.is_clean(), "{}", report.render_text(false));
        assert_eq!(report.exit_code(), 0);
    }
}
