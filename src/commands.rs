//! Core CLI commands for doclinks: check, routes, fragments.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::Config;
use crate::corpus;
use crate::error;
use crate::frontmatter::FrontMatter;
use crate::pipeline::{self, CheckOptions, Indexes};
use crate::routes::RouteTable;
use crate::types::{DocId, HeadingNode};

/// Everything `check` (and `watch`) needs from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckArgs {
    /// Report format.
    pub format: OutputFormat,
    /// Which checks to run.
    pub options: CheckOptions,
    /// Print run counters after the report.
    pub stats: bool,
}

/// Report format for `check`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One JSON document.
    Json,
    /// Grouped, human-readable text.
    #[default]
    Text,
}

// ── Commands ──────────────────────────────────────────────────────────

/// Load the corpus, validate headings and links, print the report.
///
/// # Errors
///
/// Returns fatal errors from config loading, corpus loading, indexing, or
/// JSON rendering.
pub fn check(args: &CheckArgs) -> Result<ExitCode, error::Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let report = pipeline::run(&root, &config, args.options)?;

    match args.format {
        OutputFormat::Json => println!("{}", report.render_json(args.stats)?),
        OutputFormat::Text => print!("{}", report.render_text(args.stats)),
    }
    return Ok(ExitCode::from(report.exit_code()));
}

/// Print the outline and fragments of one document.
///
/// # Errors
///
/// Returns `Error::DocumentNotFound` if `file` is not part of any namespace,
/// or fatal errors from loading and indexing.
pub fn fragments(file: &Path) -> Result<ExitCode, error::Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let corpus = corpus::load(&root, &config)?;
    let id = corpus
        .find_by_source_path(file)
        .ok_or_else(|| return error::Error::DocumentNotFound { path: file.to_path_buf() })?;
    let indexes = Indexes::build(&corpus, &config)?;
    let front_matter = corpus.document(id).map(|d| return d.front_matter.clone()).unwrap_or_default();

    print!("{}", render_fragments(id, &front_matter, &indexes));
    return Ok(ExitCode::SUCCESS);
}

/// Print the route table, one namespace at a time, collisions marked.
///
/// # Errors
///
/// Returns `Error::UnknownNamespace` if `namespace` is not configured, or
/// fatal errors from loading and indexing.
pub fn routes(namespace: Option<&str>) -> Result<ExitCode, error::Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    if let Some(name) = namespace
        && config.namespace(name).is_none()
    {
        return Err(error::Error::UnknownNamespace { name: name.to_string() });
    }
    let corpus = corpus::load(&root, &config)?;
    let indexes = Indexes::build(&corpus, &config)?;

    let sources: Vec<String> = corpus.documents.iter().map(|d| return d.source_path.display().to_string()).collect();
    print!("{}", render_routes(&indexes.routes, &sources, namespace));
    let collisions = indexes.route_diagnostics.len();
    return Ok(if collisions == 0 { ExitCode::SUCCESS } else { ExitCode::from(1) });
}

// ── Rendering ─────────────────────────────────────────────────────────

/// Front-matter, routes, then one line per heading indented by level.
fn render_fragments(id: DocId, front_matter: &FrontMatter, indexes: &Indexes) -> String {
    let mut out = String::new();
    if !front_matter.is_empty() {
        out.push_str(&front_matter.render());
    }
    let routes = indexes.routes.routes_of(id);
    if !routes.is_empty() {
        out.push_str(&format!("routes: {}\n\n", routes.join(", ")));
    }

    let headings: &[HeadingNode] = indexes.outlines.get(id).map_or(&[], |o| return o.headings.as_slice());
    if headings.is_empty() {
        out.push_str("(no headings)\n");
    }
    for heading in headings {
        let indent = "  ".repeat(usize::from(heading.level.saturating_sub(1)));
        out.push_str(&format!("{indent}{}  #{}  (line {})\n", heading.text, heading.slug, heading.line));
    }

    if let Some(outline) = indexes.outlines.get(id)
        && !outline.diagnostics.is_empty()
    {
        out.push('\n');
        for diagnostic in &outline.diagnostics {
            out.push_str(&format!("{}: [{}] {}\n", diagnostic.line, diagnostic.kind.label(), diagnostic.message));
        }
    }
    return out;
}

/// Group routes under their namespace; collisions list every claimant.
fn render_routes(table: &RouteTable, sources: &[String], only: Option<&str>) -> String {
    let mut out = String::new();
    for namespace in table.namespaces() {
        if only.is_some_and(|name| return name != namespace) {
            continue;
        }
        out.push_str(&format!("[{namespace}]\n"));
        for (route, claimants) in table.namespace_routes(namespace) {
            let files: Vec<&str> = claimants.iter().filter_map(|id| return sources.get(*id)).map(String::as_str).collect();
            if claimants.len() > 1 {
                out.push_str(&format!("  {route}  COLLISION  {}\n", files.join(", ")));
            } else {
                out.push_str(&format!("  {route}  {}\n", files.join(", ")));
            }
        }
    }
    return out;
}
