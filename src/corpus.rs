//! Corpus loading: namespace walking, parallel reads, front-matter split.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{Config, Namespace};
use crate::error::Error;
use crate::frontmatter;
use crate::types::{CORPUS_DOCUMENT, Diagnostic, DiagnosticKind, DocId, Document};

/// Every document of every namespace, plus the non-document files that
/// relative links may point at.
#[derive(Debug, Default)]
pub struct Corpus {
    /// Non-document files as `(namespace, namespace-relative path)`.
    pub assets: BTreeSet<(String, PathBuf)>,
    /// Problems met while loading (unreadable files).
    pub diagnostics: Vec<Diagnostic>,
    /// Loaded documents, ordered by namespace then path.
    pub documents: Vec<Document>,
}

/// A file found while walking a namespace, not yet read.
struct PendingFile {
    /// Path on disk.
    disk_path: PathBuf,
    /// Namespace name.
    namespace: String,
    /// Path relative to the namespace root.
    relative: PathBuf,
    /// Path relative to the project root.
    source_path: PathBuf,
}

impl Corpus {
    /// Look up a document by its project-root-relative path.
    pub fn find_by_source_path(&self, source_path: &Path) -> Option<DocId> {
        let wanted = normalize_separators(source_path);
        return self
            .documents
            .iter()
            .position(|d| return normalize_separators(&d.source_path) == wanted);
    }

    /// Fetch a document by id.
    pub fn document(&self, id: DocId) -> Option<&Document> {
        return self.documents.get(id);
    }

    /// Whether a namespace contains a non-document file at `path`.
    pub fn has_asset(&self, namespace: &str, path: &Path) -> bool {
        return self.assets.contains(&(namespace.to_string(), path.to_path_buf()));
    }
}

/// Walk one namespace root and sort files into documents-to-read and assets.
///
/// # Errors
///
/// Returns `Error::NamespaceRootMissing` if the root is not a directory.
fn enumerate_namespace(
    project_root: &Path,
    namespace: &Namespace,
    config: &Config,
    pending: &mut Vec<PendingFile>,
    assets: &mut BTreeSet<(String, PathBuf)>,
) -> Result<(), Error> {
    let ns_root = project_root.join(&namespace.root);
    if !ns_root.is_dir() {
        return Err(Error::NamespaceRootMissing {
            namespace: namespace.name.clone(),
            path: namespace.root.clone(),
        });
    }

    let walker = WalkDir::new(&ns_root).sort_by_file_name().into_iter().filter_entry(|e| {
        let relative = e.path().strip_prefix(&ns_root).unwrap_or(e.path());
        let mut relative_str = relative.to_string_lossy().replace('\\', "/");
        if e.file_type().is_dir() {
            relative_str.push('/');
        }
        return config.should_scan(&relative_str);
    });

    for entry in walker {
        let entry = match entry {
            Err(e) => {
                warn!("skipping unreadable directory entry: {e}");
                continue;
            },
            Ok(entry) => entry,
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(&ns_root).unwrap_or(entry.path()).to_path_buf();
        let is_document = relative
            .extension()
            .and_then(|e| return e.to_str())
            .is_some_and(|ext| return config.is_document_extension(ext));

        if is_document {
            pending.push(PendingFile {
                disk_path: entry.path().to_path_buf(),
                namespace: namespace.name.clone(),
                source_path: namespace.root.join(&relative),
                relative,
            });
        } else {
            assets.insert((namespace.name.clone(), relative));
        }
    }

    return Ok(());
}

/// Load every namespace configured under `project_root`.
///
/// Unreadable files become diagnostics on the `<corpus>` pseudo-document and
/// are left out; a missing namespace root aborts the load.
///
/// # Errors
///
/// Returns `Error::NamespaceRootMissing` if any namespace root does not exist.
pub fn load(project_root: &Path, config: &Config) -> Result<Corpus, Error> {
    let mut pending = Vec::new();
    let mut assets = BTreeSet::new();
    for namespace in &config.namespaces {
        enumerate_namespace(project_root, namespace, config, &mut pending, &mut assets)?;
        debug!(namespace = %namespace.name, root = %namespace.root.display(), "namespace enumerated");
    }

    let results: Vec<Result<Document, Diagnostic>> = pending.par_iter().map(read_document).collect();

    let mut corpus = Corpus {
        assets,
        ..Corpus::default()
    };
    for result in results {
        match result {
            Err(diagnostic) => corpus.diagnostics.push(diagnostic),
            Ok(document) => corpus.documents.push(document),
        }
    }

    info!(
        documents = corpus.documents.len(),
        assets = corpus.assets.len(),
        unreadable = corpus.diagnostics.len(),
        "corpus loaded"
    );
    return Ok(corpus);
}

/// Render a path with forward slashes for stable comparisons.
fn normalize_separators(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    return text.strip_prefix("./").map_or_else(|| return text.clone(), String::from);
}

/// Read one file and split its front-matter. Failures become diagnostics.
fn read_document(file: &PendingFile) -> Result<Document, Diagnostic> {
    let content = std::fs::read_to_string(&file.disk_path).map_err(|e| {
        warn!(path = %file.source_path.display(), "unreadable document: {e}");
        return Diagnostic::new(
            CORPUS_DOCUMENT,
            0,
            DiagnosticKind::UnreadableFile,
            format!("cannot read {}: {e}", file.source_path.display()),
        );
    })?;

    let split = frontmatter::split(&content);
    return Ok(Document {
        body: split.body.to_string(),
        body_offset: split.body_offset,
        front_matter: split.front_matter,
        namespace: file.namespace.clone(),
        path: file.relative.clone(),
        source_path: file.source_path.clone(),
    });
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use std::fs;

    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn loads_documents_and_assets_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "docs/b.md", "## B\n");
        write(root, "docs/a/index.mdx", "---\ntitle: A\n---\n## A\n");
        write(root, "docs/a/diagram.png", "png");
        write(root, "docs/notes.txt", "text");

        let config = Config::parse("").unwrap();
        let corpus = load(root, &config).unwrap();

        let paths: Vec<PathBuf> = corpus.documents.iter().map(|d| d.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("a/index.mdx"), PathBuf::from("b.md")]);
        assert_eq!(corpus.documents[0].front_matter.route_override(), None);
        assert!(!corpus.documents[0].front_matter.is_empty());
        assert_eq!(corpus.documents[0].body_offset, 3);
        assert_eq!(corpus.documents[0].source_path, PathBuf::from("docs/a/index.mdx"));
        assert!(corpus.has_asset("current", Path::new("a/diagram.png")));
        assert!(corpus.diagnostics.is_empty());
    }

    #[test]
    fn excluded_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "docs/guide.md", "## G\n");
        write(root, "docs/node_modules/pkg/readme.md", "# junk\n");

        let config = Config::parse("").unwrap();
        let corpus = load(root, &config).unwrap();
        assert_eq!(corpus.documents.len(), 1);
    }

    #[test]
    fn missing_namespace_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::parse("[namespaces]\ncurrent = \"nowhere\"").unwrap();
        let err = load(dir.path(), &config).unwrap_err();
        assert!(matches!(err, Error::NamespaceRootMissing { .. }));
    }

    #[test]
    fn invalid_utf8_is_a_diagnostic_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "docs/ok.md", "## Ok\n");
        fs::write(root.join("docs/bad.md"), [0xff_u8, 0xfe, 0x00]).unwrap();

        let config = Config::parse("").unwrap();
        let corpus = load(root, &config).unwrap();
        assert_eq!(corpus.documents.len(), 1);
        assert_eq!(corpus.diagnostics.len(), 1);
        assert_eq!(corpus.diagnostics[0].kind, DiagnosticKind::UnreadableFile);
        assert_eq!(corpus.diagnostics[0].document, PathBuf::from(CORPUS_DOCUMENT));
    }

    #[test]
    fn versioned_namespaces_load_separately() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "docs/intro.md", "## Now\n");
        write(root, "versions/1.0/intro.md", "## Then\n");

        let config = Config::parse("[namespaces]\n\"1.0\" = \"versions/1.0\"").unwrap();
        let corpus = load(root, &config).unwrap();

        let namespaces: Vec<&str> = corpus.documents.iter().map(|d| d.namespace.as_str()).collect();
        assert_eq!(namespaces, vec!["current", "1.0"]);
        assert_eq!(corpus.find_by_source_path(Path::new("./versions/1.0/intro.md")), Some(1));
    }
}
