/// Crate-level error types for doclinks fatal failures.
///
/// Problems found in the documentation itself are never errors: they are
/// `Diagnostic`s collected into the report. This enum covers only the
/// conditions under which a run cannot proceed.
use std::path::PathBuf;

/// Every variant names the file, namespace, or reason for failure so the
/// rendered message is actionable without a debugger.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The namespace list would lose its mandatory `current` entry.
    #[error("namespace `current` is required and cannot be removed")]
    CurrentNamespaceRequired,

    /// A document file named on the command line is not part of the corpus.
    #[error("document not found in corpus: {}", path.display())]
    DocumentNotFound {
        /// Path as given on the command line.
        path: PathBuf,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of the report failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// A namespace with this name is already configured.
    #[error("namespace `{name}` already exists")]
    NamespaceExists {
        /// Namespace identifier.
        name: String,
    },

    /// A configured namespace root does not exist on disk.
    #[error("namespace `{namespace}` root not found: {}", path.display())]
    NamespaceRootMissing {
        /// Namespace whose root is missing.
        namespace: String,
        /// Root directory that was expected.
        path: PathBuf,
    },

    /// A file could not be parsed (config edits, tree-sitter setup).
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// The HTTP client for external link probing could not be created.
    #[error("external probe setup failed: {reason}")]
    ProbeSetup {
        /// Description of the failure.
        reason: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// No configured namespace matches the given name.
    #[error("unknown namespace: `{name}`")]
    UnknownNamespace {
        /// Namespace identifier that was not found.
        name: String,
    },

    /// The filesystem watcher could not be created or attached.
    #[error("watch failed: {reason}")]
    WatchFailed {
        /// Description of the failure.
        reason: String,
    },
}
