/// Core domain types for documents, headings, links, and diagnostics.
use std::cmp::Ordering;
use std::path::PathBuf;

use serde::Serialize;

use crate::frontmatter::FrontMatter;

/// Pseudo-document that carries corpus-level diagnostics (unreadable files).
pub const CORPUS_DOCUMENT: &str = "<corpus>";

/// Index of a document in the loaded corpus. Every index built from the
/// corpus is keyed by this, so it stays valid for the whole run.
pub type DocId = usize;

/// One problem found in the corpus. Identity is `(document, line, message)`:
/// two diagnostics that agree on those are the same diagnostic, whatever
/// their suggestion says.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// File the problem was found in, relative to the project root.
    pub document: PathBuf,
    /// Classification of the problem.
    pub kind: DiagnosticKind,
    /// One-based file line. Zero for whole-document problems.
    pub line: u32,
    /// Human-readable description.
    pub message: String,
    /// Likely intended target, when one could be found.
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Create a diagnostic without a suggestion.
    pub fn new(document: impl Into<PathBuf>, line: u32, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        return Self {
            document: document.into(),
            kind,
            line,
            message: message.into(),
            suggestion: None,
        };
    }

    /// Attach a suggested fix.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: Option<String>) -> Self {
        self.suggestion = suggestion;
        return self;
    }
}

impl Eq for Diagnostic {}

impl Ord for Diagnostic {
    /// Compare by (document, line, message) for deterministic ordering.
    fn cmp(&self, other: &Self) -> Ordering {
        return (&self.document, self.line, &self.message).cmp(&(
            &other.document,
            other.line,
            &other.message,
        ));
    }
}

impl PartialEq for Diagnostic {
    /// Equal when document, line, and message agree.
    fn eq(&self, other: &Self) -> bool {
        return self.cmp(other) == Ordering::Equal;
    }
}

impl PartialOrd for Diagnostic {
    /// Delegate to `Ord` implementation.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

/// What went wrong. Grouped into structural, resolution, and
/// infrastructural problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A link targets a collision-marked route.
    AmbiguousRoute,
    /// A link's fragment is not a heading of the target page.
    BrokenFragment,
    /// A link's route (or relative file) does not exist.
    BrokenRoute,
    /// An external URL failed the liveness probe.
    ExternalLink,
    /// A heading uses fewer markers than the allowed minimum.
    HeadingLevel,
    /// A heading skips a nesting level.
    NonConsecutiveHeading,
    /// Two or more documents claim the same route.
    RouteCollision,
    /// A file could not be read.
    UnreadableFile,
}

impl DiagnosticKind {
    /// Short label used in the text report.
    pub const fn label(self) -> &'static str {
        return match self {
            Self::AmbiguousRoute => "ambiguous-route",
            Self::BrokenFragment => "broken-fragment",
            Self::BrokenRoute => "broken-route",
            Self::ExternalLink => "external-link",
            Self::HeadingLevel => "heading-level",
            Self::NonConsecutiveHeading => "heading-order",
            Self::RouteCollision => "route-collision",
            Self::UnreadableFile => "unreadable",
        };
    }
}

/// One source file of the corpus. Immutable after load.
#[derive(Debug, Clone)]
pub struct Document {
    /// Text after the front-matter block.
    pub body: String,
    /// Lines consumed by the front-matter block; body line `n` is file line
    /// `n + body_offset`.
    pub body_offset: u32,
    /// Parsed front-matter, empty when absent or malformed.
    pub front_matter: FrontMatter,
    /// Namespace the document belongs to.
    pub namespace: String,
    /// Path relative to the namespace root.
    pub path: PathBuf,
    /// Path relative to the project root, used in diagnostics.
    pub source_path: PathBuf,
}

/// One accepted heading of a document outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingNode {
    /// Texts of the enclosing headings, outermost first.
    pub breadcrumbs: Vec<String>,
    /// Non-blank, non-heading body lines that fall under this heading.
    pub content: String,
    /// Logical nesting level; 1 is the outermost allowed heading.
    pub level: u8,
    /// One-based file line.
    pub line: u32,
    /// Fragment identifier.
    pub slug: String,
    /// Heading text with inline markup stripped.
    pub text: String,
}

/// How a link target is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    /// Matches a configured ignore prefix, or is empty.
    Excluded,
    /// Has a URI scheme or is protocol-relative.
    External,
    /// Starts with `#`.
    Fragment,
    /// Resolved against the source document's directory.
    Relative,
    /// Starts with `/`.
    Rooted,
}

/// A hyperlink or image reference extracted from a document.
#[derive(Debug, Clone)]
pub struct LinkReference {
    /// Classification of the target.
    pub kind: LinkKind,
    /// One-based file line where the link starts.
    pub line: u32,
    /// Literal target text inside the link syntax.
    pub raw_target: String,
    /// Document containing the link.
    pub source: DocId,
}

/// Outcome of resolving one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStatus {
    /// The route is claimed by several documents.
    AmbiguousRoute,
    /// The page exists but the fragment does not.
    BrokenFragment,
    /// No page answers the route.
    BrokenRoute,
    /// Not resolved (external or excluded).
    Skipped,
    /// Route and fragment both exist.
    Valid,
}

/// Result of validating one link against the indexes.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Problem to report, if any.
    pub diagnostic: Option<Diagnostic>,
    /// Fragment the link pointed at, when it had one.
    pub resolved_fragment: Option<String>,
    /// Route the link resolved to, when the page exists.
    pub resolved_route: Option<String>,
    /// Final status.
    pub status: LinkStatus,
}

impl Resolution {
    /// A link that was not checked.
    pub const fn skipped() -> Self {
        return Self {
            diagnostic: None,
            resolved_fragment: None,
            resolved_route: None,
            status: LinkStatus::Skipped,
        };
    }
}
