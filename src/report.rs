//! Diagnostic aggregation and report rendering.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::error::Error;
use crate::types::Diagnostic;

/// Counters printed by `--stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Links whose fragment did not exist on the target page.
    pub broken_fragments: usize,
    /// Links skipped by an ignore prefix or an empty target.
    pub excluded: usize,
    /// Links with a URI scheme.
    pub external: usize,
    /// Documents loaded.
    pub files: usize,
    /// Checked links carrying a fragment.
    pub fragment_links: usize,
    /// Headings accepted into outlines.
    pub headings: usize,
    /// Checked links that failed.
    pub invalid: usize,
    /// Links extracted.
    pub links: usize,
    /// Checked links that resolved.
    pub valid: usize,
}

/// Every diagnostic of a run, deduplicated and ordered by document, line,
/// then message.
#[derive(Debug, Default)]
pub struct Report {
    /// Unique diagnostics in report order.
    diagnostics: BTreeSet<Diagnostic>,
    /// Run counters.
    pub stats: Stats,
}

/// Shape of `--format json` output.
#[derive(Serialize)]
struct JsonReport<'a> {
    /// Diagnostics in report order.
    diagnostics: Vec<&'a Diagnostic>,
    /// Number of documents with at least one diagnostic.
    files_with_problems: usize,
    /// Number of diagnostics.
    problems: usize,
    /// Counters, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<&'a Stats>,
}

impl Report {
    /// Diagnostics in report order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        return self.diagnostics.iter();
    }

    /// Process exit code: 0 when clean, 1 when anything was found.
    pub fn exit_code(&self) -> u8 {
        return u8::from(!self.is_clean());
    }

    /// Number of distinct documents carrying diagnostics.
    fn files_with_problems(&self) -> usize {
        let files: BTreeSet<&Path> = self.diagnostics.iter().map(|d| return d.document.as_path()).collect();
        return files.len();
    }

    /// Whether no diagnostic was produced.
    pub fn is_clean(&self) -> bool {
        return self.diagnostics.is_empty();
    }

    /// Number of unique diagnostics.
    pub fn len(&self) -> usize {
        return self.diagnostics.len();
    }

    /// Collect diagnostics; duplicates collapse. Of two twins, the first
    /// one carrying a suggestion wins.
    pub fn new(diagnostics: impl IntoIterator<Item = Diagnostic>, stats: Stats) -> Self {
        let mut unique: BTreeSet<Diagnostic> = BTreeSet::new();
        for diagnostic in diagnostics {
            let keep_existing = unique
                .get(&diagnostic)
                .is_some_and(|existing: &Diagnostic| return existing.suggestion.is_some() || diagnostic.suggestion.is_none());
            if !keep_existing {
                unique.replace(diagnostic);
            }
        }
        return Self {
            diagnostics: unique,
            stats,
        };
    }

    /// Render as a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if serialization fails.
    pub fn render_json(&self, with_stats: bool) -> Result<String, Error> {
        let report = JsonReport {
            diagnostics: self.diagnostics.iter().collect(),
            files_with_problems: self.files_with_problems(),
            problems: self.diagnostics.len(),
            stats: with_stats.then_some(&self.stats),
        };
        return Ok(serde_json::to_string_pretty(&report)?);
    }

    /// Render as grouped, human-readable text.
    pub fn render_text(&self, with_stats: bool) -> String {
        let mut out = String::new();
        let mut current: Option<&Path> = None;
        for diagnostic in &self.diagnostics {
            if current != Some(diagnostic.document.as_path()) {
                if current.is_some() {
                    out.push('\n');
                }
                let _ = writeln!(out, "{}", diagnostic.document.display());
                current = Some(diagnostic.document.as_path());
            }
            let _ = write!(out, "  {}: [{}] {}", diagnostic.line, diagnostic.kind.label(), diagnostic.message);
            if let Some(suggestion) = &diagnostic.suggestion {
                let _ = write!(out, " (did you mean `{suggestion}`?)");
            }
            out.push('\n');
        }

        if self.is_clean() {
            let _ = writeln!(out, "All {} files clean", self.stats.files);
        } else {
            let _ = writeln!(out, "\n{} problems in {} files", self.diagnostics.len(), self.files_with_problems());
        }

        if with_stats {
            out.push('\n');
            out.push_str(&render_stats(&self.stats));
        }
        return out;
    }
}

/// One `name: value` line per counter.
fn render_stats(stats: &Stats) -> String {
    let rows = [
        ("files processed", stats.files),
        ("headings", stats.headings),
        ("links processed", stats.links),
        ("valid", stats.valid),
        ("invalid", stats.invalid),
        ("fragment links", stats.fragment_links),
        ("broken fragments", stats.broken_fragments),
        ("external", stats.external),
        ("excluded", stats.excluded),
    ];
    let mut out = String::new();
    for (name, value) in rows {
        let _ = writeln!(out, "{name:<17}{value}");
    }
    return out;
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use crate::types::DiagnosticKind;

    fn sample() -> Report {
        let diagnostics = vec![
            Diagnostic::new("docs/b.md", 9, DiagnosticKind::BrokenRoute, "broken link `/x`")
                .with_suggestion(Some("/y".to_string())),
            Diagnostic::new("docs/a.md", 4, DiagnosticKind::HeadingLevel, "h1 not allowed"),
            Diagnostic::new("docs/b.md", 2, DiagnosticKind::BrokenFragment, "broken fragment"),
            Diagnostic::new("docs/b.md", 9, DiagnosticKind::BrokenRoute, "broken link `/x`"),
        ];
        Report::new(diagnostics, Stats { files: 2, ..Stats::default() })
    }

    #[test]
    fn duplicates_collapse_and_order_is_stable() {
        let report = sample();
        assert_eq!(report.len(), 3);
        let order: Vec<(String, u32)> =
            report.diagnostics().map(|d| (d.document.display().to_string(), d.line)).collect();
        assert_eq!(
            order,
            vec![("docs/a.md".to_string(), 4), ("docs/b.md".to_string(), 2), ("docs/b.md".to_string(), 9)]
        );
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn text_groups_by_document() {
        let text = sample().render_text(false);
        let expected = "docs/a.md\n  4: [heading-level] h1 not allowed\n\ndocs/b.md\n  2: [broken-fragment] broken fragment\n  9: [broken-route] broken link `/x` (did you mean `/y`?)\n\n3 problems in 2 files\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn suggestion_survives_either_twin_order() {
        let bare = Diagnostic::new("docs/b.md", 9, DiagnosticKind::BrokenRoute, "broken link `/x`");
        let hinted = bare.clone().with_suggestion(Some("/y".to_string()));

        for order in [vec![bare.clone(), hinted.clone()], vec![hinted.clone(), bare.clone()]] {
            let report = Report::new(order, Stats::default());
            assert_eq!(report.len(), 1);
            let kept = report.diagnostics().next().unwrap();
            assert_eq!(kept.suggestion.as_deref(), Some("/y"));
        }
    }

    #[test]
    fn clean_report_exits_zero_and_stats_always_print() {
        let report = Report::new(Vec::new(), Stats { files: 4, links: 7, valid: 7, ..Stats::default() });
        assert_eq!(report.exit_code(), 0);
        let text = report.render_text(true);
        assert!(text.starts_with("All 4 files clean\n"));
        assert!(text.contains("links processed  7"));
    }

    #[test]
    fn json_has_diagnostics_and_optional_stats() {
        let json: serde_json::Value = serde_json::from_str(&sample().render_json(true).unwrap()).unwrap();
        assert_eq!(json["problems"], 3);
        assert_eq!(json["files_with_problems"], 2);
        assert_eq!(json["diagnostics"][2]["kind"], "broken-route");
        assert_eq!(json["diagnostics"][2]["suggestion"], "/y");
        assert_eq!(json["stats"]["files"], 2);

        let json: serde_json::Value = serde_json::from_str(&sample().render_json(false).unwrap()).unwrap();
        assert!(json.get("stats").is_none());
    }
}
