//! Heading outline extraction, nesting validation, and slug computation.
//!
//! Headings come from the tree-sitter block grammar, so `#` lines inside
//! code blocks never count. Slugs are page-local: GitHub-style with a running
//! counter for repeated text (`setup`, `setup-1`, `setup-2`).

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tree_sitter::Node;

use crate::error::Error;
use crate::grammar;
use crate::types::{Diagnostic, DiagnosticKind, Document, HeadingNode};

/// `{#custom-id}` at the end of a heading.
static EXPLICIT_ID: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"\s*\{#([^}\s]+)\}\s*$").expect("valid regex"));

/// Optional closing `#` sequence of an ATX heading.
static CLOSING_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"(^|\s+)#+\s*$").expect("valid regex"));

/// `![alt](url)` and `[text](url)`, keeping the visible text.
static INLINE_LINK: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").expect("valid regex"));

/// Inline HTML/JSX tags.
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"</?[A-Za-z][^>]*>").expect("valid regex"));

/// Named and numeric character references.
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").expect("valid regex");
});

/// Heading outline and fragment set of one document.
#[derive(Debug, Clone, Default)]
pub struct PageOutline {
    /// Structural problems found while building the outline.
    pub diagnostics: Vec<Diagnostic>,
    /// Every valid fragment of the page.
    pub fragments: BTreeSet<String>,
    /// Accepted headings in document order.
    pub headings: Vec<HeadingNode>,
}

/// An ATX heading as the parser saw it, before validation.
struct RawHeading {
    /// Number of `#` markers.
    markers: u8,
    /// Zero-based row within the body.
    row: usize,
    /// Unprocessed inline text.
    text: String,
}

/// Append non-blank, non-heading body lines to the deepest heading above them.
fn accumulate_content(body: &str, heading_rows: &BTreeSet<usize>, accepted_rows: &[usize], headings: &mut [HeadingNode]) {
    let mut owner: Option<usize> = None;
    let mut next = 0_usize;
    for (row, line) in body.lines().enumerate() {
        while accepted_rows.get(next).is_some_and(|r| return *r <= row) {
            owner = Some(next);
            next = next.saturating_add(1);
        }
        if heading_rows.contains(&row) || line.trim().is_empty() {
            continue;
        }
        let Some(node) = owner.and_then(|i| return headings.get_mut(i)) else {
            continue;
        };
        node.content.push_str(line.trim());
        node.content.push('\n');
    }
}

/// Validate nesting and assign slugs. Pure function of its inputs, so
/// indexing the same body twice yields the same outline.
fn build_outline(document: &Document, min_level: u8, raw: &[RawHeading]) -> PageOutline {
    let mut outline = PageOutline::default();
    let mut stack: Vec<String> = Vec::new();
    let mut seen: HashMap<String, u32> = HashMap::new();
    let mut accepted_rows: Vec<usize> = Vec::new();

    for heading in raw {
        let line = file_line(document, heading.row);
        if heading.markers < min_level {
            outline.diagnostics.push(Diagnostic::new(
                document.source_path.clone(),
                line,
                DiagnosticKind::HeadingLevel,
                format!("heading level {} is not allowed (headings start at level {min_level})", heading.markers),
            ));
            continue;
        }

        let level = heading.markers.saturating_sub(min_level).saturating_add(1);
        let depth = usize::from(level);
        if depth > stack.len().saturating_add(1) {
            outline.diagnostics.push(Diagnostic::new(
                document.source_path.clone(),
                line,
                DiagnosticKind::NonConsecutiveHeading,
                non_consecutive_message(heading.markers, stack.len(), min_level),
            ));
            continue;
        }
        stack.truncate(depth.saturating_sub(1));

        let cleaned = clean_heading_text(&heading.text);
        let (text, explicit_id) = split_explicit_id(&cleaned);
        let slug = match explicit_id {
            None => unique_slug(&slugify(&text), &mut seen),
            Some(id) => {
                seen.entry(id.clone()).or_insert(1);
                id
            },
        };

        if !slug.is_empty() {
            outline.fragments.insert(slug.clone());
        }
        outline.headings.push(HeadingNode {
            breadcrumbs: stack.clone(),
            content: String::new(),
            level,
            line,
            slug,
            text: text.clone(),
        });
        accepted_rows.push(heading.row);
        stack.push(text);
    }

    let heading_rows: BTreeSet<usize> = raw.iter().map(|h| return h.row).collect();
    accumulate_content(&document.body, &heading_rows, &accepted_rows, &mut outline.headings);
    return outline;
}

/// Strip inline markup from heading text and decode character references.
pub fn clean_heading_text(raw: &str) -> String {
    let text = CLOSING_SEQUENCE.replace(raw.trim(), "");
    let text = INLINE_LINK.replace_all(&text, "$1");
    let text = HTML_TAG.replace_all(&text, "");
    let text: String = text.chars().filter(|c| return !matches!(c, '`' | '*' | '~')).collect();
    return decode_entities(text.trim());
}

/// Walk the block tree and collect every ATX heading outside code blocks.
fn collect_atx_headings(node: Node<'_>, source: &str, out: &mut Vec<RawHeading>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "atx_heading" => {
                if let Some(heading) = raw_heading(child, source) {
                    out.push(heading);
                }
            },
            "fenced_code_block" | "html_block" | "indented_code_block" => {},
            _ => collect_atx_headings(child, source, out),
        }
    }
}

/// Decode the common named references and all numeric ones.
fn decode_entities(text: &str) -> String {
    return ENTITY
        .replace_all(text, |caps: &Captures<'_>| {
            let whole = caps.get(0).map_or("", |m| return m.as_str());
            let name = caps.get(1).map_or("", |m| return m.as_str());
            return decode_entity(name).map_or_else(|| return whole.to_string(), String::from);
        })
        .into_owned();
}

/// Decode one reference body (the part between `&` and `;`).
fn decode_entity(name: &str) -> Option<char> {
    if let Some(hex) = name.strip_prefix("#x").or_else(|| return name.strip_prefix("#X")) {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(dec) = name.strip_prefix('#') {
        return dec.parse::<u32>().ok().and_then(char::from_u32);
    }
    return match name {
        "amp" => Some('&'),
        "apos" => Some('\''),
        "gt" => Some('>'),
        "lt" => Some('<'),
        "nbsp" => Some(' '),
        "quot" => Some('"'),
        _ => None,
    };
}

/// Convert a zero-based body row into a one-based file line.
fn file_line(document: &Document, row: usize) -> u32 {
    let row = u32::try_from(row).unwrap_or(u32::MAX);
    return row.saturating_add(1).saturating_add(document.body_offset);
}

/// Build the outline of one document.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if tree-sitter cannot parse the body.
pub fn index_document(document: &Document, min_level: u8) -> Result<PageOutline, Error> {
    let tree = grammar::parse_markdown(&document.source_path, &document.body)?;
    let mut raw = Vec::new();
    collect_atx_headings(tree.root_node(), &document.body, &mut raw);
    return Ok(build_outline(document, min_level, &raw));
}

/// Count `#` markers from the `atx_hN_marker` child kind.
fn marker_count(heading: Node<'_>) -> Option<u8> {
    let mut cursor = heading.walk();
    return heading.children(&mut cursor).find_map(|c| {
        return c
            .kind()
            .strip_prefix("atx_h")
            .and_then(|rest| return rest.strip_suffix("_marker"))
            .and_then(|n| return n.parse().ok());
    });
}

/// Explain a skipped nesting level in marker terms.
fn non_consecutive_message(markers: u8, open: usize, min_level: u8) -> String {
    if open == 0 {
        return format!("non-consecutive headings: level {markers} heading before any level {min_level} heading");
    }
    let open = u8::try_from(open).unwrap_or(u8::MAX);
    let parent = open.saturating_add(min_level).saturating_sub(1);
    return format!("non-consecutive headings: level {markers} heading follows level {parent}");
}

/// Extract marker count, row, and inline text from an `atx_heading` node.
fn raw_heading(heading: Node<'_>, source: &str) -> Option<RawHeading> {
    let markers = marker_count(heading)?;
    let mut cursor = heading.walk();
    let text = heading
        .children(&mut cursor)
        .find(|c| return c.kind() == "heading_content" || c.kind() == "inline")
        .and_then(|c| return c.utf8_text(source.as_bytes()).ok())
        .unwrap_or("")
        .to_string();
    return Some(RawHeading {
        markers,
        row: heading.start_position().row,
        text,
    });
}

/// Convert heading text to a URL-compatible slug.
/// Lowercase, spaces/non-alphanumeric to hyphens, collapse runs, trim edges.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut result = String::with_capacity(lowered.len());
    let mut prev_hyphen = true; // Start true to trim leading hyphens.

    for c in lowered.chars() {
        if c.is_alphanumeric() {
            result.push(c);
            prev_hyphen = false;
            continue;
        }
        if prev_hyphen {
            continue;
        }
        result.push('-');
        prev_hyphen = true;
    }

    // Trim trailing hyphen.
    if result.ends_with('-') {
        result.pop();
    }
    return result;
}

/// Split a trailing `{#id}` off the heading text.
fn split_explicit_id(text: &str) -> (String, Option<String>) {
    let Some(caps) = EXPLICIT_ID.captures(text) else {
        return (text.to_string(), None);
    };
    let id = caps.get(1).map(|m| return m.as_str().to_string());
    return (EXPLICIT_ID.replace(text, "").trim().to_string(), id);
}

/// Return `base`, or `base-N` for the N-th repeat, never reusing a slug.
fn unique_slug(base: &str, seen: &mut HashMap<String, u32>) -> String {
    if base.is_empty() {
        return String::new();
    }
    let mut suffix = seen.get(base).copied().unwrap_or(0);
    let mut candidate = if suffix == 0 { base.to_string() } else { format!("{base}-{suffix}") };
    while suffix > 0 && seen.contains_key(&candidate) {
        suffix = suffix.saturating_add(1);
        candidate = format!("{base}-{suffix}");
    }
    seen.insert(base.to_string(), suffix.saturating_add(1));
    seen.entry(candidate.clone()).or_insert(1);
    return candidate;
}
