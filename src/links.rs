//! Link extraction and classification.
//!
//! Links come from a CommonMark parser, so code spans, fenced blocks and
//! indented blocks never yield references. Reference-style links arrive
//! already resolved to their definition's destination.

use std::borrow::Cow;
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use pulldown_cmark::{Event, LinkType, Options, Parser, Tag};
use regex::Regex;

use crate::config::Config;
use crate::types::{DocId, Document, LinkKind, LinkReference};

/// A URI scheme such as `https:` or `mailto:`.
static SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("valid regex");
});

/// A link target split into its parts, percent-decoded. The query string
/// is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetParts<'a> {
    /// Text after `#`, if any.
    pub fragment: Option<Cow<'a, str>>,
    /// Everything before `?` or `#`.
    pub path: Cow<'a, str>,
}

/// Decide how a raw link target is interpreted.
pub fn classify(raw: &str, config: &Config) -> LinkKind {
    let target = raw.trim();
    if target.is_empty() {
        return LinkKind::Excluded;
    }
    if target.starts_with("//") || SCHEME_RE.is_match(target) {
        return LinkKind::External;
    }
    if config.ignore_links.iter().any(|p| return target.starts_with(p.as_str())) {
        return LinkKind::Excluded;
    }
    if target.starts_with('#') {
        return LinkKind::Fragment;
    }
    if target.starts_with('/') {
        return LinkKind::Rooted;
    }
    return LinkKind::Relative;
}

/// Extract every link and image of a document body, in source order.
pub fn extract(source: DocId, document: &Document, config: &Config) -> Vec<LinkReference> {
    let body = document.body.as_str();
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(body.match_indices('\n').map(|(i, _)| return i.saturating_add(1)))
        .collect();

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

    let mut links = Vec::new();
    for (event, range) in Parser::new_ext(body, options).into_offset_iter() {
        let (link_type, dest_url) = match event {
            Event::Start(Tag::Image { link_type, dest_url, .. } | Tag::Link { link_type, dest_url, .. }) => {
                (link_type, dest_url)
            },
            _ => continue,
        };
        let raw_target = if link_type == LinkType::Email {
            format!("mailto:{dest_url}")
        } else {
            dest_url.to_string()
        };
        let body_line = u32::try_from(line_starts.partition_point(|start| return *start <= range.start)).unwrap_or(u32::MAX);
        links.push(LinkReference {
            kind: classify(&raw_target, config),
            line: body_line.saturating_add(document.body_offset),
            raw_target,
            source,
        });
    }
    return links;
}

/// Decode `%XX` escapes. Escapes that do not form UTF-8 stay as written.
fn percent_decode(text: &str) -> Cow<'_, str> {
    return percent_decode_str(text).decode_utf8().unwrap_or(Cow::Borrowed(text));
}

/// Split a target into decoded path and fragment, dropping any query string.
pub fn split_target(raw: &str) -> TargetParts<'_> {
    let target = raw.trim();
    let (before_fragment, fragment) = match target.split_once('#') {
        Some((before, fragment)) => (before, Some(fragment)),
        None => (target, None),
    };
    let path = before_fragment.split_once('?').map_or(before_fragment, |(path, _)| return path);
    return TargetParts {
        fragment: fragment.map(percent_decode),
        path: percent_decode(path),
    };
}
