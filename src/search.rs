//! Token index over `(namespace, route, fragment)` triples.
//!
//! Only used to suggest a fix for a link that already failed; a match here
//! never makes a link valid.

use std::collections::HashMap;

use crate::headings::PageOutline;
use crate::routes::RouteTable;
use crate::types::{DocId, Document};

/// Score of a query token that equals an index token.
const EXACT_WEIGHT: u32 = 2;

/// Score of a query token within edit-distance tolerance of an index token.
const FUZZY_WEIGHT: u32 = 1;

/// Suffixes removed by the stemmer, longest first.
const SUFFIXES: [&str; 5] = ["ing", "ed", "es", "ly", "s"];

/// Shortest stem the stemmer will leave behind.
const MIN_STEM: usize = 3;

/// One addressable target: a page, or a heading on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEntry {
    /// Document the entry belongs to.
    pub document: DocId,
    /// Heading slug; `None` for the page itself.
    pub fragment: Option<String>,
    /// Namespace of the route.
    pub namespace: String,
    /// Route of the page.
    pub route: String,
    /// Stemmed tokens of route and fragment.
    tokens: Vec<String>,
}

/// Immutable token index with a posting list per term.
#[derive(Debug, Default)]
pub struct SearchIndex {
    /// All entries; posting lists hold indexes into this.
    entries: Vec<SearchEntry>,
    /// Term → entries containing it.
    postings: HashMap<String, Vec<usize>>,
}

/// Which entries a query may return.
#[derive(Debug, Clone, Copy)]
pub enum SearchScope<'a> {
    /// Headings of one document.
    Document(DocId),
    /// Pages of one namespace.
    Namespace(&'a str),
}

impl SearchEntry {
    /// `route` or `route#fragment`.
    pub fn display(&self) -> String {
        return match &self.fragment {
            None => self.route.clone(),
            Some(fragment) => format!("{}#{fragment}", self.route),
        };
    }

    /// Whether the entry is visible in a scope.
    fn in_scope(&self, scope: SearchScope<'_>) -> bool {
        return match scope {
            SearchScope::Document(id) => self.document == id && self.fragment.is_some(),
            SearchScope::Namespace(ns) => self.namespace == ns && self.fragment.is_none(),
        };
    }

    /// Text compared by the edit-distance fallback.
    fn key(&self) -> &str {
        return self.fragment.as_deref().unwrap_or(&self.route);
    }
}

impl SearchIndex {
    /// Return the single best entry for a free-text query within a scope.
    ///
    /// Entries are ranked by token overlap; when nothing overlaps, the entry
    /// whose text is closest by edit distance wins.
    pub fn best_match(&self, query: &str, scope: SearchScope<'_>) -> Option<&SearchEntry> {
        let mut query_tokens = tokenize(query);
        query_tokens.sort();
        query_tokens.dedup();

        let mut scores: HashMap<usize, u32> = HashMap::new();
        for token in &query_tokens {
            for (id, weight) in self.matches_for_token(token, scope) {
                let score = scores.entry(id).or_insert(0);
                *score = score.saturating_add(weight);
            }
        }

        let ranked = scores
            .iter()
            .filter_map(|(id, score)| return self.entries.get(*id).map(|e| return (e, *score)))
            .max_by(|(a, sa), (b, sb)| {
                return sa
                    .cmp(sb)
                    .then_with(|| return b.tokens.len().cmp(&a.tokens.len()))
                    .then_with(|| return b.display().cmp(&a.display()));
            })
            .map(|(entry, _)| return entry);
        if ranked.is_some() {
            return ranked;
        }

        let wanted = query.trim().trim_start_matches(['#', '/']).to_lowercase();
        return self
            .entries
            .iter()
            .filter(|e| return e.in_scope(scope))
            .min_by(|a, b| {
                return edit_distance(&wanted, &a.key().to_lowercase())
                    .cmp(&edit_distance(&wanted, &b.key().to_lowercase()))
                    .then_with(|| return a.display().cmp(&b.display()));
            });
    }

    /// Index every route and every heading of the corpus. Collision-marked
    /// routes are left out: suggesting them would be no fix.
    pub fn build(documents: &[Document], outlines: &[PageOutline], routes: &RouteTable) -> Self {
        let mut index = Self::default();
        for (id, document) in documents.iter().enumerate() {
            let usable: Vec<&String> = routes
                .routes_of(id)
                .iter()
                .filter(|r| return !routes.is_collision(&document.namespace, r))
                .collect();
            for route in &usable {
                index.insert(id, &document.namespace, route, None);
            }
            let Some(route) = usable.first() else {
                continue;
            };
            let Some(outline) = outlines.get(id) else {
                continue;
            };
            for fragment in &outline.fragments {
                index.insert(id, &document.namespace, route, Some(fragment));
            }
        }
        return index;
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    /// Add one entry and its postings.
    fn insert(&mut self, document: DocId, namespace: &str, route: &str, fragment: Option<&str>) {
        let mut tokens = tokenize(route);
        tokens.extend(fragment.map(tokenize).unwrap_or_default());
        tokens.sort();
        tokens.dedup();

        let id = self.entries.len();
        for token in &tokens {
            self.postings.entry(token.clone()).or_default().push(id);
        }
        self.entries.push(SearchEntry {
            document,
            fragment: fragment.map(String::from),
            namespace: namespace.to_string(),
            route: route.to_string(),
            tokens,
        });
    }

    /// Best weight per in-scope entry for one query token.
    fn matches_for_token(&self, token: &str, scope: SearchScope<'_>) -> HashMap<usize, u32> {
        let mut best: HashMap<usize, u32> = HashMap::new();
        for (term, ids) in &self.postings {
            let weight = if term == token {
                EXACT_WEIGHT
            } else if within_tolerance(term, token) {
                FUZZY_WEIGHT
            } else {
                continue;
            };
            for id in ids {
                if !self.entries.get(*id).is_some_and(|e| return e.in_scope(scope)) {
                    continue;
                }
                let slot = best.entry(*id).or_insert(0);
                *slot = (*slot).max(weight);
            }
        }
        return best;
    }
}

/// Levenshtein distance over chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut current = Vec::with_capacity(prev.len());
        current.push(i.saturating_add(1));
        for (j, cb) in b_chars.iter().enumerate() {
            let substitution = prev.get(j).copied().unwrap_or(usize::MAX).saturating_add(usize::from(ca != *cb));
            let deletion = prev.get(j.saturating_add(1)).copied().unwrap_or(usize::MAX).saturating_add(1);
            let insertion = current.last().copied().unwrap_or(usize::MAX).saturating_add(1);
            current.push(substitution.min(deletion).min(insertion));
        }
        prev = current;
    }
    return prev.last().copied().unwrap_or(0);
}

/// Strip one common English suffix, keeping at least `MIN_STEM` chars.
fn stem(token: &str) -> String {
    for suffix in SUFFIXES {
        if let Some(stemmed) = token.strip_suffix(suffix)
            && stemmed.chars().count() >= MIN_STEM
        {
            return stemmed.to_string();
        }
    }
    return token.to_string();
}

/// Split on non-alphanumeric boundaries, lowercase, stem.
pub fn tokenize(text: &str) -> Vec<String> {
    return text
        .split(|c: char| return !c.is_alphanumeric())
        .filter(|t| return !t.is_empty())
        .map(|t| return stem(&t.to_lowercase()))
        .collect();
}

/// Edit-distance tolerance grows with token length; short tokens must match exactly.
fn within_tolerance(term: &str, token: &str) -> bool {
    let len = token.chars().count();
    let allowed = match len {
        0..=3 => return false,
        4 | 5 => 1,
        _ => 2,
    };
    if term.chars().count().abs_diff(len) > allowed {
        return false;
    }
    return edit_distance(term, token) <= allowed;
}
