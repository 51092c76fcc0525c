//! Liveness probing for external `http`/`https` links.
//!
//! Each unique URL is requested once, in parallel, with a bounded timeout.
//! Failures are reported at the URL's first occurrence. No retries.

use std::collections::HashSet;
use std::time::Duration;

use rayon::prelude::*;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use crate::corpus::Corpus;
use crate::error::Error;
use crate::types::{CORPUS_DOCUMENT, Diagnostic, DiagnosticKind, LinkKind, LinkReference};
use crate::validator::CheckedLink;

/// Something that can tell whether a URL is reachable.
pub trait LinkProbe: Sync {
    /// `Ok` when the URL answers with a success status, otherwise the reason.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the URL is unreachable.
    fn probe(&self, url: &str) -> Result<(), String>;
}

/// Probe backed by a blocking HTTP client.
pub struct HttpProbe {
    /// Shared client; connection pool is reused across URLs.
    client: Client,
    /// Per-request timeout, for messages.
    timeout: Duration,
}

impl HttpProbe {
    /// Build a client with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `Error::ProbeSetup` if the TLS backend cannot be initialized.
    pub fn new(timeout_secs: u64) -> Result<Self, Error> {
        let timeout = Duration::from_secs(timeout_secs.max(1));
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(concat!("doclinks/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| return Error::ProbeSetup { reason: e.to_string() })?;
        return Ok(Self { client, timeout });
    }
}

impl LinkProbe for HttpProbe {
    fn probe(&self, url: &str) -> Result<(), String> {
        let describe = |e: reqwest::Error| {
            if e.is_timeout() {
                return format!("timed out after {}s", self.timeout.as_secs());
            }
            return e.to_string();
        };

        let mut status = self.client.head(url).send().map_err(describe)?.status();
        if status == StatusCode::METHOD_NOT_ALLOWED || status == StatusCode::NOT_IMPLEMENTED {
            status = self.client.get(url).send().map_err(describe)?.status();
        }
        if status.is_success() {
            return Ok(());
        }
        return Err(format!("HTTP {} {}", status.as_u16(), status.canonical_reason().unwrap_or("")).trim_end().to_string());
    }
}

/// Probe every unique `http`/`https` URL among the checked links.
pub fn probe_external(checked: &[CheckedLink], corpus: &Corpus, probe: &dyn LinkProbe) -> Vec<Diagnostic> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut first_occurrences: Vec<(&str, &LinkReference)> = Vec::new();
    for item in checked {
        if item.link.kind != LinkKind::External {
            continue;
        }
        let url = item.link.raw_target.split('#').next().unwrap_or(&item.link.raw_target).trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            continue;
        }
        if seen.insert(url) {
            first_occurrences.push((url, &item.link));
        }
    }
    info!(urls = first_occurrences.len(), "probing external links");

    return first_occurrences
        .par_iter()
        .filter_map(|(url, link)| {
            let reason = match probe.probe(url) {
                Ok(()) => {
                    debug!(%url, "external link alive");
                    return None;
                },
                Err(reason) => reason,
            };
            warn!(%url, %reason, "external link failed");
            let document = corpus
                .document(link.source)
                .map_or_else(|| return CORPUS_DOCUMENT.into(), |d| return d.source_path.clone());
            return Some(Diagnostic::new(
                document,
                link.line,
                DiagnosticKind::ExternalLink,
                format!("external link `{url}` failed: {reason}"),
            ));
        })
        .collect();
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;
    use crate::frontmatter::FrontMatter;
    use crate::types::{Document, Resolution};

    struct StubProbe {
        calls: Mutex<Vec<String>>,
        dead: Vec<&'static str>,
    }

    impl LinkProbe for StubProbe {
        fn probe(&self, url: &str) -> Result<(), String> {
            self.calls.lock().unwrap().push(url.to_string());
            if self.dead.contains(&url) { Err("HTTP 404 Not Found".to_string()) } else { Ok(()) }
        }
    }

    fn checked(source: usize, line: u32, target: &str, kind: LinkKind) -> CheckedLink {
        CheckedLink {
            link: LinkReference {
                kind,
                line,
                raw_target: target.to_string(),
                source,
            },
            resolution: Resolution::skipped(),
        }
    }

    fn corpus() -> Corpus {
        let doc = |path: &str| Document {
            body: String::new(),
            body_offset: 0,
            front_matter: FrontMatter::default(),
            namespace: "current".to_string(),
            path: PathBuf::from(path),
            source_path: PathBuf::from("docs").join(path),
        };
        Corpus {
            documents: vec![doc("a.md"), doc("b.md")],
            ..Corpus::default()
        }
    }

    #[test]
    fn unique_urls_probed_once_and_reported_at_first_occurrence() {
        let links = vec![
            checked(0, 3, "https://dead.example/x#frag", LinkKind::External),
            checked(0, 5, "https://ok.example", LinkKind::External),
            checked(1, 1, "https://dead.example/x", LinkKind::External),
            checked(1, 2, "mailto:me@example.com", LinkKind::External),
            checked(1, 4, "/internal", LinkKind::Rooted),
        ];
        let probe = StubProbe {
            calls: Mutex::new(Vec::new()),
            dead: vec!["https://dead.example/x"],
        };
        let diagnostics = probe_external(&links, &corpus(), &probe);

        let mut calls = probe.calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls, vec!["https://dead.example/x", "https://ok.example"]);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::ExternalLink);
        assert_eq!(diagnostics[0].document, PathBuf::from("docs/a.md"));
        assert_eq!(diagnostics[0].line, 3);
        assert!(diagnostics[0].message.contains("404"));
    }

    #[test]
    fn http_probe_builds_with_timeout() {
        assert!(HttpProbe::new(5).is_ok());
    }
}
