use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Name of the project configuration file, looked up in the project root.
pub const CONFIG_FILE: &str = ".doclinks.toml";

/// The namespace that always exists and that unprefixed rooted links resolve against.
pub const CURRENT_NAMESPACE: &str = "current";

/// Root directory of the `current` namespace when nothing is configured.
const DEFAULT_CURRENT_ROOT: &str = "docs";

/// Default per-request timeout for the external link probe.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Project configuration loaded from `.doclinks.toml`.
#[derive(Debug, Clone)]
pub struct Config {
    /// When true, an explicit `slug`/`route` replaces the path-derived route.
    pub alias_replaces_primary: bool,
    /// Route prefix the site is served under, stripped from rooted links.
    pub base_path: Option<String>,
    /// Path prefixes (relative to a namespace root) that are never loaded.
    pub exclude: Vec<String>,
    /// File extensions, without the dot, that are treated as documents.
    pub extensions: Vec<String>,
    /// Per-request timeout for the external link probe.
    pub external_timeout_secs: u64,
    /// Link target prefixes that are never resolved.
    pub ignore_links: Vec<String>,
    /// File stem of a directory's index document.
    pub index: String,
    /// Smallest allowed heading marker count.
    pub min_heading_level: u8,
    /// Configured namespaces, `current` first, then by name.
    pub namespaces: Vec<Namespace>,
}

/// One versioned copy of the documentation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Namespace identifier, e.g. `current` or `1.0`.
    pub name: String,
    /// Leading route segment that selects this namespace in rooted links.
    /// `None` for the current namespace.
    pub prefix: Option<String>,
    /// Root directory, relative to the project root.
    pub root: PathBuf,
}

/// Raw TOML structure for `.doclinks.toml`.
#[derive(serde::Deserialize)]
struct DoclinksTomlConfig {
    #[serde(default)]
    alias_replaces_primary: bool,
    #[serde(default)]
    base_path: Option<String>,
    #[serde(default)]
    exclude: Option<Vec<String>>,
    #[serde(default)]
    extensions: Option<Vec<String>>,
    #[serde(default)]
    external: ExternalTomlConfig,
    #[serde(default)]
    ignore_links: Vec<String>,
    #[serde(default)]
    index: Option<String>,
    #[serde(default)]
    min_heading_level: Option<u8>,
    #[serde(default)]
    namespaces: BTreeMap<String, NamespaceTomlEntry>,
}

/// Raw `[external]` table.
#[derive(Default, serde::Deserialize)]
struct ExternalTomlConfig {
    #[serde(default)]
    timeout_secs: Option<u64>,
}

/// A namespace is either a bare root path or a table with an explicit prefix.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum NamespaceTomlEntry {
    /// `name = { path = "...", prefix = "/..." }`
    Full {
        /// Root directory.
        path: String,
        /// Explicit route prefix.
        prefix: Option<String>,
    },
    /// `name = "path"`
    Path(String),
}

impl Config {
    /// Whether `ext` is one of the configured document extensions.
    pub fn is_document_extension(&self, ext: &str) -> bool {
        return self.extensions.iter().any(|e| return e.eq_ignore_ascii_case(ext));
    }

    /// Load config from `.doclinks.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist.
    /// Returns an error if the file exists but is malformed. Never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::parse(""),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Look up a namespace by name.
    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        return self.namespaces.iter().find(|ns| return ns.name == name);
    }

    /// Parse config from TOML text, filling defaults for everything unset.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: DoclinksTomlConfig = toml::from_str(content)?;

        let mut namespaces: Vec<Namespace> = raw
            .namespaces
            .into_iter()
            .map(|(name, entry)| return namespace_from_toml(name, entry))
            .collect();
        if !namespaces.iter().any(|ns| return ns.name == CURRENT_NAMESPACE) {
            namespaces.push(Namespace {
                name: CURRENT_NAMESPACE.to_string(),
                prefix: None,
                root: PathBuf::from(DEFAULT_CURRENT_ROOT),
            });
        }
        namespaces.sort_by(|a, b| {
            return (a.name != CURRENT_NAMESPACE, &a.name).cmp(&(b.name != CURRENT_NAMESPACE, &b.name));
        });

        return Ok(Self {
            alias_replaces_primary: raw.alias_replaces_primary,
            base_path: raw.base_path.map(|p| return trim_route(&p)).filter(|p| return p != "/"),
            exclude: raw.exclude.unwrap_or_else(|| {
                return vec!["node_modules/".to_string(), ".git/".to_string(), "build/".to_string()];
            }),
            extensions: raw
                .extensions
                .unwrap_or_else(|| return vec!["md".to_string(), "mdx".to_string()]),
            external_timeout_secs: raw.external.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ignore_links: raw.ignore_links,
            index: raw.index.unwrap_or_else(|| return "index".to_string()),
            min_heading_level: raw.min_heading_level.unwrap_or(2).clamp(1, 6),
            namespaces,
        });
    }

    /// Check whether a namespace-relative path should be loaded.
    /// A path is skipped if it starts with any exclude prefix.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}

/// Build a namespace from its TOML entry. Non-current namespaces default to
/// a `/<name>` prefix.
fn namespace_from_toml(name: String, entry: NamespaceTomlEntry) -> Namespace {
    let (path, prefix) = match entry {
        NamespaceTomlEntry::Full { path, prefix } => (path, prefix),
        NamespaceTomlEntry::Path(path) => (path, None),
    };
    let prefix = if name == CURRENT_NAMESPACE {
        prefix.map(|p| return trim_route(&p))
    } else {
        Some(trim_route(prefix.as_deref().unwrap_or(&name)))
    };
    return Namespace {
        name,
        prefix: prefix.filter(|p| return p != "/"),
        root: PathBuf::from(path),
    };
}

/// Enforce a leading slash and strip trailing slashes.
fn trim_route(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        return trimmed.to_string();
    }
    return format!("/{trimmed}");
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_has_current_namespace() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.namespaces.len(), 1);
        assert_eq!(config.namespaces[0].name, CURRENT_NAMESPACE);
        assert_eq!(config.namespaces[0].root, PathBuf::from("docs"));
        assert_eq!(config.index, "index");
        assert_eq!(config.min_heading_level, 2);
        assert!(config.is_document_extension("mdx"));
    }

    #[test]
    fn versioned_namespaces_get_default_prefix() {
        let config = Config::parse(
            r#"
            [namespaces]
            "1.0" = "versioned_docs/version-1.0"
            current = "site/docs"
            legacy = { path = "old", prefix = "/archive/" }
            "#,
        )
        .unwrap();

        let names: Vec<&str> = config.namespaces.iter().map(|ns| ns.name.as_str()).collect();
        assert_eq!(names, vec!["current", "1.0", "legacy"]);
        assert_eq!(config.namespace("1.0").unwrap().prefix.as_deref(), Some("/1.0"));
        assert_eq!(config.namespace("legacy").unwrap().prefix.as_deref(), Some("/archive"));
        assert_eq!(config.namespace("current").unwrap().prefix, None);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(Config::parse("index = [").is_err());
    }

    #[test]
    fn base_path_is_normalized() {
        let config = Config::parse("base_path = \"docs/\"").unwrap();
        assert_eq!(config.base_path.as_deref(), Some("/docs"));
    }

    #[test]
    fn exclude_prefixes_skip_paths() {
        let config = Config::parse("exclude = [\"drafts/\"]").unwrap();
        assert!(!config.should_scan("drafts/wip.md"));
        assert!(config.should_scan("guide/intro.md"));
    }
}
