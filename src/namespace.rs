use std::path::{Path, PathBuf};

use crate::config::{self, CONFIG_FILE, CURRENT_NAMESPACE};
use crate::error;

// ── CLI commands ──────────────────────────────────────────────────────

/// List every namespace, `current` first, with its root and route prefix.
///
/// # Errors
///
/// Returns errors from config loading.
pub fn cmd_list() -> Result<(), error::Error> {
    let root = PathBuf::from(".");
    let config = config::Config::load(&root)?;

    for namespace in &config.namespaces {
        match &namespace.prefix {
            None => println!("{} -> {}", namespace.name, namespace.root.display()),
            Some(prefix) => println!("{} -> {} ({prefix})", namespace.name, namespace.root.display()),
        }
    }

    return Ok(());
}

/// Add a namespace to the config file.
///
/// # Errors
///
/// Returns `Error::NamespaceExists` if the name is taken, or errors from
/// config writing.
pub fn cmd_add(name: &str, path: &str, prefix: Option<&str>) -> Result<(), error::Error> {
    let root = PathBuf::from(".");
    add_to_config(&root, name, path, prefix)?;
    eprintln!("Added namespace: {name} -> {path}");
    return Ok(());
}

/// Remove a namespace from the config file.
///
/// # Errors
///
/// Returns `Error::CurrentNamespaceRequired` for `current`, or
/// `Error::UnknownNamespace` if the name isn't configured.
pub fn cmd_remove(name: &str) -> Result<(), error::Error> {
    let root = PathBuf::from(".");
    remove_from_config(&root, name)?;
    eprintln!("Removed namespace: {name}");
    return Ok(());
}

// ── Config file editing ───────────────────────────────────────────────

/// Parse `.doclinks.toml` into a format-preserving document.
/// Returns an empty document if the file doesn't exist.
///
/// # Errors
///
/// Returns `Error::Io` on read failure or `Error::ParseFailed` on parse failure.
fn read_config_doc(root: &Path) -> Result<(PathBuf, toml_edit::DocumentMut), error::Error> {
    let config_path = root.join(CONFIG_FILE);
    let content = match std::fs::read_to_string(&config_path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(error::Error::Io(e)),
        Ok(c) => c,
    };

    let doc: toml_edit::DocumentMut = content.parse().map_err(|e: toml_edit::TomlError| {
        return error::Error::ParseFailed {
            file: config_path.clone(),
            reason: e.to_string(),
        };
    })?;

    return Ok((config_path, doc));
}

/// Add a namespace entry to `.doclinks.toml`, as a bare path or as an
/// inline `{ path, prefix }` table. Creates `[namespaces]` if missing.
///
/// # Errors
///
/// Returns `Error::NamespaceExists` if the key is already present,
/// `Error::ParseFailed` if the config can't be parsed, or `Error::Io` if
/// writing fails.
fn add_to_config(root: &Path, name: &str, namespace_path: &str, prefix: Option<&str>) -> Result<(), error::Error> {
    let (config_path, mut doc) = read_config_doc(root)?;

    if !doc.contains_key("namespaces") {
        doc["namespaces"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let namespaces = doc
        .get_mut("namespaces")
        .and_then(toml_edit::Item::as_table_like_mut)
        .ok_or_else(|| {
            return error::Error::ParseFailed {
                file: config_path.clone(),
                reason: "`namespaces` is not a table".to_string(),
            };
        })?;
    if namespaces.contains_key(name) {
        return Err(error::Error::NamespaceExists { name: name.to_string() });
    }

    let entry = match prefix {
        None => toml_edit::value(namespace_path),
        Some(prefix) => {
            let mut table = toml_edit::InlineTable::new();
            table.insert("path", namespace_path.into());
            table.insert("prefix", prefix.into());
            toml_edit::value(table)
        },
    };
    namespaces.insert(name, entry);

    std::fs::write(&config_path, doc.to_string())?;
    return Ok(());
}

/// Remove a namespace key from `.doclinks.toml`.
///
/// # Errors
///
/// Returns `Error::CurrentNamespaceRequired` for `current`, or
/// `Error::UnknownNamespace` if the name isn't found.
fn remove_from_config(root: &Path, name: &str) -> Result<(), error::Error> {
    if name == CURRENT_NAMESPACE {
        return Err(error::Error::CurrentNamespaceRequired);
    }
    let (config_path, mut doc) = read_config_doc(root)?;

    let namespaces = doc
        .get_mut("namespaces")
        .and_then(toml_edit::Item::as_table_like_mut)
        .ok_or_else(|| {
            return error::Error::UnknownNamespace { name: name.to_string() };
        })?;

    if namespaces.remove(name).is_none() {
        return Err(error::Error::UnknownNamespace { name: name.to_string() });
    }

    std::fs::write(&config_path, doc.to_string())?;
    return Ok(());
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn add_preserves_comments_and_round_trips_through_config() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join(CONFIG_FILE), "# project docs\nindex = \"index\"\n").unwrap();

        add_to_config(root, "1.0", "versions/1.0", None).unwrap();
        add_to_config(root, "2.0", "versions/2.0", Some("/v2")).unwrap();

        let text = fs::read_to_string(root.join(CONFIG_FILE)).unwrap();
        assert!(text.starts_with("# project docs\n"));

        let config = config::Config::load(root).unwrap();
        let names: Vec<&str> = config.namespaces.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["current", "1.0", "2.0"]);
        assert_eq!(config.namespace("1.0").unwrap().prefix.as_deref(), Some("/1.0"));
        assert_eq!(config.namespace("2.0").unwrap().prefix.as_deref(), Some("/v2"));
    }

    #[test]
    fn add_refuses_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        add_to_config(dir.path(), "1.0", "a", None).unwrap();
        let err = add_to_config(dir.path(), "1.0", "b", None).unwrap_err();
        assert!(matches!(err, error::Error::NamespaceExists { .. }));
    }

    #[test]
    fn remove_rules() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        add_to_config(root, "1.0", "versions/1.0", None).unwrap();

        assert!(matches!(remove_from_config(root, "current"), Err(error::Error::CurrentNamespaceRequired)));
        assert!(matches!(remove_from_config(root, "9.9"), Err(error::Error::UnknownNamespace { .. })));

        remove_from_config(root, "1.0").unwrap();
        let config = config::Config::load(root).unwrap();
        assert_eq!(config.namespaces.len(), 1);
    }
}
