//! File watcher: runs `check` on startup, then re-runs on documentation changes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};
use tracing::debug;

use crate::commands::{self, CheckArgs};
use crate::config::{self, CONFIG_FILE};
use crate::diagnostics;
use crate::error;

/// Debounce delay between filesystem events and re-check.
const DEBOUNCE_MS: u64 = 100;

/// Every namespace root that exists on disk.
fn collect_watch_dirs(root: &Path, config: &config::Config) -> BTreeSet<PathBuf> {
    return config
        .namespaces
        .iter()
        .map(|ns| return root.join(&ns.root))
        .filter(|dir| return dir.is_dir())
        .collect();
}

/// Create a filesystem watcher that sends events on the given channel.
///
/// # Errors
///
/// Returns `Error::WatchFailed` if the watcher cannot be created.
fn create_watcher(tx: crossbeam_channel::Sender<()>) -> Result<notify::RecommendedWatcher, error::Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
            )
        {
            let _ = tx.send(());
        }
    })
    .map_err(|e| {
        return error::Error::WatchFailed {
            reason: format!("watcher setup failed: {e}"),
        };
    });
}

/// Entry point for the watch command.
///
/// Runs an initial check, then watches every namespace root and the config
/// file, re-checking on changes.
///
/// # Errors
///
/// Returns errors from config loading or watcher setup.
pub fn run(args: &CheckArgs) -> Result<ExitCode, error::Error> {
    let root = PathBuf::from(".");

    eprintln!("watch: initial check");
    let mut last_code = run_check(args);

    let config = config::Config::load(&root)?;
    let watch_dirs = collect_watch_dirs(&root, &config);

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;

    for dir in &watch_dirs {
        watch_path(&mut watcher, dir, RecursiveMode::Recursive)?;
    }
    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() {
        watch_path(&mut watcher, &config_path, RecursiveMode::NonRecursive)?;
    }

    let dir_count = watch_dirs.len();
    eprintln!("watch: monitoring {dir_count} namespace roots, press Ctrl+C to stop");

    while rx.recv().is_ok() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while rx.recv_timeout(debounce).is_ok() {}
        eprintln!("watch: change detected, re-checking...");
        last_code = run_check(args);
    }

    return Ok(last_code);
}

/// Run check once and print result. Returns the exit code from check.
fn run_check(args: &CheckArgs) -> ExitCode {
    return match commands::check(args) {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(2_u8)
        },
    };
}

/// Register one path with the watcher.
///
/// # Errors
///
/// Returns `Error::WatchFailed` if the path cannot be watched.
fn watch_path(watcher: &mut impl notify::Watcher, path: &Path, mode: RecursiveMode) -> Result<(), error::Error> {
    watcher.watch(path, mode).map_err(|e| {
        return error::Error::WatchFailed {
            reason: format!("cannot watch {}: {e}", path.display()),
        };
    })?;
    debug!(path = %path.display(), "watching");
    return Ok(());
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn only_existing_roots_are_watched() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        let config = config::Config::parse("[namespaces]\n\"1.0\" = \"versions/1.0\"").unwrap();

        let dirs = collect_watch_dirs(dir.path(), &config);
        assert_eq!(dirs.into_iter().collect::<Vec<_>>(), vec![dir.path().join("docs")]);
    }

    #[test]
    fn unwatchable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut watcher = create_watcher(tx).unwrap();

        let missing = dir.path().join(CONFIG_FILE);
        let err = watch_path(&mut watcher, &missing, RecursiveMode::NonRecursive).unwrap_err();
        assert!(matches!(err, error::Error::WatchFailed { .. }));
        assert!(err.to_string().contains(CONFIG_FILE));

        watch_path(&mut watcher, dir.path(), RecursiveMode::Recursive).unwrap();
    }
}
