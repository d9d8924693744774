//! One-shot scan of the watched tree at startup.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

use crate::evaluator::{PathEvaluator, Verdict};

/// Counters from one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Directories evaluated.
    pub directories: usize,

    /// Regular files evaluated.
    pub files: usize,

    /// Subtrees skipped because they were excluded or ignored.
    pub pruned: usize,

    /// Entries that could not be read.
    pub errors: usize,

    /// Rule applications requested.
    pub fired: usize,

    /// Time taken in milliseconds.
    pub duration_ms: u64,

    /// Whether the scan stopped early.
    pub cancelled: bool,
}

/// Top-down walk that evaluates every directory and regular file once.
///
/// A directory that is excluded or ignored is pruned before it is read, since
/// nothing beneath it can change that.
///
/// Unlike a plain top-down walk, a directory that becomes excluded while it is
/// being evaluated is not descended into either.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    evaluator: Arc<PathEvaluator>,
    max_depth: usize,
    cancel: CancellationToken,
}

impl DirectoryScanner {
    /// Create a scanner.
    pub fn new(evaluator: Arc<PathEvaluator>, max_depth: usize) -> Self {
        Self {
            evaluator,
            max_depth,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the walk early once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run [`scan`](Self::scan) on the blocking pool.
    pub fn spawn(self) -> JoinHandle<ScanSummary> {
        tokio::task::spawn_blocking(move || self.scan())
    }

    /// Scan the whole watch root.
    pub fn scan(&self) -> ScanSummary {
        let root = self.evaluator.watch_root().to_path_buf();
        self.scan_from(&root)
    }

    /// Scan the subtree at `root`.
    ///
    /// Unreadable directories are logged and skipped; the rest of the walk
    /// continues.
    pub fn scan_from(&self, root: &Path) -> ScanSummary {
        let start = Instant::now();
        let evaluator = &self.evaluator;
        info!("Starting initial scan of {}", root.display());

        let mut summary = ScanSummary::default();
        let mut directories = 0;
        let mut pruned = 0;
        let mut dir_fired = 0;

        let walker = WalkDir::new(root)
            .follow_links(false)
            .max_depth(self.max_depth)
            .into_iter()
            .filter_entry(|entry| {
                if !entry.file_type().is_dir() {
                    return true;
                }

                let path = entry.path();
                if evaluator.is_excluded(path) || evaluator.is_ignored(path) {
                    trace!("Pruning {}", path.display());
                    pruned += 1;
                    return false;
                }

                directories += 1;
                match evaluator.evaluate(path, true, None, true) {
                    // A target that was just excluded needs no descent.
                    Verdict::Checked { fired } if fired > 0 => {
                        dir_fired += fired;
                        !evaluator.is_excluded(path)
                    }
                    _ => true,
                }
            });

        for entry in walker {
            if self.cancel.is_cancelled() {
                info!("Initial scan cancelled");
                summary.cancelled = true;
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {e}");
                    summary.errors += 1;
                    continue;
                }
            };

            if entry.file_type().is_file() {
                summary.files += 1;
                let verdict = evaluator.evaluate(entry.path(), true, None, false);
                if let Verdict::Checked { fired } = verdict {
                    summary.fired += fired;
                }
            }
        }

        summary.directories = directories;
        summary.pruned = pruned;
        summary.fired += dir_fired;
        summary.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            "Initial scan finished in {}ms (directories: {}, files: {}, pruned: {}, errors: {}, fired: {})",
            summary.duration_ms,
            summary.directories,
            summary.files,
            summary.pruned,
            summary.errors,
            summary.fired
        );
        debug!("Scan summary: {summary:?}");

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_MARKER_FILE, WatcherConfig};
    use crate::test_support::{MemoryAttributes, RecordingTool};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    type Setup = (
        TempDir,
        PathBuf,
        Arc<MemoryAttributes>,
        Arc<RecordingTool>,
        DirectoryScanner,
    );

    fn setup(ignores: &[&str]) -> Setup {
        let temp_dir = TempDir::new().unwrap();
        let config = WatcherConfig::new(temp_dir.path())
            .with_ignores(ignores.iter().copied())
            .validate()
            .unwrap();
        let store = Arc::new(MemoryAttributes::default());
        let tool = Arc::new(RecordingTool::new(store.clone()));
        let evaluator = Arc::new(PathEvaluator::from_config(
            &config,
            store.clone(),
            tool.clone(),
        ));
        let scanner = DirectoryScanner::new(evaluator, config.max_scan_depth);
        let root = config.watch_root;

        (temp_dir, root, store, tool, scanner)
    }

    #[test]
    fn test_scan_excludes_existing_pairs() {
        let (_temp_dir, root, _store, tool, scanner) = setup(&[]);
        fs::create_dir_all(root.join("web/node_modules/react")).unwrap();
        fs::write(root.join("web/package.json"), "{}").unwrap();
        fs::create_dir_all(root.join("api/target/debug")).unwrap();
        fs::write(root.join("api/Cargo.toml"), "").unwrap();
        fs::create_dir_all(root.join("notes")).unwrap();
        fs::write(root.join("notes/todo.md"), "").unwrap();

        let summary = scanner.scan();

        let mut calls = tool.calls();
        calls.sort();
        assert_eq!(
            calls,
            vec![root.join("api/target"), root.join("web/node_modules")]
        );
        assert!(root.join("web/node_modules").join(DEFAULT_MARKER_FILE).exists());
        assert!(root.join("api/target").join(DEFAULT_MARKER_FILE).exists());
        assert_eq!(summary.errors, 0);
    }

    #[test]
    fn test_scan_prunes_excluded_subtree() {
        let (_temp_dir, root, store, tool, scanner) = setup(&[]);
        let excluded = root.join("proj/node_modules");
        fs::create_dir_all(excluded.join("dep/node_modules")).unwrap();
        fs::write(excluded.join("dep/package.json"), "{}").unwrap();
        store.mark_excluded(&excluded);

        let summary = scanner.scan();

        // Root and proj only; nothing under node_modules is visited.
        assert_eq!(summary.directories, 2);
        assert_eq!(summary.files, 0);
        assert_eq!(summary.pruned, 1);
        assert!(tool.calls().is_empty());
        assert!(!excluded.join(DEFAULT_MARKER_FILE).exists());
    }

    #[test]
    fn test_scan_prunes_ignored_subtree() {
        let (_temp_dir, root, _store, tool, scanner) = setup(&["build"]);
        fs::create_dir_all(root.join("build/proj/node_modules")).unwrap();
        fs::write(root.join("build/proj/package.json"), "{}").unwrap();

        let summary = scanner.scan();

        assert_eq!(summary.pruned, 1);
        assert_eq!(summary.directories, 1);
        assert!(tool.calls().is_empty());
    }

    #[test]
    fn test_scan_does_not_descend_into_new_target() {
        let (_temp_dir, root, _store, tool, scanner) = setup(&[]);
        fs::create_dir_all(root.join("proj/node_modules/dep/node_modules")).unwrap();
        fs::write(root.join("proj/package.json"), "{}").unwrap();
        fs::write(root.join("proj/node_modules/dep/package.json"), "{}").unwrap();

        scanner.scan();

        assert_eq!(tool.calls(), vec![root.join("proj/node_modules")]);
    }

    #[test]
    fn test_scan_respects_depth_cap() {
        let temp_dir = TempDir::new().unwrap();
        let config = WatcherConfig::new(temp_dir.path())
            .with_max_scan_depth(1)
            .validate()
            .unwrap();
        let store = Arc::new(MemoryAttributes::default());
        let tool = Arc::new(RecordingTool::new(store.clone()));
        let evaluator = Arc::new(PathEvaluator::from_config(&config, store, tool.clone()));
        let root = config.watch_root.clone();
        fs::create_dir_all(root.join("a/b/node_modules")).unwrap();
        fs::write(root.join("a/b/package.json"), "{}").unwrap();

        let summary = DirectoryScanner::new(evaluator, config.max_scan_depth).scan();

        assert_eq!(summary.directories, 2);
        assert!(tool.calls().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let (_temp_dir, root, _store, tool, scanner) = setup(&[]);
        let locked = root.join("locked");
        fs::create_dir_all(locked.join("proj/node_modules")).unwrap();
        fs::write(locked.join("proj/package.json"), "{}").unwrap();
        fs::create_dir_all(root.join("open/node_modules")).unwrap();
        fs::write(root.join("open/package.json"), "{}").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores permission bits, so only assert when the lock holds.
        let locked_out = fs::read_dir(&locked).is_err();
        let summary = scanner.scan();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(tool.calls().contains(&root.join("open/node_modules")));
        if locked_out {
            assert_eq!(summary.errors, 1);
            assert_eq!(tool.calls(), vec![root.join("open/node_modules")]);
        }
    }

    #[tokio::test]
    async fn test_spawned_scan_returns_summary() {
        let (_temp_dir, root, _store, tool, scanner) = setup(&[]);
        fs::create_dir_all(root.join("venv")).unwrap();
        fs::write(root.join("requirements.txt"), "").unwrap();

        let summary = scanner.spawn().await.unwrap();

        // The directory and its sentinel may both fire, in either order.
        assert!(summary.fired >= 1);
        assert_eq!(tool.calls(), vec![root.join("venv")]);
    }

    #[test]
    fn test_cancelled_scan_stops_early() {
        let (_temp_dir, root, _store, tool, scanner) = setup(&[]);
        fs::create_dir_all(root.join("proj/node_modules")).unwrap();
        fs::write(root.join("proj/package.json"), "{}").unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let summary = scanner.with_cancellation(token).scan();

        assert!(summary.cancelled);
        assert_eq!(summary.files, 0);
        assert!(tool.calls().is_empty());
    }
}
