//! Configuration for the exclusion watcher.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, WatcherError};

/// Default coalescing window for live notifications.
pub const DEFAULT_LATENCY: Duration = Duration::from_secs(1);

/// Default location of the backup exclusion tool.
pub const DEFAULT_EXCLUSION_TOOL: &str = "/usr/bin/tmutil";

/// File whose presence tells the content indexer to skip a directory.
pub const DEFAULT_MARKER_FILE: &str = ".metadata_never_index";

/// Depth cap for the initial scan.
pub const DEFAULT_MAX_SCAN_DEPTH: usize = 256;

/// Configuration for a watched tree.
#[derive(Debug, Clone, PartialEq)]
pub struct WatcherConfig {
    /// Root of the watched tree.
    pub watch_root: PathBuf,

    /// Directories never evaluated or descended into, relative to the root.
    pub ignore_dirs: Vec<PathBuf>,

    /// How long live notifications are coalesced before evaluation.
    pub latency: Duration,

    /// Program invoked as `<tool> addexclusion <path>`.
    pub exclusion_tool: PathBuf,

    /// Name of the empty marker file written into excluded directories.
    pub marker_file: String,

    /// Maximum depth the initial scan descends to.
    pub max_scan_depth: usize,
}

impl WatcherConfig {
    /// Create a new config rooted at `watch_root`.
    pub fn new(watch_root: impl Into<PathBuf>) -> Self {
        Self {
            watch_root: watch_root.into(),
            ignore_dirs: Vec::new(),
            latency: DEFAULT_LATENCY,
            exclusion_tool: PathBuf::from(DEFAULT_EXCLUSION_TOOL),
            marker_file: DEFAULT_MARKER_FILE.to_string(),
            max_scan_depth: DEFAULT_MAX_SCAN_DEPTH,
        }
    }

    /// Add a directory to ignore.
    pub fn ignore(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ignore_dirs.push(dir.into());
        self
    }

    /// Add several directories to ignore.
    pub fn with_ignores<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.ignore_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Set the coalescing latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Set the exclusion tool.
    pub fn with_exclusion_tool(mut self, tool: impl Into<PathBuf>) -> Self {
        self.exclusion_tool = tool.into();
        self
    }

    /// Set the maximum scan depth.
    pub fn with_max_scan_depth(mut self, depth: usize) -> Self {
        self.max_scan_depth = depth;
        self
    }

    /// Check the config and canonicalize the watch root.
    ///
    /// The root must exist and be a directory. Everything downstream compares
    /// paths textually against it, so it is resolved once here.
    pub fn validate(mut self) -> Result<Self> {
        let root = &self.watch_root;
        if !root.exists() {
            return Err(WatcherError::DirectoryNotFound(root.display().to_string()));
        }
        if !root.is_dir() {
            return Err(WatcherError::NotADirectory(root.display().to_string()));
        }
        if self.marker_file.is_empty() || self.marker_file.contains(std::path::MAIN_SEPARATOR) {
            return Err(WatcherError::Config(format!(
                "invalid marker file name: {:?}",
                self.marker_file
            )));
        }
        if self.max_scan_depth == 0 {
            return Err(WatcherError::Config(
                "max scan depth must be at least 1".to_string(),
            ));
        }

        self.watch_root = root.canonicalize()?;
        Ok(self)
    }

    /// Root of the watched tree.
    pub fn watch_root(&self) -> &Path {
        &self.watch_root
    }
}
