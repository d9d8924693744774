//! Marks directories excluded from backup and content indexing.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::attributes::ExclusionAttributeProbe;
use crate::error::{Result, WatcherError};

/// The OS facility that records a backup exclusion.
pub trait ExclusionTool: Send + Sync {
    /// Exclude `path`, blocking until the facility reports back.
    fn add_exclusion(&self, path: &Path) -> Result<()>;
}

/// [`ExclusionTool`] that runs `tmutil addexclusion <path>`.
#[derive(Debug, Clone)]
pub struct Tmutil {
    program: PathBuf,
}

impl Tmutil {
    /// Use the tool at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Path of the program being run.
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl ExclusionTool for Tmutil {
    fn add_exclusion(&self, path: &Path) -> Result<()> {
        debug!("Running {} addexclusion {}", self.program.display(), path.display());

        // No timeout: a hung tool stalls this evaluation until it exits.
        let status = Command::new(&self.program)
            .arg("addexclusion")
            .arg(path)
            .stdin(Stdio::null())
            .status()?;

        if status.success() {
            Ok(())
        } else {
            Err(WatcherError::ToolFailed {
                path: path.to_path_buf(),
                status,
            })
        }
    }
}

/// Idempotently excludes a directory.
///
/// Every step is safe to repeat: the marker file is only created when
/// missing, and the tool only runs when the exclusion attribute is absent.
#[derive(Clone)]
pub struct ExclusionApplier {
    probe: ExclusionAttributeProbe,
    tool: Arc<dyn ExclusionTool>,
    marker_file: String,
}

impl ExclusionApplier {
    /// Create an applier.
    pub fn new(
        probe: ExclusionAttributeProbe,
        tool: Arc<dyn ExclusionTool>,
        marker_file: impl Into<String>,
    ) -> Self {
        Self {
            probe,
            tool,
            marker_file: marker_file.into(),
        }
    }

    /// Exclude `path`. Failures are logged, never returned.
    pub fn apply(&self, path: &Path) {
        self.write_marker(path);

        if self.probe.is_excluded(path) {
            debug!("Already excluded: {}", path.display());
            return;
        }

        match self.tool.add_exclusion(path) {
            Ok(()) => info!("Excluded: {}", path.display()),
            Err(e) => error!("Failed to exclude {}: {e}", path.display()),
        }
    }

    fn write_marker(&self, dir: &Path) {
        let marker = dir.join(&self.marker_file);
        match OpenOptions::new().write(true).create_new(true).open(&marker) {
            Ok(_) => debug!("Created {} in {}", self.marker_file, dir.display()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => warn!(
                "Failed to create {} in {}: {e}",
                self.marker_file,
                dir.display()
            ),
        }
    }
}

impl std::fmt::Debug for ExclusionApplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExclusionApplier")
            .field("marker_file", &self.marker_file)
            .finish_non_exhaustive()
    }
}
