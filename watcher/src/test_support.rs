//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::applier::ExclusionTool;
use crate::attributes::{AttributeStore, BACKUP_EXCLUDE_ATTRIBUTE};
use crate::error::{Result, WatcherError};

#[derive(Debug, Default)]
pub(crate) struct MemoryAttributes {
    values: Mutex<HashMap<(PathBuf, String), Vec<u8>>>,
}

impl MemoryAttributes {
    pub(crate) fn set(&self, path: &Path, name: &str, value: Vec<u8>) {
        self.values
            .lock()
            .unwrap()
            .insert((path.to_path_buf(), name.to_string()), value);
    }

    pub(crate) fn mark_excluded(&self, path: &Path) {
        self.set(path, BACKUP_EXCLUDE_ATTRIBUTE, b"bplist00".to_vec());
    }

    pub(crate) fn is_marked(&self, path: &Path) -> bool {
        self.get(path, BACKUP_EXCLUDE_ATTRIBUTE).is_some()
    }
}

impl AttributeStore for MemoryAttributes {
    fn get(&self, path: &Path, name: &str) -> Option<Vec<u8>> {
        self.values
            .lock()
            .unwrap()
            .get(&(path.to_path_buf(), name.to_string()))
            .cloned()
    }
}

/// Records every call and, unless failing, sets the attribute the way
/// `tmutil` would.
#[derive(Debug)]
pub(crate) struct RecordingTool {
    store: Arc<MemoryAttributes>,
    calls: Mutex<Vec<PathBuf>>,
    fail: bool,
}

impl RecordingTool {
    pub(crate) fn new(store: Arc<MemoryAttributes>) -> Self {
        Self {
            store,
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub(crate) fn failing(store: Arc<MemoryAttributes>) -> Self {
        Self {
            fail: true,
            ..Self::new(store)
        }
    }

    pub(crate) fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl ExclusionTool for RecordingTool {
    fn add_exclusion(&self, path: &Path) -> Result<()> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        if self.fail {
            return Err(WatcherError::Config("simulated failure".to_string()));
        }
        self.store.mark_excluded(path);
        Ok(())
    }
}
