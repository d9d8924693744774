//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use asimov_watcher::{
    AttributeStore, BACKUP_EXCLUDE_ATTRIBUTE, EventBatch, EventFlags, EventListener,
    ExclusionTool, PathEvaluator, PathEvent, Result, WatcherConfig, WatcherError,
};
use tempfile::TempDir;

/// Attribute store that only knows the backup-exclusion attribute.
#[derive(Debug, Default)]
pub struct FakeAttributes {
    excluded: Mutex<HashSet<PathBuf>>,
}

impl FakeAttributes {
    pub fn exclude(&self, path: &Path) {
        self.excluded.lock().unwrap().insert(path.to_path_buf());
    }
}

impl AttributeStore for FakeAttributes {
    fn get(&self, path: &Path, name: &str) -> Option<Vec<u8>> {
        if name != BACKUP_EXCLUDE_ATTRIBUTE {
            return None;
        }
        if self.excluded.lock().unwrap().contains(path) {
            Some(b"bplist00".to_vec())
        } else {
            None
        }
    }
}

/// Stands in for `tmutil`: counts spawns and sets the attribute on success.
#[derive(Debug)]
pub struct FakeTmutil {
    attributes: Arc<FakeAttributes>,
    spawned: Mutex<Vec<PathBuf>>,
    fail: bool,
}

impl FakeTmutil {
    pub fn spawned(&self) -> Vec<PathBuf> {
        self.spawned.lock().unwrap().clone()
    }
}

impl ExclusionTool for FakeTmutil {
    fn add_exclusion(&self, path: &Path) -> Result<()> {
        self.spawned.lock().unwrap().push(path.to_path_buf());
        if self.fail {
            return Err(WatcherError::Config("tool exited with 1".to_string()));
        }
        self.attributes.exclude(path);
        Ok(())
    }
}

pub struct World {
    _temp_dir: TempDir,
    pub root: PathBuf,
    pub config: WatcherConfig,
    pub attributes: Arc<FakeAttributes>,
    pub tmutil: Arc<FakeTmutil>,
    pub evaluator: Arc<PathEvaluator>,
}

impl World {
    pub fn new(ignores: &[&str]) -> Self {
        Self::build(ignores, false)
    }

    pub fn with_failing_tool() -> Self {
        Self::build(&[], true)
    }

    fn build(ignores: &[&str], fail: bool) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = WatcherConfig::new(temp_dir.path())
            .with_ignores(ignores.iter().copied())
            .validate()
            .unwrap();
        let attributes = Arc::new(FakeAttributes::default());
        let tmutil = Arc::new(FakeTmutil {
            attributes: attributes.clone(),
            spawned: Mutex::new(Vec::new()),
            fail,
        });
        let evaluator = Arc::new(PathEvaluator::from_config(
            &config,
            attributes.clone(),
            tmutil.clone(),
        ));

        Self {
            root: config.watch_root.clone(),
            _temp_dir: temp_dir,
            config,
            attributes,
            tmutil,
            evaluator,
        }
    }

    /// Create a file and deliver its creation event.
    pub fn create_file(&self, rel: &str) -> PathBuf {
        let path = self.root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "").unwrap();
        self.deliver(&[(path.clone(), EventFlags::CREATED)]);
        path
    }

    /// Create a directory and deliver its creation event.
    pub fn create_dir(&self, rel: &str) -> PathBuf {
        let path = self.root.join(rel);
        std::fs::create_dir_all(&path).unwrap();
        self.deliver(&[(path.clone(), EventFlags::CREATED)]);
        path
    }

    pub fn deliver(&self, events: &[(PathBuf, EventFlags)]) {
        let batch: EventBatch = events
            .iter()
            .map(|(path, flags)| PathEvent::new(path.clone(), *flags))
            .collect();
        EventListener::new(self.evaluator.clone()).on_batch(&batch);
    }
}
