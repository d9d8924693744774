//! Prefix matching for subtrees the watcher never touches.

use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};

/// Matches paths under any of a fixed set of ignored directories.
///
/// Prefixes are stored with a trailing separator and the candidate path gets
/// one appended before comparison, so `/w/build` matches `/w/build` and
/// `/w/build/x` but never `/w/buildings`.
#[derive(Debug, Clone, Default)]
pub struct IgnorePathMatcher {
    prefixes: Vec<String>,
}

impl IgnorePathMatcher {
    /// Build prefixes from the watch root and directories relative to it.
    ///
    /// Empty entries are skipped and `.` components dropped, so `./build`
    /// matches the same paths as `build`.
    pub fn new<I, P>(watch_root: &Path, ignore_dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let prefixes = ignore_dirs
            .into_iter()
            .filter(|dir| !dir.as_ref().as_os_str().is_empty())
            .map(|dir| with_trailing_separator(join_lexically(watch_root, dir.as_ref())))
            .collect();

        Self { prefixes }
    }

    /// Whether `path` is an ignored directory or lies beneath one.
    pub fn should_ignore(&self, path: &Path) -> bool {
        if self.prefixes.is_empty() {
            return false;
        }

        let candidate = with_trailing_separator(path.to_path_buf());
        self.prefixes
            .iter()
            .any(|prefix| candidate.starts_with(prefix.as_str()))
    }

    /// The separator-terminated prefixes.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

fn join_lexically(root: &Path, dir: &Path) -> PathBuf {
    let mut joined = root.to_path_buf();
    for component in dir.components() {
        if !matches!(component, Component::CurDir) {
            joined.push(component);
        }
    }
    joined
}

fn with_trailing_separator(path: PathBuf) -> String {
    let mut s = path.to_string_lossy().into_owned();
    if !s.ends_with(MAIN_SEPARATOR) {
        s.push(MAIN_SEPARATOR);
    }
    s
}
