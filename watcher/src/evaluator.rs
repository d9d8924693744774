//! Per-path rule evaluation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::applier::{ExclusionApplier, ExclusionTool};
use crate::attributes::{AttributeStore, ExclusionAttributeProbe};
use crate::config::WatcherConfig;
use crate::event::EventFlags;
use crate::ignore::IgnorePathMatcher;
use crate::rules::RuleTable;

/// Outcome of evaluating one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Dropped by the event filter before any checks.
    Filtered,

    /// Lies under an ignored directory.
    Ignored,

    /// An ancestor already carries the exclusion attribute.
    UnderExcludedAncestor,

    /// The path itself already carries the exclusion attribute.
    AlreadyExcluded,

    /// Rules were checked; `fired` applications were requested.
    Checked {
        /// Number of rules that fired.
        fired: usize,
    },
}

/// Decides whether a path completes a sentinel/target pair and excludes the
/// target when it does.
///
/// Holds only immutable state, so one instance is shared between the scanner
/// and the live dispatcher.
#[derive(Debug)]
pub struct PathEvaluator {
    watch_root: PathBuf,
    rules: Arc<RuleTable>,
    ignores: Arc<IgnorePathMatcher>,
    probe: ExclusionAttributeProbe,
    applier: ExclusionApplier,
}

impl PathEvaluator {
    /// Assemble an evaluator from its parts.
    pub fn new(
        watch_root: impl Into<PathBuf>,
        rules: Arc<RuleTable>,
        ignores: Arc<IgnorePathMatcher>,
        probe: ExclusionAttributeProbe,
        applier: ExclusionApplier,
    ) -> Self {
        Self {
            watch_root: watch_root.into(),
            rules,
            ignores,
            probe,
            applier,
        }
    }

    /// Build an evaluator for a validated config with the default rule set.
    pub fn from_config(
        config: &WatcherConfig,
        store: Arc<dyn AttributeStore>,
        tool: Arc<dyn ExclusionTool>,
    ) -> Self {
        let probe = ExclusionAttributeProbe::new(store);
        let applier = ExclusionApplier::new(probe.clone(), tool, config.marker_file.clone());
        let ignores = IgnorePathMatcher::new(&config.watch_root, &config.ignore_dirs);

        Self::new(
            config.watch_root.clone(),
            Arc::new(RuleTable::default()),
            Arc::new(ignores),
            probe,
            applier,
        )
    }

    /// Evaluate `path`.
    ///
    /// - `parent_verified`: the caller already knows no ancestor is excluded,
    ///   so only `path` itself is re-checked.
    /// - `flags`: present for live events; only creations and renames that
    ///   still exist are considered. `None` means the path came from a scan.
    /// - `skip_exclusion_check`: the caller already checked ignore prefixes and
    ///   the exclusion attribute for `path`.
    pub fn evaluate(
        &self,
        path: &Path,
        parent_verified: bool,
        flags: Option<EventFlags>,
        skip_exclusion_check: bool,
    ) -> Verdict {
        if let Some(flags) = flags {
            if !flags.is_created() && !flags.is_renamed() {
                return Verdict::Filtered;
            }
            // Renames report both the vacated and the new name.
            if flags.is_renamed() && !path.exists() {
                trace!("Skipping vacated rename source: {}", path.display());
                return Verdict::Filtered;
            }
        }

        if !skip_exclusion_check {
            if self.ignores.should_ignore(path) {
                return Verdict::Ignored;
            }
            if parent_verified {
                if self.probe.is_excluded(path) {
                    return Verdict::AlreadyExcluded;
                }
            } else if self.has_excluded_ancestor(path) {
                return Verdict::UnderExcludedAncestor;
            }
        }

        let fired = self.fire_rules(path);
        Verdict::Checked { fired }
    }

    /// Walk from `path` up to the watch root, inclusive, looking for an
    /// excluded directory.
    fn has_excluded_ancestor(&self, path: &Path) -> bool {
        for ancestor in path.ancestors() {
            if self.probe.is_excluded(ancestor) {
                debug!(
                    "Skipping {}: {} is excluded",
                    path.display(),
                    ancestor.display()
                );
                return true;
            }
            if ancestor == self.watch_root {
                break;
            }
        }
        false
    }

    fn fire_rules(&self, path: &Path) -> usize {
        let (Some(filename), Some(parent)) = (path.file_name(), path.parent()) else {
            return 0;
        };
        let Some(filename) = filename.to_str() else {
            return 0;
        };
        if self.rules.forward(filename).is_none() && self.rules.backward(filename).is_none() {
            return 0;
        }

        // Every rule is checked; a name shared by several rules fires each.
        let mut fired = 0;
        for rule in self.rules.rules() {
            if filename == rule.sentinel {
                let target = parent.join(rule.target);
                if target.exists() {
                    debug!("Found {} next to {}", rule.sentinel, target.display());
                    self.applier.apply(&target);
                    fired += 1;
                }
            } else if filename == rule.target && parent.join(rule.sentinel).exists() {
                debug!("Found {} with sibling {}", path.display(), rule.sentinel);
                self.applier.apply(path);
                fired += 1;
            }
        }
        fired
    }

    /// Root of the watched tree.
    pub fn watch_root(&self) -> &Path {
        &self.watch_root
    }

    /// Whether `path` is under an ignored directory.
    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignores.should_ignore(path)
    }

    /// Whether `path` itself carries the exclusion attribute.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.probe.is_excluded(path)
    }
}
