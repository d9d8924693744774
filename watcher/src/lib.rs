//! # Asimov Watcher
//!
//! Keeps dependency and build-artifact directories out of backups and search
//! indexes. When a manifest and its artifact directory sit side by side
//! (`package.json` next to `node_modules`, `Cargo.toml` next to `target`, ...)
//! the directory gets a `.metadata_never_index` marker and is handed to
//! `tmutil addexclusion`.
//!
//! ## Features
//!
//! - **Initial Scan**: One walk over the existing tree at startup
//! - **Live Events**: Recursive file system subscription with batched delivery
//! - **Ignore Prefixes**: Skip whole subtrees of the watch root
//! - **Idempotent Exclusion**: Already-excluded directories are left alone
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Asimov Watcher                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  DirectoryScanner ──┐                                           │
//! │                     ├──► PathEvaluator ──► ExclusionApplier     │
//! │  EventDispatcher ───┘         │                  │              │
//! │                               ▼                  ▼              │
//! │               RuleTable / IgnorePathMatcher   Tmutil + marker   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod applier;
pub mod attributes;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod evaluator;
pub mod event;
pub mod ignore;
pub mod rules;
pub mod scanner;

#[cfg(test)]
mod test_support;

pub use applier::{ExclusionApplier, ExclusionTool, Tmutil};
pub use attributes::{AttributeStore, BACKUP_EXCLUDE_ATTRIBUTE, ExclusionAttributeProbe, XattrStore};
pub use config::WatcherConfig;
pub use dispatcher::{DispatcherHandle, EventDispatcher, EventListener};
pub use error::{Result, WatcherError};
pub use evaluator::{PathEvaluator, Verdict};
pub use event::{EventBatch, EventFlags, PathEvent};
pub use ignore::IgnorePathMatcher;
pub use rules::{DEFAULT_RULES, Rule, RuleTable};
pub use scanner::{DirectoryScanner, ScanSummary};
