use std::path::PathBuf;
use std::time::Duration;

use asimov_watcher::WatcherConfig;
use asimov_watcher::config::{DEFAULT_EXCLUSION_TOOL, DEFAULT_MAX_SCAN_DEPTH};
use clap::Parser;

/// Keep dependency and build directories out of Time Machine and Spotlight.
///
/// Watches a directory tree for manifest/artifact pairs such as
/// `package.json` + `node_modules` or `Cargo.toml` + `target`, and excludes
/// the artifact directory from backups and indexing.
#[derive(Parser, Debug)]
#[command(name = "asimov", version, about, long_about = None)]
pub struct Cli {
    /// Directory to watch.
    pub watch_root: PathBuf,

    /// Subdirectories of the watch root to leave alone.
    pub ignore_dirs: Vec<PathBuf>,

    /// Seconds to collect events before evaluating them.
    #[arg(long, value_name = "SECONDS", default_value = "1.0", value_parser = parse_latency)]
    pub latency: Duration,

    /// Program invoked as `<PATH> addexclusion <dir>`.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_EXCLUSION_TOOL)]
    pub tmutil: PathBuf,

    /// Deepest directory level visited by the initial scan.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_SCAN_DEPTH)]
    pub max_depth: usize,

    /// Skip the initial scan and only react to new changes.
    #[arg(long)]
    pub no_scan: bool,
}

impl Cli {
    /// Unvalidated watcher config for these arguments.
    pub fn to_config(&self) -> WatcherConfig {
        WatcherConfig::new(&self.watch_root)
            .with_ignores(self.ignore_dirs.iter().cloned())
            .with_latency(self.latency)
            .with_exclusion_tool(&self.tmutil)
            .with_max_scan_depth(self.max_depth)
    }
}

fn parse_latency(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{e}"))
}
