//! `asimov`: watch a directory tree and exclude dependency directories from
//! backup and indexing.

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use asimov_watcher::{
    DirectoryScanner, EventDispatcher, PathEvaluator, Tmutil, WatcherConfig, XattrStore,
};
use clap::Parser;
use clap::error::ErrorKind;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
            let _ = e.print();
            return code;
        }
    };

    init_logging();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli
        .to_config()
        .validate()
        .with_context(|| format!("invalid watch root {}", cli.watch_root.display()))?;
    log_startup(&config);

    let evaluator = Arc::new(PathEvaluator::from_config(
        &config,
        Arc::new(XattrStore),
        Arc::new(Tmutil::new(&config.exclusion_tool)),
    ));

    // Subscribe before scanning so nothing created during the scan is missed.
    let mut dispatcher = EventDispatcher::new(evaluator.clone(), config.latency)
        .start()
        .context("failed to start watching")?;

    let cancel = CancellationToken::new();
    let scan = if cli.no_scan {
        info!("Initial scan disabled");
        None
    } else {
        let scanner = DirectoryScanner::new(evaluator, config.max_scan_depth)
            .with_cancellation(cancel.clone());
        Some(scanner.spawn())
    };

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for ctrl-c")?;
            info!("Interrupted, shutting down");
        }
        () = dispatcher.stopped() => {
            warn!("Event dispatcher stopped, shutting down");
        }
    }

    cancel.cancel();
    drop(dispatcher);

    if let Some(scan) = scan {
        if let Err(e) = scan.await {
            warn!("Initial scan task failed: {e}");
        }
    }

    Ok(())
}

fn log_startup(config: &WatcherConfig) {
    info!("Asimov watching {}", config.watch_root.display());
    for dir in &config.ignore_dirs {
        info!("Ignoring {}", config.watch_root.join(dir).display());
    }
    info!("Exclusion tool: {}", config.exclusion_tool.display());
}
