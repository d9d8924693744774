//! Live event delivery.
//!
//! The notify callback only forwards raw results into a channel. A single
//! blocking worker drains the channel one latency window at a time and hands
//! each coalesced batch to the [`EventListener`], so evaluations never run
//! concurrently with each other.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::error::Result;
use crate::evaluator::PathEvaluator;
use crate::event::{EventBatch, PathEvent};

type RawEvent = notify::Result<notify::Event>;

/// Receives coalesced batches and evaluates each event in order.
///
/// Owns its evaluator so it can outlive whoever started the subscription.
#[derive(Debug, Clone)]
pub struct EventListener {
    evaluator: Arc<PathEvaluator>,
}

impl EventListener {
    /// Create a listener.
    pub fn new(evaluator: Arc<PathEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Evaluate every event in `batch`.
    ///
    /// A panic while evaluating is logged and the rest of the batch dropped;
    /// it never reaches the delivery loop.
    pub fn on_batch(&self, batch: &EventBatch) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            for event in batch {
                let verdict = self
                    .evaluator
                    .evaluate(&event.path, false, Some(event.flags), false);
                trace!("{} -> {verdict:?}", event.path.display());
            }
        }));

        if let Err(payload) = outcome {
            error!(
                "Event handler panicked, dropping batch of {}: {}",
                batch.len(),
                panic_message(payload.as_ref())
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

/// Subscribes to file system events under the watch root.
#[derive(Debug)]
pub struct EventDispatcher {
    watch_root: PathBuf,
    latency: Duration,
    listener: EventListener,
}

impl EventDispatcher {
    /// Create a dispatcher for the evaluator's watch root.
    pub fn new(evaluator: Arc<PathEvaluator>, latency: Duration) -> Self {
        Self {
            watch_root: evaluator.watch_root().to_path_buf(),
            latency,
            listener: EventListener::new(evaluator),
        }
    }

    /// Start watching. Events are delivered until the handle is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> Result<DispatcherHandle> {
        let (tx, rx) = mpsc::channel::<RawEvent>();

        let mut watcher = notify::recommended_watcher(move |res: RawEvent| {
            // Receiver gone means we are shutting down.
            let _ = tx.send(res);
        })?;
        watcher.watch(&self.watch_root, RecursiveMode::Recursive)?;

        info!(
            "Watching {} (latency {:?})",
            self.watch_root.display(),
            self.latency
        );

        let latency = self.latency;
        let listener = self.listener;
        let task = tokio::task::spawn_blocking(move || {
            while let Some(batch) = next_batch(&rx, latency) {
                if batch.is_empty() {
                    continue;
                }
                debug!("Dispatching batch of {} event(s)", batch.len());
                listener.on_batch(&batch);
            }
            debug!("Event dispatcher stopped");
        });

        Ok(DispatcherHandle {
            _watcher: watcher,
            task,
        })
    }
}

/// Keeps the subscription alive; dropping it stops delivery.
pub struct DispatcherHandle {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Resolves if the delivery loop ever exits.
    pub async fn stopped(&mut self) {
        if let Err(e) = (&mut self.task).await {
            error!("Event dispatcher task failed: {e}");
        }
    }
}

impl std::fmt::Debug for DispatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherHandle").finish_non_exhaustive()
    }
}

/// Block for the next event, then collect everything arriving within
/// `latency` of it. Returns `None` once the sender is gone and the channel is
/// drained.
fn next_batch(rx: &Receiver<RawEvent>, latency: Duration) -> Option<EventBatch> {
    let first = rx.recv().ok()?;
    let deadline = Instant::now() + latency;

    let mut batch = EventBatch::new();
    absorb(&mut batch, first);

    // Timeout ends the window; a disconnect surfaces on the next recv.
    while let Ok(res) = rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        absorb(&mut batch, res);
    }

    Some(batch)
}

fn absorb(batch: &mut EventBatch, res: RawEvent) {
    match res {
        Ok(event) => {
            for path_event in PathEvent::from_notify(event) {
                batch.push(path_event);
            }
        }
        Err(e) => warn!("Watch error: {e}"),
    }
}
