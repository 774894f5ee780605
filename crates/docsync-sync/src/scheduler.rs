//! Candidate scheduler - turns debounced filesystem events into upload tasks
//!
//! The [`CandidateScheduler`] sits between the
//! [`FileWatcher`](super::watcher::FileWatcher) and the
//! [`SyncCoordinator`](super::coordinator::SyncCoordinator). It receives raw
//! change events, feeds them through a
//! [`DebouncedChangeQueue`](super::watcher::DebouncedChangeQueue), and hands
//! each settled document path to
//! [`on_candidate`](super::coordinator::SyncCoordinator::on_candidate).
//!
//! ## Flow
//!
//! ```text
//! FileWatcher ──→ mpsc::Receiver ──→ CandidateScheduler ──→ JoinSet<on_candidate>
//!                                        │
//!                                  DebouncedChangeQueue
//! ```
//!
//! Candidates run concurrently; the coordinator's worker pool bounds how
//! many actually upload at once.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use docsync_core::domain::document::is_recognized;
use docsync_core::domain::outcome::{SessionCounters, UploadOutcome};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coordinator::SyncCoordinator;
use crate::watcher::{ChangeEvent, DebouncedChangeQueue};

/// Default polling interval of the debounce queue
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Forwards settled change events to the coordinator
pub struct CandidateScheduler {
    /// Receiver for change events from the FileWatcher
    change_rx: mpsc::Receiver<ChangeEvent>,
    /// Debounced queue that coalesces rapid-fire events
    queue: DebouncedChangeQueue,
    coordinator: Arc<SyncCoordinator>,
    /// How often the scheduler polls the debounced queue for settled events
    poll_interval: Duration,
    cancel: CancellationToken,
    in_flight: JoinSet<(PathBuf, UploadOutcome)>,
    counters: SessionCounters,
}

impl CandidateScheduler {
    /// Creates a new `CandidateScheduler`
    ///
    /// # Arguments
    /// * `change_rx` - Channel receiver for filesystem change events
    /// * `coordinator` - Runs the upload pipeline for each settled path
    /// * `settle_delay` - How long a path must be quiet before it is processed
    /// * `poll_interval` - How often to check the debounce queue
    /// * `cancel` - Stops the run loop when cancelled
    pub fn new(
        change_rx: mpsc::Receiver<ChangeEvent>,
        coordinator: Arc<SyncCoordinator>,
        settle_delay: Duration,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        info!(
            settle_ms = settle_delay.as_millis() as u64,
            poll_ms = poll_interval.as_millis() as u64,
            "Creating candidate scheduler"
        );

        Self {
            change_rx,
            queue: DebouncedChangeQueue::new(settle_delay),
            coordinator,
            poll_interval,
            cancel,
            in_flight: JoinSet::new(),
            counters: SessionCounters::new(),
        }
    }

    /// Main event loop
    ///
    /// Runs until the change channel closes or the token is cancelled:
    ///
    /// 1. **Receive events**: pushes watcher events into the debounce queue.
    /// 2. **Poll queue**: dispatches settled document paths.
    /// 3. **Reap**: folds finished candidates into the counters.
    ///
    /// On channel close, pending events are dispatched without waiting for
    /// them to settle. On cancellation they are dropped. Either way, the
    /// loop waits for dispatched candidates before returning.
    pub async fn run(&mut self) -> SessionCounters {
        info!("Candidate scheduler starting");

        let mut poll_timer = tokio::time::interval(self.poll_interval);
        poll_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!(
                        dropped = self.queue.pending_count(),
                        "Cancellation requested, scheduler shutting down"
                    );
                    break;
                }

                event = self.change_rx.recv() => {
                    match event {
                        Some(change) => {
                            debug!(event = ?change, "Scheduler received change event");
                            self.queue.push(change);
                        }
                        None => {
                            info!("Change channel closed, scheduler shutting down");
                            let remaining = self.queue.drain();
                            self.dispatch(remaining);
                            break;
                        }
                    }
                }

                _ = poll_timer.tick() => {
                    let settled = self.queue.poll();
                    self.dispatch(settled);
                }

                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.reap(joined);
                }
            }
        }

        while let Some(joined) = self.in_flight.join_next().await {
            self.reap(joined);
        }

        info!(
            synced = self.counters.synced,
            already_synced = self.counters.already_synced,
            failed = self.counters.failed,
            skipped = self.counters.skipped,
            "Candidate scheduler stopped"
        );
        self.counters
    }

    fn dispatch(&mut self, events: Vec<ChangeEvent>) {
        for event in events {
            let path = event.path().to_path_buf();
            if !is_recognized(&path) {
                debug!(path = %path.display(), "Not a document, ignoring");
                continue;
            }
            if !path.is_file() {
                debug!(path = %path.display(), "No longer a file, ignoring");
                continue;
            }

            info!(path = %path.display(), "New or changed document detected");
            let coordinator = Arc::clone(&self.coordinator);
            self.in_flight.spawn(async move {
                let outcome = coordinator.on_candidate(&path).await;
                (path, outcome)
            });
            self.counters.submitted += 1;
        }
    }

    fn reap(&mut self, joined: Result<(PathBuf, UploadOutcome), JoinError>) {
        match joined {
            Ok((path, outcome)) => {
                debug!(path = %path.display(), outcome = outcome.label(), "Candidate finished");
                self.counters.record(&outcome);
            }
            Err(e) => {
                warn!(error = %e, "Candidate task did not complete");
                self.counters.record(&UploadOutcome::failed(e.to_string()));
            }
        }
    }
}

// ============================================================================
// Unit tests
// ============================================================================
