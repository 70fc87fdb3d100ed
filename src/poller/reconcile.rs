//! Lock and summary polling loops.

use super::view::ClientViewState;
use crate::api::CatalogApi;
use crate::error::Result;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Keeps a `ClientViewState` in line with the server.
///
/// Each poll is a single request; failures are logged by the background
/// loops and retried on the next tick.
#[derive(Clone)]
pub struct ReconciliationPoller {
    api: Arc<dyn CatalogApi>,
    view: Arc<Mutex<ClientViewState>>,
}

impl ReconciliationPoller {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self {
            api,
            view: Arc::new(Mutex::new(ClientViewState::new())),
        }
    }

    /// A copy of the current view.
    pub fn view(&self) -> ClientViewState {
        self.lock_view().clone()
    }

    fn lock_view(&self) -> MutexGuard<'_, ClientViewState> {
        self.view.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Fetch the full catalogue and replace the view.
    pub fn refetch(&self) -> Result<()> {
        let snapshot = self.api.fetch_catalog()?;
        let count = snapshot.pipelines.len();
        self.lock_view().replace(snapshot);
        log::debug!("catalogue refetched ({} pipelines)", count);
        Ok(())
    }

    /// One lock poll. Returns whether the annotations changed.
    pub fn poll_locks(&self) -> Result<bool> {
        let leases = self.api.lock_statuses()?;
        Ok(self.lock_view().merge_annotations(leases))
    }

    /// One summary poll. Refetches, and returns `true`, only when the server's
    /// names differ from the cached ones.
    pub fn poll_summary(&self) -> Result<bool> {
        let summary = self.api.catalog_summary()?;
        let local = self.lock_view().resource_ids();
        if summary.matches(&local) {
            return Ok(false);
        }

        log::info!(
            "catalogue changed ({} cached, {} on server); refetching",
            local.len(),
            summary.count
        );
        self.refetch()?;
        Ok(true)
    }

    /// Run both polls on background threads until the handle is stopped or
    /// dropped.
    pub fn spawn(&self, lock_interval: Duration, summary_interval: Duration) -> PollerHandle {
        let locks = self.clone();
        let summary = self.clone();
        PollerHandle {
            loops: vec![
                PollLoop::spawn("lock-poll", lock_interval, move || {
                    locks.poll_locks().map(|_| ())
                }),
                PollLoop::spawn("summary-poll", summary_interval, move || {
                    summary.poll_summary().map(|_| ())
                }),
            ],
        }
    }
}

/// Running lock and summary polls.
#[derive(Debug)]
pub struct PollerHandle {
    loops: Vec<PollLoop>,
}

impl PollerHandle {
    /// Stop both polls and wait for in-flight requests to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        for poll in &mut self.loops {
            poll.signal();
        }
        for poll in &mut self.loops {
            poll.join();
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Debug)]
struct PollLoop {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PollLoop {
    fn spawn<F>(name: &str, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Result<()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let label = name.to_string();

        let spawned = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if let Err(e) = tick() {
                                log::warn!("{} failed: {}", label, e);
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            });

        let handle = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("failed to start {}: {}", name, e);
                None
            }
        };

        Self {
            stop: Some(stop_tx),
            handle,
        }
    }

    fn signal(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
