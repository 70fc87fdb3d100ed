//! Heartbeat driver thread.

use super::lease_client::LeaseClient;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Renews a held lease every `interval` until stopped or the lease is no
/// longer held.
#[derive(Debug)]
pub struct Heartbeat {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Heartbeat {
    pub fn spawn(client: Arc<LeaseClient>, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let spawned = thread::Builder::new()
            .name("lease-heartbeat".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            let state = client.heartbeat();
                            if !state.is_held() {
                                log::debug!("heartbeat stopping: {}", state);
                                break;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            });

        let handle = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                // Without renewals the lease simply expires after one TTL.
                log::warn!("failed to start heartbeat: {}", e);
                None
            }
        };

        Self {
            stop: Some(stop_tx),
            handle,
        }
    }

    /// Whether the heartbeat thread is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the timer and wait for an in-flight renew to finish.
    pub fn stop(mut self) {
        self.signal();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Stop the timer without waiting for the thread.
    pub fn cancel(mut self) {
        self.signal();
        self.handle.take();
    }

    fn signal(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.signal();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
