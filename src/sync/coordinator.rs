//! Process-wide unlocked state and its fan-out to listening contexts.
//!
//! The coordinator mirrors what the owning `VaultStore` publishes and
//! answers point queries from any context. Pushes go out on a
//! `tokio::sync::broadcast` channel: at-most-once, best-effort, in
//! publish order. A context that was not listening, or fell behind,
//! recovers by calling `query_status` / `query_for_domain`.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::protocol::{AutofillResult, Event, Request, Response, Snapshot, StatusReport};
use crate::matcher::find_match;
use crate::vault::VaultRecord;

/// Default number of snapshots a slow listener may fall behind by.
pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct SyncState {
    is_logged_in: bool,
    account_email: Option<String>,
    entries: Vec<VaultRecord>,
}

struct Inner {
    state: RwLock<SyncState>,
    tx: broadcast::Sender<Snapshot>,
}

/// Cheap-to-clone handle to the shared coordinator.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

impl Default for SyncCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SyncCoordinator {
    /// Create a coordinator whose listeners may lag by `capacity` snapshots.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(SyncState::default()),
                tx,
            }),
        }
    }

    /// Apply `event` to the mirrored state, then push the new snapshot to
    /// every current listener. Entries published while locked are dropped.
    ///
    /// Returns how many listeners the snapshot was handed to. Zero
    /// listeners is not an error.
    pub fn publish(&self, event: Event) -> usize {
        let snapshot = {
            let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            match event {
                Event::Login { email } => {
                    info!(%email, "session unlocked");
                    state.is_logged_in = true;
                    state.account_email = Some(email);
                    state.entries.clear();
                }
                Event::Logout => {
                    info!("session locked");
                    state.is_logged_in = false;
                    state.account_email = None;
                    state.entries.clear();
                }
                Event::EntriesChanged { entries } if !state.is_logged_in => {
                    // A late push after logout: never cache or fan out
                    // entries while locked.
                    debug!(count = entries.len(), "dropping entries push while locked");
                    return 0;
                }
                Event::EntriesChanged { entries } => {
                    debug!(count = entries.len(), "entry cache refreshed");
                    state.entries = entries;
                }
            }
            Snapshot {
                is_logged_in: state.is_logged_in,
                entries: state.entries.clone(),
            }
        };

        // Sending while nobody listens returns Err; that is fine here.
        let delivered = self.inner.tx.send(snapshot).unwrap_or(0);
        debug!(delivered, "snapshot broadcast");
        delivered
    }

    /// Register a new listening context. It only sees snapshots published
    /// after this call.
    pub fn subscribe(&self) -> Listener {
        Listener {
            rx: self.inner.tx.subscribe(),
            missed: 0,
        }
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }

    /// Find the entry matching `hostname`. Always `None` while locked,
    /// whatever the cache still holds.
    pub fn query_for_domain(&self, hostname: &str) -> Option<VaultRecord> {
        let state = self.inner.state.read().unwrap_or_else(PoisonError::into_inner);
        if !state.is_logged_in {
            return None;
        }
        find_match(&state.entries, hostname).cloned()
    }

    /// Point-in-time status.
    pub fn query_status(&self) -> StatusReport {
        let state = self.inner.state.read().unwrap_or_else(PoisonError::into_inner);
        StatusReport {
            is_logged_in: state.is_logged_in,
            account_email: state.account_email.clone(),
            entry_count: if state.is_logged_in {
                state.entries.len()
            } else {
                0
            },
        }
    }

    /// Privileged read of the one credential matching `hostname`.
    pub fn autofill(&self, hostname: &str) -> Option<AutofillResult> {
        let fill = self
            .query_for_domain(hostname)
            .map(|record| AutofillResult::from(&record));
        match &fill {
            Some(f) => info!(platform = %f.platform, "autofill served"),
            None => debug!("autofill found no match"),
        }
        fill
    }

    /// Answer one read-only request.
    pub fn handle(&self, request: Request) -> Response {
        match request {
            Request::Status => Response::Status(self.query_status()),
            Request::Domain { hostname } => Response::Domain {
                entry: self.query_for_domain(&hostname),
            },
            Request::Autofill { hostname } => Response::Autofill {
                fill: self.autofill(&hostname),
            },
        }
    }
}

/// One listening context's end of the broadcast channel.
pub struct Listener {
    rx: broadcast::Receiver<Snapshot>,
    missed: u64,
}

impl Listener {
    /// Wait for the next snapshot. Snapshots dropped because this
    /// listener fell behind are skipped and counted. Returns `None` once
    /// the coordinator is gone.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        loop {
            match self.rx.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => self.note_lag(skipped),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of `recv`; `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<Snapshot> {
        loop {
            match self.rx.try_recv() {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => self.note_lag(skipped),
                Err(_) => return None,
            }
        }
    }

    /// Total snapshots this listener never saw.
    pub fn missed(&self) -> u64 {
        self.missed
    }

    fn note_lag(&mut self, skipped: u64) {
        warn!(skipped, "listener fell behind, re-query status to resync");
        self.missed += skipped;
    }
}
