// ── Polling coordinator ──
//
// Owns the cached `Snapshot` for one entry. A background task polls on a
// fixed interval; writes ask for an out-of-band refresh. At most one fetch
// is in flight: concurrent callers await the same shared future and all
// see its outcome.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use changedetect_api::ChangeDetectionClient;

use crate::error::CoreError;
use crate::snapshot::{Snapshot, UpdateStatus};

type RefreshFuture = Shared<BoxFuture<'static, Result<Arc<Snapshot>, UpdateFailed>>>;

/// A failed poll, shared by every caller that awaited it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error communicating with API: {message}")]
pub struct UpdateFailed {
    pub message: String,
}

/// Which optional resources are part of each poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollScope {
    pub tags: bool,
    pub notifications: bool,
}

impl Default for PollScope {
    fn default() -> Self {
        Self {
            tags: true,
            notifications: true,
        }
    }
}

// ── Coordinator ──────────────────────────────────────────────────

/// Cheaply cloneable handle to one entry's poller.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    client: ChangeDetectionClient,
    scan_interval: Duration,
    scope: PollScope,
    snapshot: watch::Sender<Option<Arc<Snapshot>>>,
    status: watch::Sender<UpdateStatus>,
    in_flight: Mutex<Option<RefreshFuture>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    /// Create a coordinator. Nothing is fetched until
    /// [`first_refresh()`](Self::first_refresh) or [`start()`](Self::start).
    pub fn new(client: ChangeDetectionClient, scan_interval: Duration, scope: PollScope) -> Self {
        let (snapshot, _) = watch::channel(None);
        let (status, _) = watch::channel(UpdateStatus::default());

        Self {
            inner: Arc::new(CoordinatorInner {
                client,
                scan_interval,
                scope,
                snapshot,
                status,
                in_flight: Mutex::new(None),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn client(&self) -> &ChangeDetectionClient {
        &self.inner.client
    }

    pub fn scan_interval(&self) -> Duration {
        self.inner.scan_interval
    }

    pub fn scope(&self) -> PollScope {
        self.inner.scope
    }

    /// Whether both handles refer to the same poller.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Initial poll during entry setup. A failure here aborts setup.
    pub async fn first_refresh(&self) -> Result<Arc<Snapshot>, CoreError> {
        self.refresh()
            .await
            .map_err(|e| CoreError::SetupFailed {
                message: e.to_string(),
            })
    }

    /// Poll now, or join the poll already in flight.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, UpdateFailed> {
        let fut = {
            let mut slot = self.inner.in_flight.lock().await;
            match slot.as_ref() {
                Some(running) => {
                    debug!("joining in-flight refresh");
                    running.clone()
                }
                None => {
                    let fut = self.clone().poll_once().boxed().shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };

        let result = fut.clone().await;

        let mut slot = self.inner.in_flight.lock().await;
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&fut)) {
            *slot = None;
        }
        result
    }

    /// Refresh after a write. Failures are logged, never returned.
    pub async fn request_refresh(&self) {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "refresh after write failed");
        }
    }

    async fn poll_once(self) -> Result<Arc<Snapshot>, UpdateFailed> {
        match self.fetch().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let fetched_at = snapshot.fetched_at;
                self.inner.snapshot.send_replace(Some(Arc::clone(&snapshot)));
                self.inner.status.send_modify(|s| s.succeeded(fetched_at));
                debug!(watches = snapshot.watch_count(), "poll complete");
                Ok(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "poll failed");
                let message = e.to_string();
                self.inner.status.send_modify(|s| s.failed(message.clone()));
                Err(UpdateFailed { message })
            }
        }
    }

    async fn fetch(&self) -> Result<Snapshot, changedetect_api::Error> {
        let client = &self.inner.client;
        let scope = self.inner.scope;

        let tags = async {
            if scope.tags {
                client.list_tags().await.map(Some)
            } else {
                Ok(None)
            }
        };
        let notifications = async {
            if scope.notifications {
                client.get_notifications().await.map(Some)
            } else {
                Ok(None)
            }
        };

        let (watches, tags, systeminfo, notifications) = tokio::try_join!(
            client.list_watches(None, false),
            tags,
            client.systeminfo(),
            notifications,
        )?;

        Ok(Snapshot {
            watches,
            tags,
            systeminfo,
            notifications,
            fetched_at: Utc::now(),
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the interval task. Calling it twice is a no-op.
    pub async fn start(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() || self.inner.cancel.is_cancelled() {
            return;
        }
        let coordinator = self.clone();
        let cancel = self.inner.cancel.clone();
        handles.push(tokio::spawn(refresh_task(
            coordinator,
            self.inner.scan_interval,
            cancel,
        )));
        info!(interval_secs = self.inner.scan_interval.as_secs(), "polling started");
    }

    /// Stop polling and wait for the task to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        *self.inner.in_flight.lock().await = None;
        debug!("polling stopped");
    }

    // ── Observation ──────────────────────────────────────────────

    /// Latest snapshot, `None` before the first successful poll.
    pub fn data(&self) -> Option<Arc<Snapshot>> {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.inner.snapshot.subscribe()
    }

    pub fn status(&self) -> watch::Receiver<UpdateStatus> {
        self.inner.status.subscribe()
    }

    pub fn last_update_success(&self) -> bool {
        self.inner.status.borrow().last_update_success
    }
}

// ── Background task ──────────────────────────────────────────────

async fn refresh_task(coordinator: Coordinator, every: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                // Failures are recorded in the status channel by poll_once.
                let _ = coordinator.refresh().await;
            }
        }
    }
}
