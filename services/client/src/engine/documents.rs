//! services/client/src/engine/documents.rs
//!
//! The document sync engine: keeps the document list of the selected class in
//! step with the server while the ingestion pipeline processes uploads.
//!
//! The engine runs as one task. It refetches whenever the selection or the
//! refresh counter changes, and while any document is still pending it
//! refetches on a fixed interval. A trigger that arrives while a fetch is in
//! flight drops that fetch, so a slow response for an old selection is never
//! applied over a newer one.

use coursedocs_core::domain::{has_pending, ClassId, Document};
use coursedocs_core::ports::{DocumentService, PortError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::session::SessionStore;

//=========================================================================================
// Published State
//=========================================================================================

/// Where the engine is in its cycle for the selected class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No class selected.
    Idle,
    /// A fetch is in flight.
    Loading,
    /// Last fetch done, nothing pending, no timer armed.
    Settled,
    /// Last fetch done, at least one document pending, timer armed.
    Polling,
    /// The engine task has ended. The documents are the last ones fetched,
    /// if any; no fetch is in flight and no timer is armed.
    Stopped,
}

/// What the engine last published for the selected class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub class_id: Option<ClassId>,
    pub phase: SyncPhase,
    pub documents: Vec<Document>,
    /// Set when the last fetch failed. The document list is empty then.
    pub error: Option<String>,
}

impl Default for DocumentSnapshot {
    fn default() -> Self {
        Self {
            class_id: None,
            phase: SyncPhase::Idle,
            documents: Vec::new(),
            error: None,
        }
    }
}

//=========================================================================================
// The Engine
//=========================================================================================

#[derive(Clone)]
pub struct DocumentSyncEngine {
    documents: Arc<dyn DocumentService>,
    session: SessionStore,
    poll_interval: Duration,
    snapshot: Arc<watch::Sender<DocumentSnapshot>>,
}

/// Why the driver loop woke up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wake {
    Resync,
    Tick,
    Stop,
}

impl DocumentSyncEngine {
    pub fn new(documents: Arc<dyn DocumentService>, session: SessionStore, poll_interval: Duration) -> Self {
        let (snapshot, _) = watch::channel(DocumentSnapshot::default());
        Self {
            documents,
            session,
            poll_interval,
            snapshot: Arc::new(snapshot),
        }
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        self.snapshot.borrow().clone()
    }

    /// A receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<DocumentSnapshot> {
        self.snapshot.subscribe()
    }

    /// Starts the driver task. It follows `selection` and `refresh` until the
    /// returned handle is detached or dropped, or either sender goes away.
    pub fn spawn(
        &self,
        selection: watch::Receiver<Option<ClassId>>,
        refresh: watch::Receiver<u64>,
    ) -> SyncHandle {
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(self.clone().run(selection, refresh, shutdown.clone()));
        SyncHandle {
            shutdown,
            task: Some(task),
        }
    }

    async fn run(
        self,
        mut selection: watch::Receiver<Option<ClassId>>,
        mut refresh: watch::Receiver<u64>,
        shutdown: CancellationToken,
    ) {
        info!("Document sync started.");
        let mut ticker: Option<Interval> = None;
        let mut current: Option<ClassId> = None;
        let mut wake = Wake::Resync;

        loop {
            match wake {
                Wake::Stop => break,
                Wake::Resync => {
                    if ticker.take().is_some() {
                        debug!("Polling timer cancelled by a new trigger.");
                    }
                    let _ = *refresh.borrow_and_update();
                    current = selection.borrow_and_update().clone();
                    if current.is_none() {
                        self.go_idle();
                    }
                }
                Wake::Tick => debug!("Polling tick."),
            }

            if let Some(class_id) = &current {
                let fetched = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => Err(Wake::Stop),
                    changed = selection.changed() => Err(resync_or_stop(changed)),
                    changed = refresh.changed() => Err(resync_or_stop(changed)),
                    phase = self.sync_class(class_id) => Ok(phase),
                };
                match fetched {
                    Ok(SyncPhase::Polling) => {
                        if ticker.is_none() {
                            info!("Class {} has pending documents, polling every {:?}.", class_id, self.poll_interval);
                            ticker = Some(arm_timer(self.poll_interval));
                        }
                    }
                    Ok(_) => {
                        if ticker.take().is_some() {
                            info!("Class {} settled, polling stopped.", class_id);
                        }
                    }
                    Err(next) => {
                        debug!("In-flight fetch for class {} superseded.", class_id);
                        wake = next;
                        continue;
                    }
                }
            }

            wake = tokio::select! {
                biased;
                _ = shutdown.cancelled() => Wake::Stop,
                changed = selection.changed() => resync_or_stop(changed),
                changed = refresh.changed() => resync_or_stop(changed),
                _ = next_tick(&mut ticker) => Wake::Tick,
            };
        }

        self.stop();
        info!("Document sync stopped.");
    }

    /// Fetches the class's documents, publishes the result, and reports the
    /// phase it implies. Failures publish an empty list.
    async fn sync_class(&self, class_id: &ClassId) -> SyncPhase {
        self.snapshot.send_modify(|s| {
            if s.class_id.as_ref() != Some(class_id) {
                s.class_id = Some(class_id.clone());
                s.documents.clear();
                s.error = None;
            }
            s.phase = SyncPhase::Loading;
        });

        let token = self.session.token();
        let result = match &token {
            Some(token) => self.documents.list_documents(token, class_id).await,
            None => Err(PortError::Unauthorized),
        };

        match result {
            Ok(documents) => {
                let phase = if has_pending(&documents) {
                    SyncPhase::Polling
                } else {
                    SyncPhase::Settled
                };
                debug!("Class {}: {} documents, {:?}.", class_id, documents.len(), phase);
                self.publish(class_id, phase, documents, None);
                phase
            }
            Err(err) => {
                warn!("Could not list documents for class {}: {}", class_id, err);
                self.publish(class_id, SyncPhase::Settled, Vec::new(), Some(err.to_string()));
                if token.is_some() && err == PortError::Unauthorized {
                    self.session.revalidate().await;
                }
                SyncPhase::Settled
            }
        }
    }

    fn publish(&self, class_id: &ClassId, phase: SyncPhase, documents: Vec<Document>, error: Option<String>) {
        self.snapshot.send_replace(DocumentSnapshot {
            class_id: Some(class_id.clone()),
            phase,
            documents,
            error,
        });
    }

    fn stop(&self) {
        self.snapshot.send_if_modified(|s| {
            if s.class_id.is_none() {
                return false;
            }
            s.phase = SyncPhase::Stopped;
            true
        });
    }

    fn go_idle(&self) {
        self.snapshot.send_if_modified(|s| {
            if *s == DocumentSnapshot::default() {
                return false;
            }
            *s = DocumentSnapshot::default();
            true
        });
    }
}

fn resync_or_stop(changed: Result<(), watch::error::RecvError>) -> Wake {
    match changed {
        Ok(()) => Wake::Resync,
        Err(_) => Wake::Stop,
    }
}

fn arm_timer(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

//=========================================================================================
// Driver Handle
//=========================================================================================

/// Owns the running engine task. Dropping the handle stops the task and with
/// it the polling timer.
pub struct SyncHandle {
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    /// Stops the engine and waits for its task to finish.
    pub async fn detach(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Document sync task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
