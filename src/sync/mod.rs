//! Wishlist reconciliation engine
//!
//! A single worker task owns the wishlist. Public calls, auth transitions
//! and enrichment results are all queued to it as [`queue::Command`]s and
//! applied one at a time; readers see committed [`WishlistSnapshot`]s
//! through a `watch` channel.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::{
    db::LocalStore,
    error::{AppError, AppResult},
    models::{
        AddOutcome, AuthState, MergeReport, NewWishlistItem, RemoveOutcome, SyncState, WishlistId,
        WishlistItem, WishlistSnapshot,
    },
    services::{AuthHandle, PlatformDirectory, ProgramCatalog, Session, WishlistRemote},
};

mod enrichment;
mod ids;
mod merge;
mod queue;
mod worker;


pub use queue::Ticket;

use enrichment::EnrichmentScheduler;
use queue::{Command, Reply};
use worker::Worker;

const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Bounds a remote or catalog call, mapping expiry onto `AppError::Timeout`
pub(crate) async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(limit)),
    }
}

pub struct SyncEngineBuilder {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn WishlistRemote>,
    catalog: Arc<dyn ProgramCatalog>,
    auth: AuthHandle,
    platforms: Arc<PlatformDirectory>,
    remote_timeout: Duration,
    queue_capacity: usize,
}

impl SyncEngineBuilder {
    pub fn platforms(mut self, platforms: Arc<PlatformDirectory>) -> Self {
        self.platforms = platforms;
        self
    }

    pub fn remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Spawns the worker and the auth observer. Must be called inside a
    /// tokio runtime.
    pub fn start(self) -> SyncEngine {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let (snapshots, snapshot_rx) = watch::channel(WishlistSnapshot::new(SyncState::Anonymous));
        let shutdown = CancellationToken::new();

        let mut sessions = self.auth.subscribe();
        let initial = sessions.borrow_and_update().state;

        let enrichment = EnrichmentScheduler::new(
            self.catalog,
            self.platforms,
            tx.downgrade(),
            self.remote_timeout,
        );
        let worker = Worker::new(
            self.store,
            self.remote,
            enrichment,
            self.remote_timeout,
            snapshots,
        );

        tokio::spawn(worker.run(initial, rx, shutdown.clone()));
        tokio::spawn(observe_auth(sessions, initial, tx.clone(), shutdown.clone()));

        SyncEngine {
            inner: Arc::new(EngineInner {
                commands: tx,
                snapshots: snapshot_rx,
                pending_refresh: Mutex::new(None),
                shutdown,
            }),
        }
    }
}

/// Forwards auth state changes into the command queue
async fn observe_auth(
    mut sessions: watch::Receiver<Session>,
    mut last: AuthState,
    commands: mpsc::Sender<Command>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = sessions.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let state = sessions.borrow_and_update().state;
        if state == last {
            continue;
        }
        last = state;

        tracing::debug!(auth = ?state, "Auth state changed");
        if commands.send(Command::AuthChanged(state)).await.is_err() {
            break;
        }
    }
}

struct EngineInner {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<WishlistSnapshot>,
    pending_refresh: Mutex<Option<CancellationToken>>,
    shutdown: CancellationToken,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Handle to a running engine; cheap to clone
///
/// Every operation is applied by the engine's worker in submission order.
/// Dropping the future of an in-flight call cancels it: if the worker has
/// not started it yet it is skipped, and a refresh that already started
/// discards its result.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    pub fn builder(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn WishlistRemote>,
        catalog: Arc<dyn ProgramCatalog>,
        auth: AuthHandle,
    ) -> SyncEngineBuilder {
        SyncEngineBuilder {
            store,
            remote,
            catalog,
            auth,
            platforms: Arc::new(PlatformDirectory::default()),
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Last committed snapshot
    pub fn snapshot(&self) -> WishlistSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    pub fn items(&self) -> Vec<WishlistItem> {
        self.inner.snapshots.borrow().items.clone()
    }

    pub fn state(&self) -> SyncState {
        self.inner.snapshots.borrow().state
    }

    pub fn subscribe(&self) -> watch::Receiver<WishlistSnapshot> {
        self.inner.snapshots.clone()
    }

    /// Resolves once every command queued before this call has been applied
    pub async fn ready(&self) -> AppResult<()> {
        let (reply, rx) = oneshot::channel();
        self.inner
            .commands
            .send(Command::Barrier { reply })
            .await
            .map_err(|_| AppError::EngineStopped)?;
        rx.await.map_err(|_| AppError::EngineStopped)
    }

    /// Reloads the list from its source of truth
    ///
    /// A newer refresh supersedes this one; the superseded call returns
    /// `AppError::Cancelled` and its result is never applied.
    pub async fn refresh(&self) -> AppResult<Vec<WishlistItem>> {
        let token = CancellationToken::new();
        if let Some(previous) = self.pending_refresh().replace(token.clone()) {
            previous.cancel();
        }

        let result = self
            .submit(token.clone(), |ticket, reply| Command::Refresh { ticket, reply })
            .await;

        // A newer refresh cancels this token under the same lock before
        // taking the slot, so an uncancelled token still owns it
        let mut pending = self.pending_refresh();
        if !token.is_cancelled() {
            pending.take();
        }

        result
    }

    fn pending_refresh(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.inner
            .pending_refresh
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn add(&self, item: NewWishlistItem) -> AppResult<AddOutcome> {
        self.submit(CancellationToken::new(), |ticket, reply| Command::Add {
            ticket,
            item,
            reply,
        })
        .await
    }

    pub async fn remove(&self, id: WishlistId) -> AppResult<RemoveOutcome> {
        self.submit(CancellationToken::new(), |ticket, reply| Command::Remove {
            ticket,
            id,
            reply,
        })
        .await
    }

    /// Pushes items still held in the local cache after a partial merge
    pub async fn retry_merge(&self) -> AppResult<MergeReport> {
        self.submit(CancellationToken::new(), |ticket, reply| {
            Command::RetryMerge { ticket, reply }
        })
        .await
    }

    /// Stops the worker and the auth observer; later calls fail with
    /// `AppError::EngineStopped`
    pub fn shutdown(&self) {
        tracing::info!("Shutting down sync engine");
        self.inner.shutdown.cancel();
    }

    async fn submit<T>(
        &self,
        token: CancellationToken,
        build: impl FnOnce(Ticket, Reply<T>) -> Command,
    ) -> AppResult<T> {
        if self.inner.shutdown.is_cancelled() {
            return Err(AppError::EngineStopped);
        }

        let ticket = Ticket::new(token.clone());
        let op_id = ticket.id();
        let guard = token.drop_guard();
        let (reply, rx) = oneshot::channel();

        self.inner
            .commands
            .send(build(ticket, reply))
            .await
            .map_err(|_| AppError::EngineStopped)?;

        let result = rx.await.map_err(|_| AppError::EngineStopped);
        guard.disarm();

        if let Ok(Err(e)) = &result {
            tracing::debug!(op_id = %op_id, error = %e, "Operation failed");
        }
        result?
    }
}
