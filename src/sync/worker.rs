use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use super::bounded;
use super::enrichment::EnrichmentScheduler;
use super::ids::LocalIdGenerator;
use super::merge::push_local_items;
use super::queue::{Command, EnrichmentResult, Ticket};
use crate::{
    db::LocalStore,
    error::{AppError, AppResult},
    models::{
        AddOutcome, AuthState, MergeReport, NewWishlistItem, RemoveOutcome, SyncState, WishlistId,
        WishlistItem, WishlistSnapshot,
    },
    services::WishlistRemote,
};

/// Sole owner of the authoritative list
///
/// Runs on one task and handles one command at a time, so a background
/// refresh can never interleave with a user-initiated add or remove.
/// Observers only ever see what `publish` hands out at command boundaries.
pub(crate) struct Worker {
    state: SyncState,
    items: Vec<WishlistItem>,
    error: Option<String>,
    is_loading: bool,
    last_merge: Option<MergeReport>,
    /// Bumped on every auth transition; enrichment results from an older
    /// epoch are dropped
    epoch: u64,
    version: u64,
    ids: LocalIdGenerator,
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn WishlistRemote>,
    enrichment: EnrichmentScheduler,
    remote_timeout: Duration,
    snapshots: watch::Sender<WishlistSnapshot>,
}

impl Worker {
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn WishlistRemote>,
        enrichment: EnrichmentScheduler,
        remote_timeout: Duration,
        snapshots: watch::Sender<WishlistSnapshot>,
    ) -> Self {
        Self {
            state: SyncState::Anonymous,
            items: Vec::new(),
            error: None,
            is_loading: false,
            last_merge: None,
            epoch: 0,
            version: 0,
            ids: LocalIdGenerator::default(),
            store,
            remote,
            enrichment,
            remote_timeout,
            snapshots,
        }
    }

    pub async fn run(
        mut self,
        initial: AuthState,
        mut commands: mpsc::Receiver<Command>,
        shutdown: CancellationToken,
    ) {
        tracing::info!(
            auth = ?initial,
            store = self.store.name(),
            "Sync worker started"
        );

        self.bootstrap(initial).await;
        self.publish();

        loop {
            let command = tokio::select! {
                _ = shutdown.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };

            self.handle(command).await;
            self.publish();
        }

        tracing::info!("Sync worker stopped");
    }

    async fn bootstrap(&mut self, initial: AuthState) {
        match initial {
            AuthState::Authenticated => self.enter_authenticated().await,
            AuthState::Anonymous | AuthState::Authenticating => {
                if let Err(e) = self.reload_local(None).await {
                    tracing::warn!(error = %e, "Failed to load local wishlist");
                }
            }
        }
    }

    async fn handle(&mut self, command: Command) {
        tracing::trace!(command = command.name(), "Handling command");

        match command {
            Command::Refresh { ticket, reply } => {
                let result = self.refresh(&ticket).await;
                let _ = reply.send(result);
            }
            Command::Add {
                ticket,
                item,
                reply,
            } => {
                let result = self.add(&ticket, item).await;
                let _ = reply.send(result);
            }
            Command::Remove { ticket, id, reply } => {
                let result = self.remove(&ticket, id).await;
                let _ = reply.send(result);
            }
            Command::RetryMerge { ticket, reply } => {
                let result = self.retry_merge(&ticket).await;
                let _ = reply.send(result);
            }
            Command::Barrier { reply } => {
                let _ = reply.send(());
            }
            Command::AuthChanged(auth) => self.auth_changed(auth).await,
            Command::Enriched(result) => self.apply_enrichment(result).await,
        }
    }

    fn publish(&mut self) {
        self.version += 1;
        self.snapshots.send_replace(WishlistSnapshot {
            state: self.state,
            items: self.items.clone(),
            error: self.error.clone(),
            is_loading: self.is_loading,
            last_merge: self.last_merge.clone(),
            updated_at: Utc::now(),
            version: self.version,
        });
    }

    // ------------------------------------------------------------------
    // Auth transitions
    // ------------------------------------------------------------------

    async fn auth_changed(&mut self, auth: AuthState) {
        match (self.state.is_remote(), auth) {
            (false, AuthState::Authenticated) => {
                tracing::info!("Login observed");
                self.enter_authenticated().await;
            }
            (true, AuthState::Anonymous) => {
                tracing::info!("Logout observed");
                self.enter_anonymous().await;
            }
            (_, AuthState::Authenticating) => {
                tracing::debug!(state = %self.state, "Authentication in progress");
            }
            _ => {}
        }
    }

    async fn enter_authenticated(&mut self) {
        self.begin_epoch();

        let pending = match self.store.load().await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read local wishlist before merge");
                Vec::new()
            }
        };

        if pending.is_empty() {
            self.state = SyncState::Authenticated;
            let _ = self.refresh_remote(None).await;
        } else {
            self.merge_and_refresh(pending).await;
        }
    }

    async fn enter_anonymous(&mut self) {
        self.begin_epoch();
        self.state = SyncState::Anonymous;
        self.items.clear();
        self.error = None;

        if let Err(e) = self.reload_local(None).await {
            tracing::warn!(error = %e, "Failed to load local wishlist after logout");
        }
    }

    fn begin_epoch(&mut self) {
        self.epoch += 1;
        self.enrichment.reset();
    }

    // ------------------------------------------------------------------
    // Merge protocol
    // ------------------------------------------------------------------

    /// Pushes `pending`, keeps only the failed items in the local cache,
    /// then takes the server list as the new authoritative list
    async fn merge_and_refresh(&mut self, pending: Vec<WishlistItem>) -> MergeReport {
        self.state = SyncState::MergingToServer;
        self.is_loading = true;
        self.publish();

        tracing::info!(items = pending.len(), "Merging local wishlist into server");
        let report = push_local_items(self.remote.as_ref(), &pending, self.remote_timeout).await;

        let retained: Vec<WishlistItem> = report.failed.iter().map(|f| f.item.clone()).collect();
        let persisted = if retained.is_empty() {
            self.store.clear().await
        } else {
            self.store.save(&retained).await
        };
        if let Err(e) = persisted {
            tracing::error!(error = %e, "Failed to update local wishlist after merge");
        }

        if report.is_complete() {
            tracing::info!(merged = report.succeeded.len(), "Merge completed");
        } else {
            tracing::warn!(
                merged = report.succeeded.len(),
                retained = report.failed.len(),
                "Merge partially failed, unmerged items kept locally"
            );
        }

        self.last_merge = Some(report.clone());
        self.state = SyncState::Authenticated;
        let _ = self.refresh_remote(None).await;

        report
    }

    async fn retry_merge(&mut self, ticket: &Ticket) -> AppResult<MergeReport> {
        if ticket.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        if !self.state.is_remote() {
            return Err(AppError::NotAuthenticated);
        }

        let pending = self.store.load().await?;
        if pending.is_empty() {
            return Ok(MergeReport::default());
        }

        Ok(self.merge_and_refresh(pending).await)
    }

    // ------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------

    async fn refresh(&mut self, ticket: &Ticket) -> AppResult<Vec<WishlistItem>> {
        if ticket.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        if self.state.is_remote() {
            self.refresh_remote(Some(ticket)).await
        } else {
            self.reload_local(Some(ticket)).await
        }
    }

    async fn reload_local(&mut self, ticket: Option<&Ticket>) -> AppResult<Vec<WishlistItem>> {
        let stored = match self.store.load().await {
            Ok(stored) => stored,
            Err(e) => {
                self.error = Some(format!("Failed to load wishlist: {}", e));
                return Err(e);
            }
        };

        if ticket.is_some_and(Ticket::is_cancelled) {
            return Err(AppError::Cancelled);
        }

        self.ids.observe(&stored);
        self.replace_items(stored);
        Ok(self.items.clone())
    }

    async fn refresh_remote(&mut self, ticket: Option<&Ticket>) -> AppResult<Vec<WishlistItem>> {
        self.is_loading = true;
        self.publish();

        let result = bounded(self.remote_timeout, self.remote.list()).await;
        self.is_loading = false;

        if ticket.is_some_and(Ticket::is_cancelled) {
            tracing::debug!("Discarding superseded refresh");
            return Err(AppError::Cancelled);
        }

        match result {
            Ok(mut list) => {
                let unsynced = self.unsynced_local_items(&list).await;
                list.extend(unsynced);
                self.state = SyncState::Authenticated;
                self.replace_items(list);
                Ok(self.items.clone())
            }
            Err(e) => {
                if e.is_unreachable() {
                    self.state = SyncState::SyncFailed;
                }
                tracing::warn!(error = %e, state = %self.state, "Remote wishlist refresh failed");
                self.error = Some(format!("Failed to load wishlist: {}", e));
                Err(e)
            }
        }
    }

    /// Local items still waiting for the server (degraded adds and failed
    /// merge pushes) whose program is not on `server`
    async fn unsynced_local_items(&mut self, server: &[WishlistItem]) -> Vec<WishlistItem> {
        let stored = match self.store.load().await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read unsynced local items");
                return Vec::new();
            }
        };

        self.ids.observe(&stored);
        stored
            .into_iter()
            .filter(|item| item.id.is_local())
            .filter(|item| !server.iter().any(|s| s.program_id == item.program_id))
            .collect()
    }

    /// Takes `fresh` wholesale, carrying over platform names already known
    /// for the same entry, then schedules enrichment for the rest
    fn replace_items(&mut self, mut fresh: Vec<WishlistItem>) {
        for item in fresh.iter_mut().filter(|item| item.needs_enrichment()) {
            item.platform_names = self
                .items
                .iter()
                .find(|old| old.id == item.id && old.program_id == item.program_id)
                .and_then(|old| old.platform_names.clone());
        }

        self.items = fresh;
        self.error = None;
        self.enrichment.schedule(self.epoch, &self.items);
    }

    // ------------------------------------------------------------------
    // Add / remove
    // ------------------------------------------------------------------

    async fn add(&mut self, ticket: &Ticket, new: NewWishlistItem) -> AppResult<AddOutcome> {
        if ticket.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let program_id = new.program_id;
        if self.items.iter().any(|item| item.program_id == program_id) {
            tracing::info!(program_id = program_id, "Program already wishlisted");
            return Ok(AddOutcome::AlreadyPresent { program_id });
        }

        if !self.state.is_remote() {
            let item = self.add_local(new).await?;
            return Ok(AddOutcome::Added { item });
        }

        match bounded(self.remote_timeout, self.remote.add(program_id)).await {
            Ok(()) | Err(AppError::Conflict(_)) => {
                // The write is on the server; reflect it even if the refresh fails
                let _ = self.refresh_remote(None).await;
                let confirmed = self
                    .items
                    .iter()
                    .find(|item| item.program_id == program_id)
                    .cloned();

                tracing::info!(program_id = program_id, "Program wishlisted");
                Ok(match confirmed {
                    Some(item) => AddOutcome::Added { item },
                    None => AddOutcome::Accepted { program_id },
                })
            }
            Err(e) if e.is_unauthorized() => {
                tracing::warn!(
                    program_id = program_id,
                    "Server rejected add as unauthorized, saving locally only"
                );
                let item = self.add_local(new).await?;
                Ok(AddOutcome::SavedLocallyOnly { item })
            }
            Err(e) => {
                tracing::warn!(program_id = program_id, error = %e, "Failed to add program");
                Err(e)
            }
        }
    }

    /// Persists a new local item, then shows it
    ///
    /// While anonymous the local cache mirrors the list. While authenticated
    /// it holds only items waiting for the server, so the item is appended
    /// to whatever is already stored there.
    async fn add_local(&mut self, new: NewWishlistItem) -> AppResult<WishlistItem> {
        let mut stored = if self.state.is_remote() {
            let mut stored = self.store.load().await?;
            stored.retain(|item| item.program_id != new.program_id);
            stored
        } else {
            self.items.clone()
        };

        self.ids.observe(&stored);
        let item = new.into_item(self.ids.next_id()?);
        stored.push(item.clone());
        self.store.save(&stored).await?;

        self.items.push(item.clone());
        self.enrichment.schedule(self.epoch, std::slice::from_ref(&item));

        tracing::info!(
            program_id = item.program_id,
            id = %item.id,
            "Program saved to local wishlist"
        );
        Ok(item)
    }

    async fn remove(&mut self, ticket: &Ticket, id: WishlistId) -> AppResult<RemoveOutcome> {
        if ticket.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        if !self.items.iter().any(|item| item.id == id) {
            return Ok(RemoveOutcome::NotPresent);
        }

        match id {
            WishlistId::Server(server_id) if self.state.is_remote() => {
                match bounded(self.remote_timeout, self.remote.remove(server_id)).await {
                    Ok(()) | Err(AppError::NotFound(_)) => {}
                    Err(e) => {
                        tracing::warn!(id = %id, error = %e, "Failed to remove program");
                        return Err(e);
                    }
                }
                self.items.retain(|item| item.id != id);
            }
            _ => self.remove_local(id).await?,
        }

        tracing::info!(id = %id, "Removed from wishlist");
        Ok(RemoveOutcome::Removed)
    }

    async fn remove_local(&mut self, id: WishlistId) -> AppResult<()> {
        let mut stored = if self.state.is_remote() {
            self.store.load().await?
        } else {
            self.items.clone()
        };

        stored.retain(|item| item.id != id);
        self.store.save(&stored).await?;
        self.items.retain(|item| item.id != id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Enrichment
    // ------------------------------------------------------------------

    async fn apply_enrichment(&mut self, result: EnrichmentResult) {
        self.enrichment.complete(result.epoch, result.id);

        if result.epoch != self.epoch {
            tracing::debug!(id = %result.id, "Discarding enrichment from a previous session");
            return;
        }
        let Some(names) = result.platform_names else {
            return;
        };
        let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.id == result.id && item.program_id == result.program_id)
        else {
            return;
        };

        item.platform_names = Some(names);
        let patched = item.clone();

        let persisted = if !self.state.is_remote() {
            self.store.save(&self.items).await
        } else if patched.id.is_local() {
            self.patch_stored(&patched).await
        } else {
            Ok(())
        };

        if let Err(e) = persisted {
            tracing::debug!(id = %patched.id, error = %e, "Failed to persist enrichment");
        }
    }

    async fn patch_stored(&self, patched: &WishlistItem) -> AppResult<()> {
        let mut stored = self.store.load().await?;
        let Some(entry) = stored.iter_mut().find(|item| item.id == patched.id) else {
            return Ok(());
        };
        entry.platform_names = patched.platform_names.clone();
        self.store.save(&stored).await
    }
}
