use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::bounded;
use super::queue::{Command, EnrichmentResult};
use crate::{
    models::{WishlistId, WishlistItem},
    services::{PlatformDirectory, ProgramCatalog},
};

/// Fire-and-forget platform lookups for items that lack them
///
/// Each item gets its own task; results come back to the worker as
/// `Command::Enriched` so patches are serialized with every other mutation.
/// The scheduler holds only a weak sender, so pending lookups never keep a
/// stopped engine alive.
pub(crate) struct EnrichmentScheduler {
    catalog: Arc<dyn ProgramCatalog>,
    platforms: Arc<PlatformDirectory>,
    commands: mpsc::WeakSender<Command>,
    timeout: Duration,
    in_flight: HashSet<(u64, WishlistId)>,
}

impl EnrichmentScheduler {
    pub fn new(
        catalog: Arc<dyn ProgramCatalog>,
        platforms: Arc<PlatformDirectory>,
        commands: mpsc::WeakSender<Command>,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            platforms,
            commands,
            timeout,
            in_flight: HashSet::new(),
        }
    }

    /// Spawns a lookup for every item without platform names that is not
    /// already being looked up in this epoch. Returns how many were spawned.
    pub fn schedule(&mut self, epoch: u64, items: &[WishlistItem]) -> usize {
        let mut scheduled = 0;

        for item in items.iter().filter(|item| item.needs_enrichment()) {
            if !self.in_flight.insert((epoch, item.id)) {
                continue;
            }

            let catalog = Arc::clone(&self.catalog);
            let platforms = Arc::clone(&self.platforms);
            let commands = self.commands.clone();
            let timeout = self.timeout;
            let id = item.id;
            let program_id = item.program_id;

            tokio::spawn(async move {
                let platform_names =
                    match bounded(timeout, catalog.fetch_program_detail(program_id)).await {
                        Ok(detail) => Some(platforms.platform_names(&detail.availability)),
                        Err(e) => {
                            tracing::debug!(
                                program_id = program_id,
                                error = %e,
                                "Enrichment failed, leaving item as-is"
                            );
                            None
                        }
                    };

                if let Some(tx) = commands.upgrade() {
                    let result = EnrichmentResult {
                        epoch,
                        id,
                        program_id,
                        platform_names,
                    };
                    let _ = tx.send(Command::Enriched(result)).await;
                }
            });

            scheduled += 1;
        }

        if scheduled > 0 {
            tracing::debug!(scheduled = scheduled, epoch = epoch, "Scheduled enrichment");
        }

        scheduled
    }

    pub fn complete(&mut self, epoch: u64, id: WishlistId) {
        self.in_flight.remove(&(epoch, id));
    }

    /// Forgets lookups from earlier epochs; their results are discarded on arrival
    pub fn reset(&mut self) {
        self.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{ApiAvailability, ApiProgramDetail, NewWishlistItem};
    use crate::services::catalog::MockProgramCatalog;

    fn detail(program_id: i64, platforms: &[i64]) -> ApiProgramDetail {
        ApiProgramDetail {
            program_id,
            title: String::new(),
            availability: platforms
                .iter()
                .map(|ott_id| ApiAvailability {
                    ott_id: *ott_id,
                    logo_url: None,
                    release_date: None,
                    expire_date: None,
                })
                .collect(),
        }
    }

    fn scheduler(
        catalog: MockProgramCatalog,
    ) -> (EnrichmentScheduler, mpsc::Sender<Command>, mpsc::Receiver<Command>) {
        let (tx, rx) = mpsc::channel(16);
        let scheduler = EnrichmentScheduler::new(
            Arc::new(catalog),
            Arc::new(PlatformDirectory::default()),
            tx.downgrade(),
            Duration::from_secs(1),
        );
        (scheduler, tx, rx)
    }

    async fn next_result(rx: &mut mpsc::Receiver<Command>) -> EnrichmentResult {
        match rx.recv().await {
            Some(Command::Enriched(result)) => result,
            Some(other) => panic!("unexpected command {}", other.name()),
            None => panic!("channel closed"),
        }
    }

    #[tokio::test]
    async fn test_only_unenriched_items_are_scheduled() {
        let mut catalog = MockProgramCatalog::new();
        catalog
            .expect_fetch_program_detail()
            .times(1)
            .returning(|id| Ok(detail(id, &[1, 5, 1])));

        let (mut scheduler, _tx, mut rx) = scheduler(catalog);

        let pending = NewWishlistItem::new(42, "Show A").into_item(WishlistId::Local(1));
        let mut done = NewWishlistItem::new(7, "Show B").into_item(WishlistId::Local(2));
        done.platform_names = Some(vec![]);

        assert_eq!(scheduler.schedule(0, &[pending.clone(), done]), 1);

        let result = next_result(&mut rx).await;
        assert_eq!(result.id, pending.id);
        assert_eq!(
            result.platform_names,
            Some(vec!["Netflix".to_string(), "Disney+".to_string()])
        );
    }

    #[tokio::test]
    async fn test_in_flight_items_are_not_rescheduled() {
        let mut catalog = MockProgramCatalog::new();
        catalog
            .expect_fetch_program_detail()
            .times(2)
            .returning(|id| Ok(detail(id, &[2])));

        let (mut scheduler, _tx, mut rx) = scheduler(catalog);
        let item = NewWishlistItem::new(42, "Show A").into_item(WishlistId::Local(1));

        assert_eq!(scheduler.schedule(0, &[item.clone()]), 1);
        assert_eq!(scheduler.schedule(0, &[item.clone()]), 0);

        let result = next_result(&mut rx).await;
        scheduler.complete(result.epoch, result.id);
        assert_eq!(scheduler.schedule(0, &[item]), 1);
        next_result(&mut rx).await;
    }

    #[tokio::test]
    async fn test_failures_report_no_names() {
        let mut catalog = MockProgramCatalog::new();
        catalog
            .expect_fetch_program_detail()
            .returning(|_| Err(AppError::NotFound("/programs/42".to_string())));

        let (mut scheduler, _tx, mut rx) = scheduler(catalog);
        let item = NewWishlistItem::new(42, "Show A").into_item(WishlistId::Local(1));
        scheduler.schedule(3, &[item]);

        let result = next_result(&mut rx).await;
        assert_eq!(result.epoch, 3);
        assert_eq!(result.platform_names, None);
    }
}
