use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        AddOutcome, AuthState, MergeReport, NewWishlistItem, ProgramId, RemoveOutcome, WishlistId,
        WishlistItem,
    },
};

pub(crate) type Reply<T> = oneshot::Sender<AppResult<T>>;

/// Identity and cancellation handle of one queued operation
#[derive(Debug, Clone)]
pub struct Ticket {
    id: Uuid,
    token: CancellationToken,
}

impl Ticket {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            token,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Set once the caller went away or a newer operation superseded this one
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Platform names fetched for one item, or `None` if the fetch failed
#[derive(Debug)]
pub(crate) struct EnrichmentResult {
    pub epoch: u64,
    pub id: WishlistId,
    pub program_id: ProgramId,
    pub platform_names: Option<Vec<String>>,
}

/// Everything that may touch the authoritative list goes through here
pub(crate) enum Command {
    Refresh {
        ticket: Ticket,
        reply: Reply<Vec<WishlistItem>>,
    },
    Add {
        ticket: Ticket,
        item: NewWishlistItem,
        reply: Reply<AddOutcome>,
    },
    Remove {
        ticket: Ticket,
        id: WishlistId,
        reply: Reply<RemoveOutcome>,
    },
    RetryMerge {
        ticket: Ticket,
        reply: Reply<MergeReport>,
    },
    /// Resolves once everything queued before it has been applied
    Barrier { reply: oneshot::Sender<()> },
    AuthChanged(AuthState),
    Enriched(EnrichmentResult),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Refresh { .. } => "refresh",
            Command::Add { .. } => "add",
            Command::Remove { .. } => "remove",
            Command::RetryMerge { .. } => "retry_merge",
            Command::Barrier { .. } => "barrier",
            Command::AuthChanged(_) => "auth_changed",
            Command::Enriched(_) => "enriched",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_follows_token() {
        let token = CancellationToken::new();
        let ticket = Ticket::new(token.clone());
        assert!(!ticket.is_cancelled());

        token.cancel();
        assert!(ticket.is_cancelled());
    }

    #[test]
    fn test_tickets_have_distinct_ids() {
        let a = Ticket::new(CancellationToken::new());
        let b = Ticket::new(CancellationToken::new());
        assert_ne!(a.id(), b.id());
    }
}
