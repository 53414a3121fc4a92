use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::{ProgramId, WishlistItem};

/// Authentication state as published by the auth collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthState {
    Anonymous,
    Authenticating,
    Authenticated,
}

/// Lifecycle state of the sync engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncState {
    /// Wishlist lives in the device-local cache
    Anonymous,
    /// Local items are being pushed to the server after login
    MergingToServer,
    /// Wishlist lives on the server
    Authenticated,
    /// Authenticated, but the last refresh could not reach the server
    SyncFailed,
}

impl SyncState {
    /// Whether mutations go to the remote store
    pub fn is_remote(&self) -> bool {
        !matches!(self, SyncState::Anonymous)
    }
}

impl Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncState::Anonymous => write!(f, "anonymous"),
            SyncState::MergingToServer => write!(f, "merging_to_server"),
            SyncState::Authenticated => write!(f, "authenticated"),
            SyncState::SyncFailed => write!(f, "sync_failed"),
        }
    }
}

/// A local item the merge protocol could not push
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeFailure {
    pub item: WishlistItem,
    pub reason: String,
}

/// Outcome of pushing local items to the server after login
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    pub succeeded: Vec<ProgramId>,
    pub failed: Vec<MergeFailure>,
}

impl MergeReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Result of an add request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum AddOutcome {
    /// The item is in the list under its final id
    Added { item: WishlistItem },
    /// An item for the same program already exists; nothing changed
    AlreadyPresent {
        #[serde(rename = "programId")]
        program_id: ProgramId,
    },
    /// The server refused the write for authorization reasons; the item was
    /// kept in the device-local cache instead
    SavedLocallyOnly { item: WishlistItem },
    /// The server accepted the write but the confirmed entry could not be
    /// read back yet
    Accepted {
        #[serde(rename = "programId")]
        program_id: ProgramId,
    },
}

/// Result of a remove request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RemoveOutcome {
    Removed,
    NotPresent,
}

/// Committed view of the wishlist, published after every queued operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistSnapshot {
    pub state: SyncState,
    pub items: Vec<WishlistItem>,
    pub error: Option<String>,
    pub is_loading: bool,
    pub last_merge: Option<MergeReport>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl WishlistSnapshot {
    pub fn new(state: SyncState) -> Self {
        Self {
            state,
            items: Vec::new(),
            error: None,
            is_loading: false,
            last_merge: None,
            updated_at: Utc::now(),
            version: 0,
        }
    }

    pub fn contains_program(&self, program_id: ProgramId) -> bool {
        self.items.iter().any(|item| item.program_id == program_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewWishlistItem, WishlistId};

    #[test]
    fn test_add_outcome_serialization() {
        let outcome = AddOutcome::AlreadyPresent { program_id: 42 };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "alreadyPresent");
        assert_eq!(json["programId"], 42);

        let item = NewWishlistItem::new(42, "Show A").into_item(WishlistId::Local(1));
        let json = serde_json::to_value(AddOutcome::SavedLocallyOnly { item }).unwrap();
        assert_eq!(json["outcome"], "savedLocallyOnly");
        assert_eq!(json["item"]["programId"], 42);
    }

    #[test]
    fn test_sync_state_remote_backing() {
        assert!(!SyncState::Anonymous.is_remote());
        assert!(SyncState::Authenticated.is_remote());
        assert!(SyncState::SyncFailed.is_remote());
        assert_eq!(SyncState::SyncFailed.to_string(), "sync_failed");
    }

    #[test]
    fn test_merge_report_counts() {
        let item = NewWishlistItem::new(7, "Show B").into_item(WishlistId::Local(2));
        let report = MergeReport {
            succeeded: vec![42],
            failed: vec![MergeFailure {
                item,
                reason: "timed out".to_string(),
            }],
        };

        assert_eq!(report.attempted(), 2);
        assert!(!report.is_complete());
        assert!(MergeReport::default().is_complete());
    }
}
