//! Durable device-local storage for the anonymous wishlist
//!
//! The whole list lives in a single namespaced slot that is read in full and
//! written in full. Backends differ only in where that slot is kept.

use std::fmt::Display;

use crate::{error::AppResult, models::WishlistItem};

pub mod file;
pub mod memory;
pub mod redis;

pub use file::FileLocalStore;
pub use memory::MemoryLocalStore;
pub use self::redis::{create_redis_client, RedisLocalStore};

/// Slot names used by the local stores
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    GuestWishlist(String),
}

impl StoreKey {
    /// File name used by the file backend
    pub fn file_name(&self) -> String {
        match self {
            StoreKey::GuestWishlist(namespace) => format!("{}.json", namespace),
        }
    }
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKey::GuestWishlist(namespace) => write!(f, "wishlist:{}", namespace),
        }
    }
}

/// Trait for device-local wishlist persistence
///
/// Implementations never merge: `save` replaces the slot, `load` returns
/// exactly what the last `save` wrote (or an empty list).
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LocalStore: Send + Sync {
    /// Read the full list; a missing slot is an empty list
    async fn load(&self) -> AppResult<Vec<WishlistItem>>;

    /// Replace the slot with `items`
    async fn save(&self, items: &[WishlistItem]) -> AppResult<()>;

    /// Remove the slot entirely
    async fn clear(&self) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
