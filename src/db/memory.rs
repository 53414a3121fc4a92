use tokio::sync::Mutex;

use super::LocalStore;
use crate::{error::AppResult, models::WishlistItem};

/// In-process store; contents are lost when the process exits
#[derive(Default)]
pub struct MemoryLocalStore {
    items: Mutex<Vec<WishlistItem>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<WishlistItem>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }
}

#[async_trait::async_trait]
impl LocalStore for MemoryLocalStore {
    async fn load(&self) -> AppResult<Vec<WishlistItem>> {
        Ok(self.items.lock().await.clone())
    }

    async fn save(&self, items: &[WishlistItem]) -> AppResult<()> {
        *self.items.lock().await = items.to_vec();
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        self.items.lock().await.clear();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
