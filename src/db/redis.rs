use redis::AsyncCommands;
use redis::Client;

use super::{LocalStore, StoreKey};
use crate::error::AppError;
use crate::error::AppResult;
use crate::models::WishlistItem;

/// Creates a Redis client for the local wishlist slot
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Keeps the wishlist slot in a Redis key without expiry
#[derive(Clone)]
pub struct RedisLocalStore {
    redis_client: Client,
    key: StoreKey,
}

impl RedisLocalStore {
    pub fn new(redis_client: Client, namespace: &str) -> Self {
        Self {
            redis_client,
            key: StoreKey::GuestWishlist(namespace.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl LocalStore for RedisLocalStore {
    async fn load(&self) -> AppResult<Vec<WishlistItem>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let stored: Option<String> = conn.get(format!("{}", self.key)).await.map_err(|e| {
            tracing::warn!(error = %e, "Redis get failed");
            e
        })?;

        match stored {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                AppError::Internal(format!("Local wishlist deserialization error: {}", e))
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, items: &[WishlistItem]) -> AppResult<()> {
        let json = serde_json::to_string(items)?;
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let _: () = conn
            .set(format!("{}", self.key), json)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Redis set failed");
                e
            })?;

        tracing::debug!(key = %self.key, items = items.len(), "Saved local wishlist");
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(format!("{}", self.key)).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
