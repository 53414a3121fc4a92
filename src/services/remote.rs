use reqwest::Client as HttpClient;

use super::{ensure_success, AuthHandle};
use crate::{
    error::{AppError, AppResult},
    models::{ApiAddToWishlist, ApiWishlistItem, ProgramId, WishlistItem},
};

/// Server-backed wishlist store
///
/// Implementations are stateless wrappers; ordering and retries belong to
/// the sync engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait WishlistRemote: Send + Sync {
    /// Fetch the canonical list, in server order
    async fn list(&self) -> AppResult<Vec<WishlistItem>>;

    /// Add a program; `Conflict` means the server already has it
    async fn add(&self, program_id: ProgramId) -> AppResult<()>;

    /// Delete an entry by its server id; `NotFound` means it is already gone
    async fn remove(&self, wishlist_id: i64) -> AppResult<()>;
}

/// REST client for `/wishlists`
#[derive(Clone)]
pub struct HttpWishlistClient {
    http_client: HttpClient,
    api_url: String,
    auth: AuthHandle,
}

impl HttpWishlistClient {
    pub fn new(http_client: HttpClient, api_url: impl Into<String>, auth: AuthHandle) -> Self {
        Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            auth,
        }
    }

    fn bearer(&self) -> AppResult<String> {
        self.auth.token().ok_or(AppError::Unauthorized)
    }
}

#[async_trait::async_trait]
impl WishlistRemote for HttpWishlistClient {
    async fn list(&self) -> AppResult<Vec<WishlistItem>> {
        let url = format!("{}/wishlists", self.api_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.bearer()?)
            .send()
            .await?;

        let items: Vec<ApiWishlistItem> = ensure_success(response, "wishlist").await?.json().await?;

        tracing::debug!(items = items.len(), "Fetched remote wishlist");
        Ok(items.into_iter().map(WishlistItem::from).collect())
    }

    async fn add(&self, program_id: ProgramId) -> AppResult<()> {
        let url = format!("{}/wishlists", self.api_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.bearer()?)
            .json(&ApiAddToWishlist { program_id })
            .send()
            .await?;

        ensure_success(response, "wishlist").await?;
        Ok(())
    }

    async fn remove(&self, wishlist_id: i64) -> AppResult<()> {
        let url = format!("{}/wishlists/{}", self.api_url, wishlist_id);
        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(self.bearer()?)
            .send()
            .await?;

        ensure_success(response, "wishlist").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_anonymous_session_short_circuits() {
        // No server behind this URL: the call must fail before any I/O
        let client = HttpWishlistClient::new(
            HttpClient::new(),
            "http://127.0.0.1:9/",
            AuthHandle::anonymous(),
        );

        assert!(client.list().await.unwrap_err().is_unauthorized());
        assert!(client.add(42).await.unwrap_err().is_unauthorized());
        assert!(client.remove(900).await.unwrap_err().is_unauthorized());
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = HttpWishlistClient::new(
            HttpClient::new(),
            "http://api.local/",
            AuthHandle::authenticated("jwt"),
        );
        assert_eq!(client.api_url, "http://api.local");
        assert_eq!(client.bearer().unwrap(), "jwt");
    }
}
