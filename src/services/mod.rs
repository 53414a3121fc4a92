use reqwest::{Response, StatusCode};

use crate::error::{AppError, AppResult};

pub mod auth;
pub mod catalog;
pub mod platforms;
pub mod remote;

pub use auth::{AuthHandle, Session};
pub use catalog::{HttpCatalogClient, ProgramCatalog};
pub use platforms::PlatformDirectory;
pub use remote::{HttpWishlistClient, WishlistRemote};

/// Maps a non-success response onto the error taxonomy
///
/// 401 becomes `Unauthorized` so callers can degrade, 404 and 409 keep
/// their meaning for idempotent deletes and duplicate adds, anything else
/// is an upstream failure.
pub(crate) async fn ensure_success(response: Response, api: &str) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();

    match status {
        StatusCode::UNAUTHORIZED => Err(AppError::Unauthorized),
        StatusCode::NOT_FOUND => Err(AppError::NotFound(url)),
        StatusCode::CONFLICT => Err(AppError::Conflict(body)),
        _ => {
            tracing::error!(
                api = api,
                url = %url,
                status = %status,
                body = %body,
                "External API request failed"
            );
            Err(AppError::ExternalApi(format!(
                "API returned status {}: {}",
                status, body
            )))
        }
    }
}
