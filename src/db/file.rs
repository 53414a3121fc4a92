use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use super::{LocalStore, StoreKey};
use crate::{
    error::{AppError, AppResult},
    models::WishlistItem,
};

const APP_DIR: &str = "ott-wishlist";

/// Stores the wishlist as a JSON file on disk
pub struct FileLocalStore {
    path: PathBuf,
}

impl FileLocalStore {
    pub fn new(dir: impl AsRef<Path>, namespace: &str) -> Self {
        let key = StoreKey::GuestWishlist(namespace.to_string());
        Self {
            path: dir.as_ref().join(key.file_name()),
        }
    }

    /// Creates a store under the platform data directory
    /// (e.g., `~/.local/share/ott-wishlist`)
    pub fn in_data_dir(namespace: &str) -> AppResult<Self> {
        let base = dirs::data_dir()
            .ok_or_else(|| AppError::Internal("could not resolve data dir".to_string()))?;
        Ok(Self::new(base.join(APP_DIR), namespace))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Moves an unreadable file out of the way so the next save starts clean
    async fn quarantine(&self, error: &serde_json::Error) {
        let target = self.path.with_extension("json.corrupt");
        tracing::warn!(
            path = %self.path.display(),
            error = %error,
            "Local wishlist is unreadable, moving it aside"
        );
        if let Err(e) = fs::rename(&self.path, &target).await {
            tracing::error!(error = %e, "Failed to move corrupt wishlist file");
        }
    }
}

#[async_trait::async_trait]
impl LocalStore for FileLocalStore {
    async fn load(&self) -> AppResult<Vec<WishlistItem>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(items) => Ok(items),
            Err(e) => {
                self.quarantine(&e).await;
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, items: &[WishlistItem]) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec(items)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), items = items.len(), "Saved local wishlist");
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
