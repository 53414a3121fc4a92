use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

/// Catalog identifier of a program
pub type ProgramId = i64;

/// Identifier of a wishlist entry, either assigned by the server or
/// synthesized on the device while the write has no server counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum WishlistId {
    /// Stable id assigned by the wishlist server
    Server(i64),
    /// Timestamp-derived id used only on this device
    Local(i64),
}

impl WishlistId {
    pub fn is_local(&self) -> bool {
        matches!(self, WishlistId::Local(_))
    }
}

impl Display for WishlistId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WishlistId::Server(id) => write!(f, "{}", id),
            WishlistId::Local(id) => write!(f, "local:{}", id),
        }
    }
}

impl FromStr for WishlistId {
    type Err = AppError;

    /// Parses the `Display` form: `900` or `local:1718000000000`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |raw: &str| {
            raw.parse::<i64>()
                .map_err(|_| AppError::InvalidInput(format!("Invalid wishlist id: {}", s)))
        };

        match s.strip_prefix("local:") {
            Some(raw) => parse(raw).map(WishlistId::Local),
            None => parse(s).map(WishlistId::Server),
        }
    }
}

/// One program the user wants to track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub id: WishlistId,
    pub program_id: ProgramId,
    pub title: String,
    #[serde(default)]
    pub thumbnail_url: String,
    /// Display names of the platforms carrying the program; `None` until enriched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_names: Option<Vec<String>>,
}

impl WishlistItem {
    pub fn needs_enrichment(&self) -> bool {
        self.platform_names.is_none()
    }
}

/// Display metadata supplied by the caller when adding a program
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWishlistItem {
    pub program_id: ProgramId,
    pub title: String,
    #[serde(default)]
    pub thumbnail_url: String,
}

impl NewWishlistItem {
    pub fn new(program_id: ProgramId, title: impl Into<String>) -> Self {
        Self {
            program_id,
            title: title.into(),
            thumbnail_url: String::new(),
        }
    }

    pub fn with_thumbnail(mut self, thumbnail_url: impl Into<String>) -> Self {
        self.thumbnail_url = thumbnail_url.into();
        self
    }

    /// Materializes the item under the given id
    pub fn into_item(self, id: WishlistId) -> WishlistItem {
        WishlistItem {
            id,
            program_id: self.program_id,
            title: self.title,
            thumbnail_url: self.thumbnail_url,
            platform_names: None,
        }
    }
}

// ============================================================================
// Wishlist API Types
// ============================================================================

/// Entry returned by GET /wishlists
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiWishlistItem {
    pub wishlist_id: i64,
    pub program_id: ProgramId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl From<ApiWishlistItem> for WishlistItem {
    fn from(api: ApiWishlistItem) -> Self {
        WishlistItem {
            id: WishlistId::Server(api.wishlist_id),
            program_id: api.program_id,
            title: api.title,
            thumbnail_url: api.thumbnail_url.unwrap_or_default(),
            platform_names: None,
        }
    }
}

/// Body of POST /wishlists
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAddToWishlist {
    pub program_id: ProgramId,
}
