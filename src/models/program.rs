use serde::{Deserialize, Serialize};

use super::ProgramId;

/// Identifier of an OTT platform in the catalog
pub type PlatformId = i64;

/// An OTT platform known to the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub id: PlatformId,
    pub name: String,
}

// ============================================================================
// Catalog API Types
// ============================================================================

/// API response from GET /programs/{programId}
///
/// Only `availability` matters for enrichment; the rest of the payload is
/// display data owned by the catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProgramDetail {
    pub program_id: ProgramId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub availability: Vec<ApiAvailability>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAvailability {
    pub ott_id: PlatformId,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub expire_date: Option<String>,
}

/// Entry returned by GET /otts
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPlatform {
    pub ott_id: PlatformId,
    pub name: String,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl From<ApiPlatform> for Platform {
    fn from(api: ApiPlatform) -> Self {
        Platform {
            id: api.ott_id,
            name: api.name,
        }
    }
}
