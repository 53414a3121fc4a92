use std::collections::{HashMap, HashSet};
use std::time::Duration;

use super::ProgramCatalog;
use crate::models::{ApiAvailability, Platform, PlatformId};

const UNKNOWN_PLATFORM: &str = "Other";

const DEFAULT_PLATFORMS: [(PlatformId, &str); 10] = [
    (1, "Netflix"),
    (2, "TVING"),
    (3, "Coupang Play"),
    (4, "Wavve"),
    (5, "Disney+"),
    (6, "Watcha"),
    (7, "Laftel"),
    (8, "U+ Mobile TV"),
    (9, "Prime Video"),
    (10, "Cinefox"),
];

/// Maps catalog platform ids to display names
#[derive(Debug, Clone)]
pub struct PlatformDirectory {
    names: HashMap<PlatformId, String>,
}

impl Default for PlatformDirectory {
    fn default() -> Self {
        Self {
            names: DEFAULT_PLATFORMS
                .iter()
                .map(|(id, name)| (*id, name.to_string()))
                .collect(),
        }
    }
}

impl PlatformDirectory {
    /// Built-in names overlaid with whatever the catalog reports.
    /// Falls back to the built-ins if the catalog is unavailable.
    pub async fn load(catalog: &dyn ProgramCatalog, timeout: Duration) -> Self {
        let mut directory = Self::default();

        match tokio::time::timeout(timeout, catalog.fetch_platforms()).await {
            Ok(Ok(platforms)) => {
                tracing::info!(platforms = platforms.len(), "Loaded platform directory");
                directory.overlay(platforms);
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Platform list unavailable, using built-in names");
            }
            Err(_) => {
                tracing::warn!(?timeout, "Platform list timed out, using built-in names");
            }
        }

        directory
    }

    pub fn overlay(&mut self, platforms: impl IntoIterator<Item = Platform>) {
        for platform in platforms {
            self.names.insert(platform.id, platform.name);
        }
    }

    pub fn name_for(&self, id: PlatformId) -> &str {
        self.names
            .get(&id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_PLATFORM)
    }

    /// Display names for an availability list, deduplicated by platform id
    /// and then by name, in first-seen order
    pub fn platform_names(&self, availability: &[ApiAvailability]) -> Vec<String> {
        let mut seen_ids = HashSet::new();
        let mut seen_names = HashSet::new();

        availability
            .iter()
            .filter(|avail| seen_ids.insert(avail.ott_id))
            .map(|avail| self.name_for(avail.ott_id))
            .filter(|name| seen_names.insert(*name))
            .map(str::to_string)
            .collect()
    }
}
