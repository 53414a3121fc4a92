use reqwest::Client as HttpClient;

use super::ensure_success;
use crate::{
    error::AppResult,
    models::{ApiPlatform, ApiProgramDetail, Platform, ProgramId},
};

/// Program catalog, consumed for availability detail only
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProgramCatalog: Send + Sync {
    /// Fetch a program's detail, including its per-platform availability
    async fn fetch_program_detail(&self, program_id: ProgramId) -> AppResult<ApiProgramDetail>;

    /// Fetch the platforms the catalog knows about
    async fn fetch_platforms(&self) -> AppResult<Vec<Platform>>;
}

/// REST client for `/programs` and `/otts`
#[derive(Clone)]
pub struct HttpCatalogClient {
    http_client: HttpClient,
    api_url: String,
}

impl HttpCatalogClient {
    pub fn new(http_client: HttpClient, api_url: impl Into<String>) -> Self {
        Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl ProgramCatalog for HttpCatalogClient {
    async fn fetch_program_detail(&self, program_id: ProgramId) -> AppResult<ApiProgramDetail> {
        let url = format!("{}/programs/{}", self.api_url, program_id);
        let response = self.http_client.get(&url).send().await?;

        let detail: ApiProgramDetail = ensure_success(response, "catalog").await?.json().await?;

        tracing::debug!(
            program_id = program_id,
            platforms = detail.availability.len(),
            "Program detail fetched"
        );

        Ok(detail)
    }

    async fn fetch_platforms(&self) -> AppResult<Vec<Platform>> {
        let url = format!("{}/otts", self.api_url);
        let response = self.http_client.get(&url).send().await?;

        let platforms: Vec<ApiPlatform> = ensure_success(response, "catalog").await?.json().await?;
        Ok(platforms.into_iter().map(Platform::from).collect())
    }
}
