use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Where the anonymous wishlist is persisted
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Redis,
    Memory,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the wishlist/catalog REST API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Backend for the device-local wishlist cache
    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackend,

    /// Directory for the file backend; defaults to the platform data dir
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,

    /// Redis connection URL, used by the redis backend
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Name of the single slot holding the anonymous wishlist
    #[serde(default = "default_storage_namespace")]
    pub storage_namespace: String,

    /// Upper bound for every remote call, in milliseconds
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,

    /// Bearer token for a session that is already authenticated at startup
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_api_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::File
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_storage_namespace() -> String {
    "guestWishlist".to_string()
}

fn default_remote_timeout_ms() -> u64 {
    10_000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    /// Address the HTTP facade binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_env() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();

        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.storage_backend, StorageBackend::File);
        assert_eq!(config.storage_namespace, "guestWishlist");
        assert_eq!(config.remote_timeout(), Duration::from_secs(10));
        assert!(config.auth_token.is_none());
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_overrides() {
        let vars = vec![
            ("STORAGE_BACKEND".to_string(), "redis".to_string()),
            ("REMOTE_TIMEOUT_MS".to_string(), "250".to_string()),
            ("AUTH_TOKEN".to_string(), "secret".to_string()),
            ("PORT".to_string(), "8081".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.storage_backend, StorageBackend::Redis);
        assert_eq!(config.remote_timeout(), Duration::from_millis(250));
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.port, 8081);
    }
}
