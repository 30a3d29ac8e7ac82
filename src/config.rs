//! Application configuration loaded from environment variables.
//!
//! Secrets (LLM proxy key, Creem credentials) are injected as environment
//! variables by the deployment and read once at startup.

use crate::models::ledger::DEFAULT_FREE_TRIAL_ALLOTMENT;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

/// Which storage backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StorageBackend::Firestore),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::Invalid {
                name: "STORAGE_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    pub storage_backend: StorageBackend,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Free generations per device
    pub free_trial_count: u32,

    // --- Conversation starter generator ---
    pub llm_proxy_url: String,
    /// Empty disables the generator (fallback starters only)
    pub llm_proxy_key: String,
    pub llm_model: String,

    // --- Creem payments ---
    pub creem_api_url: String,
    /// Empty disables checkout
    pub creem_api_key: String,
    /// Empty skips webhook signature verification (local development only)
    pub creem_webhook_secret: String,
    /// Product SKU -> Creem product ID
    pub creem_product_ids: HashMap<String, String>,
}

impl Config {
    /// Deterministic config for tests. No external service is configured.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            storage_backend: StorageBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            free_trial_count: DEFAULT_FREE_TRIAL_ALLOTMENT,
            llm_proxy_url: "http://localhost:9".to_string(),
            llm_proxy_key: String::new(),
            llm_model: "gpt-4o-mini".to_string(),
            creem_api_url: "http://localhost:9".to_string(),
            creem_api_key: String::new(),
            creem_webhook_secret: String::new(),
            creem_product_ids: HashMap::new(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: parse_var("PORT", 8080)?,
            storage_backend: parse_var("STORAGE_BACKEND", StorageBackend::Firestore)?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            free_trial_count: parse_var("FREE_TRIAL_COUNT", DEFAULT_FREE_TRIAL_ALLOTMENT)?,

            llm_proxy_url: env::var("LLM_PROXY_URL")
                .unwrap_or_else(|_| "https://llm-proxy.densematrix.ai".to_string()),
            llm_proxy_key: secret_var("LLM_PROXY_KEY"),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),

            creem_api_url: env::var("CREEM_API_URL")
                .unwrap_or_else(|_| "https://api.creem.io".to_string()),
            creem_api_key: secret_var("CREEM_API_KEY"),
            creem_webhook_secret: secret_var("CREEM_WEBHOOK_SECRET"),
            creem_product_ids: parse_product_ids(
                &env::var("CREEM_PRODUCT_IDS").unwrap_or_else(|_| "{}".to_string()),
            )?,
        })
    }
}

/// Read an optional secret, trimming stray whitespace from secret bindings.
fn secret_var(name: &str) -> String {
    env::var(name)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Parse the `{"sku": "creem_product_id"}` JSON map.
pub fn parse_product_ids(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    serde_json::from_str(raw).map_err(|_| ConfigError::Invalid {
        name: "CREEM_PRODUCT_IDS",
        value: raw.to_string(),
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("PORT", "9090");
        env::set_var("FREE_TRIAL_COUNT", "5");
        env::set_var("STORAGE_BACKEND", "memory");
        env::set_var("CREEM_PRODUCT_IDS", r#"{"starter": "prod_abc"}"#);

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.port, 9090);
        assert_eq!(config.free_trial_count, 5);
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(
            config.creem_product_ids.get("starter").map(String::as_str),
            Some("prod_abc")
        );
    }

    #[test]
    fn test_parse_product_ids_rejects_garbage() {
        assert!(parse_product_ids("not json").is_err());
        assert!(parse_product_ids("{}").unwrap().is_empty());
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!(
            "Firestore".parse::<StorageBackend>().unwrap(),
            StorageBackend::Firestore
        );
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }
}
