//! Configuration file support for repolens.
//!
//! Loads settings from `~/.repolens/config.toml` with the following precedence:
//! CLI arguments > Environment variables > Synced credential store > Config file
//!
//! ## Configuration File Format
//!
//! ```toml
//! # ~/.repolens/config.toml
//!
//! [github]
//! token = "ghp_..."
//! api_base = "https://api.github.com"
//!
//! [llm]
//! api_key = "sk-..."
//! base_url = "https://api.openai.com/v1/"
//! model = "gpt-4o-mini"
//! timeout_ms = 120000
//!
//! [embeddings]
//! api_key = "sk-..."
//! model = "text-embedding-3-small"
//! timeout_ms = 45000
//!
//! [cache]
//! ttl_ms = 86400000
//!
//! [remote]
//! max_retries = 3
//! ```

use crate::env::{cache_ttl, config_file, env_max_retries, env_non_empty, env_u64};
use crate::store::{KeyValueStore, StoreScope};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Sync-scope key holding the GitHub token.
pub const CREDENTIAL_GITHUB_TOKEN: &str = "githubToken";
/// Sync-scope key holding the LLM API key.
pub const CREDENTIAL_LLM_KEY: &str = "llmApiKey";
/// Sync-scope key holding the embeddings API key.
pub const CREDENTIAL_EMBEDDINGS_KEY: &str = "embeddingsApiKey";

const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1/";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EMBEDDINGS_MODEL: &str = "text-embedding-3-small";
const DEFAULT_LLM_TIMEOUT_MS: u64 = 120_000;
const DEFAULT_SEMANTIC_TIMEOUT_MS: u64 = 45_000;

/// Top-level configuration file structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubSection,
    #[serde(default)]
    pub llm: ApiSection,
    #[serde(default)]
    pub embeddings: ApiSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub remote: RemoteSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct GitHubSection {
    pub token: Option<String>,
    pub api_base: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CacheSection {
    pub ttl_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoteSection {
    pub max_retries: Option<u32>,
}

/// Loads the configuration file if it exists.
///
/// Returns `Ok(None)` if the file doesn't exist.
/// Returns `Err` if the file exists but fails to parse.
pub fn load_config() -> Result<Option<Config>> {
    let Some(path) = config_file() else {
        return Ok(None);
    };
    load_config_from(&path)
}

/// Loads a configuration file from an explicit path.
pub fn load_config_from(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;

    tracing::debug!(
        target: "repolens::config",
        path = %path.display(),
        "Loaded configuration file"
    );

    Ok(Some(config))
}

/// Endpoint settings for an HTTP API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// Embedding endpoint plus the wall-clock budget for the semantic ranking pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingsSettings {
    pub api: ApiSettings,
    pub ranking_timeout: Duration,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub github_token: Option<String>,
    pub github_api_base: String,
    pub llm: ApiSettings,
    pub embeddings: EmbeddingsSettings,
    pub cache_ttl: Duration,
    pub max_retries: u32,
}

fn pick(env_key: &str, stored: Option<String>, file: Option<&String>) -> Option<String> {
    env_non_empty(env_key)
        .or(stored)
        .or_else(|| file.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

fn stored_credential(store: Option<&dyn KeyValueStore>, key: &str) -> Option<String> {
    let store = store?;
    match store.get_string(StoreScope::Sync, key) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(
                target: "repolens::config",
                key,
                error = %e,
                "could not read stored credential"
            );
            None
        }
    }
}

impl Settings {
    /// Resolve settings from the environment, the sync-scope store and the config file.
    pub fn resolve(config: Option<&Config>, store: Option<&dyn KeyValueStore>) -> Self {
        let empty = Config::default();
        let config = config.unwrap_or(&empty);

        let github_token = pick(
            "GITHUB_TOKEN",
            stored_credential(store, CREDENTIAL_GITHUB_TOKEN),
            config.github.token.as_ref(),
        );
        let github_api_base = env_non_empty("GITHUB_API_BASE_URL")
            .or_else(|| config.github.api_base.clone())
            .unwrap_or_else(|| DEFAULT_GITHUB_API_BASE.to_string());

        let llm = ApiSettings {
            api_key: pick(
                "REPOLENS_LLM_API_KEY",
                stored_credential(store, CREDENTIAL_LLM_KEY),
                config.llm.api_key.as_ref(),
            ),
            base_url: env_non_empty("REPOLENS_LLM_BASE_URL")
                .or_else(|| config.llm.base_url.clone())
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string()),
            model: env_non_empty("REPOLENS_LLM_MODEL")
                .or_else(|| config.llm.model.clone())
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            timeout: Duration::from_millis(
                env_u64("REPOLENS_LLM_TIMEOUT_MS")
                    .or(config.llm.timeout_ms)
                    .unwrap_or(DEFAULT_LLM_TIMEOUT_MS),
            ),
        };

        let embeddings_api = ApiSettings {
            api_key: pick(
                "REPOLENS_EMBEDDINGS_API_KEY",
                stored_credential(store, CREDENTIAL_EMBEDDINGS_KEY),
                config.embeddings.api_key.as_ref(),
            ),
            base_url: env_non_empty("REPOLENS_EMBEDDINGS_BASE_URL")
                .or_else(|| config.embeddings.base_url.clone())
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string()),
            model: env_non_empty("REPOLENS_EMBEDDINGS_MODEL")
                .or_else(|| config.embeddings.model.clone())
                .unwrap_or_else(|| DEFAULT_EMBEDDINGS_MODEL.to_string()),
            timeout: Duration::from_millis(DEFAULT_LLM_TIMEOUT_MS),
        };
        let ranking_timeout = Duration::from_millis(
            env_u64("REPOLENS_SEMANTIC_TIMEOUT_MS")
                .or(config.embeddings.timeout_ms)
                .unwrap_or(DEFAULT_SEMANTIC_TIMEOUT_MS),
        );

        Self {
            github_token,
            github_api_base,
            llm,
            embeddings: EmbeddingsSettings {
                api: embeddings_api,
                ranking_timeout,
            },
            cache_ttl: cache_ttl(config.cache.ttl_ms),
            max_retries: env_max_retries(config.remote.max_retries),
        }
    }

    /// Load the config file (if any) and resolve against the given store.
    pub fn load(store: Option<&dyn KeyValueStore>) -> Result<Self> {
        let config = load_config()?;
        Ok(Self::resolve(config.as_ref(), store))
    }
}
