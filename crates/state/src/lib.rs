//! Manages repolens configuration and persisted state.
//!
//! This crate provides utilities for:
//! - Reading environment variables and the optional `config.toml`.
//! - Resolving credentials and endpoints into a single [`Settings`] value.
//! - A scoped key-value store ([`KeyValueStore`]) with a small "sync" scope
//!   for credentials and a bulk "local" scope for cached analyses.

pub mod config;
pub mod env;
pub mod store;

pub use config::{
    load_config, load_config_from, ApiSettings, Config, EmbeddingsSettings, Settings,
    CREDENTIAL_EMBEDDINGS_KEY, CREDENTIAL_GITHUB_TOKEN, CREDENTIAL_LLM_KEY,
};
pub use env::{
    cache_ttl, config_file, data_dir, env_max_retries, env_non_empty, env_u64, home_dir,
    DEFAULT_CACHE_TTL_MS,
};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StoreScope};
