//! CLI command handlers for the repolens application.

mod analyze;
mod cache;
mod credentials;

pub(crate) use analyze::{handle_analyze_command, AnalyzeArgs};
pub(crate) use cache::{handle_cache_clear_command, handle_cache_show_command};
pub(crate) use credentials::{handle_credentials_set_command, handle_credentials_show_command};

use anyhow::{Context, Result};
use repolens_github::RepositoryIdentity;
use repolens_state::{JsonFileStore, KeyValueStore, Settings};
use std::sync::Arc;

/// Open the default on-disk store and resolve settings against it.
pub(crate) fn open_store_and_settings() -> Result<(Arc<JsonFileStore>, Settings)> {
    let store = Arc::new(JsonFileStore::open_default()?);
    let kv: &dyn KeyValueStore = &*store;
    let settings = Settings::load(Some(kv))?;
    Ok((store, settings))
}

pub(crate) fn parse_repo(input: &str) -> Result<RepositoryIdentity> {
    RepositoryIdentity::parse(input).with_context(|| format!("invalid repository '{input}'"))
}
