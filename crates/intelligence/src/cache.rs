//! Time- and freshness-bounded analysis cache over a [`KeyValueStore`].

use crate::types::RepositoryAnalysis;
use anyhow::Result;
use chrono::{DateTime, Utc};
use repolens_github::RepositoryIdentity;
use repolens_state::{KeyValueStore, StoreScope, DEFAULT_CACHE_TTL_MS};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A stored analysis with the state it was computed against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub analysis: RepositoryAnalysis,
    /// Epoch milliseconds at write time.
    pub timestamp: i64,
    pub repo_pushed_at: Option<String>,
}

impl CacheEntry {
    pub fn age(&self, now_ms: i64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.timestamp).max(0) as u64)
    }

    /// Age relative to the current wall clock.
    pub fn elapsed(&self) -> Duration {
        self.age(now_ms())
    }

    /// True when `hint` is strictly later than the stored pushed-at.
    ///
    /// An entry without a stored pushed-at is stale against any hint.
    pub fn is_outdated_by(&self, hint: &str) -> bool {
        match self.repo_pushed_at.as_deref() {
            Some(stored) => is_later(hint, stored),
            None => true,
        }
    }
}

/// RFC 3339 comparison, falling back to string order for other formats.
fn is_later(candidate: &str, reference: &str) -> bool {
    match (
        DateTime::parse_from_rfc3339(candidate),
        DateTime::parse_from_rfc3339(reference),
    ) {
        (Ok(c), Ok(r)) => c > r,
        _ => candidate > reference,
    }
}

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Persisted analyses keyed by `owner_name` in the local scope.
#[derive(Clone)]
pub struct AnalysisCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl AnalysisCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            ttl: Duration::from_millis(DEFAULT_CACHE_TTL_MS),
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The raw entry, regardless of age. Unreadable entries count as absent.
    pub fn entry(&self, repo: &RepositoryIdentity) -> Option<CacheEntry> {
        let key = repo.cache_key();
        let value = match self.store.get(StoreScope::Local, &key) {
            Ok(value) => value?,
            Err(e) => {
                tracing::warn!(target: "repolens::cache", %key, error = %e, "cache read failed");
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(target: "repolens::cache", %key, error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    /// A usable cached analysis, or `None` when absent, expired, or outdated by `freshness_hint`.
    pub fn get(
        &self,
        repo: &RepositoryIdentity,
        freshness_hint: Option<&str>,
    ) -> Option<RepositoryAnalysis> {
        let entry = self.entry(repo)?;
        let age = entry.age(now_ms());
        if age > self.ttl {
            tracing::debug!(
                target: "repolens::cache",
                owner = %repo.owner,
                repo = %repo.name,
                age_ms = age.as_millis() as u64,
                "cache entry expired"
            );
            return None;
        }
        if let Some(hint) = freshness_hint {
            if entry.is_outdated_by(hint) {
                tracing::debug!(
                    target: "repolens::cache",
                    owner = %repo.owner,
                    repo = %repo.name,
                    pushed_at = hint,
                    cached_pushed_at = ?entry.repo_pushed_at,
                    "repository changed since cached analysis"
                );
                return None;
            }
        }
        Some(entry.analysis)
    }

    /// Overwrite the entry for `repo`. Failures are logged, not returned.
    pub fn put(&self, repo: &RepositoryIdentity, analysis: &RepositoryAnalysis, pushed_at: Option<&str>) {
        let entry = CacheEntry {
            analysis: analysis.clone(),
            timestamp: now_ms(),
            repo_pushed_at: pushed_at.map(str::to_string),
        };
        if let Err(e) = self.write(repo, &entry) {
            tracing::warn!(
                target: "repolens::cache",
                owner = %repo.owner,
                repo = %repo.name,
                error = %e,
                "cache write failed"
            );
        }
    }

    fn write(&self, repo: &RepositoryIdentity, entry: &CacheEntry) -> Result<()> {
        let value = serde_json::to_value(entry)?;
        self.store.set(StoreScope::Local, &repo.cache_key(), value)
    }

    /// Drop the entry for `repo`, returning whether one existed.
    pub fn remove(&self, repo: &RepositoryIdentity) -> Result<bool> {
        self.store.remove(StoreScope::Local, &repo.cache_key())
    }
}
