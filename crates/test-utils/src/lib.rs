//! Shared test utilities for repolens crates.
//!
//! This crate provides common test fixtures and utilities used across
//! multiple crates in the repolens workspace.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::sync::{LazyLock, Mutex, MutexGuard};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serialize tests that mutate process-global state (env vars, cwd, etc).
///
/// Acquire this guard at the start of any test that modifies environment
/// variables to prevent race conditions between parallel tests.
pub fn env_guard() -> MutexGuard<'static, ()> {
    static TEST_SERIAL: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    TEST_SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

/// RAII guard for environment variables - restores original value on drop.
pub struct EnvVarGuard {
    key: &'static str,
    previous: Option<String>,
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        if let Some(v) = &self.previous {
            std::env::set_var(self.key, v);
        } else {
            std::env::remove_var(self.key);
        }
    }
}

/// Set an environment variable and return a guard that restores the original on drop.
///
/// # Example
/// ```
/// let _guard = repolens_test_utils::set_env_var("MY_VAR", Some("value"));
/// // MY_VAR is set to "value"
/// // When _guard drops, MY_VAR is restored to its original value
/// ```
pub fn set_env_var(key: &'static str, value: Option<&str>) -> EnvVarGuard {
    let previous = std::env::var(key).ok();
    if let Some(val) = value {
        std::env::set_var(key, val);
    } else {
        std::env::remove_var(key);
    }
    EnvVarGuard { key, previous }
}

/// Encode file text the way the GitHub contents API does: base64 wrapped at 60 columns.
pub fn encode_content(text: &str) -> String {
    let encoded = STANDARD.encode(text.as_bytes());
    encoded
        .as_bytes()
        .chunks(60)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Minimal `GET /repos/{owner}/{name}` payload.
pub fn repo_json(owner: &str, name: &str, pushed_at: &str) -> Value {
    json!({
        "full_name": format!("{owner}/{name}"),
        "html_url": format!("https://github.com/{owner}/{name}"),
        "description": "Fixture repository",
        "stargazers_count": 42,
        "forks_count": 7,
        "watchers_count": 42,
        "open_issues_count": 3,
        "language": "Python",
        "created_at": "2023-01-01T00:00:00Z",
        "updated_at": pushed_at,
        "pushed_at": pushed_at,
        "license": { "name": "MIT License", "spdx_id": "MIT" },
        "topics": ["ml", "pipelines"],
        "default_branch": "main",
        "archived": false
    })
}

/// A wiremock server pre-wired with GitHub REST endpoints for one repository.
///
/// Endpoints that are never mounted answer 404, which exercises the
/// degrade-to-empty paths of the gateway.
pub struct GitHubFixture {
    pub server: MockServer,
    pub owner: String,
    pub name: String,
}

impl GitHubFixture {
    /// Start a mock server for `owner/name`.
    pub async fn start(owner: &str, name: &str) -> Self {
        Self {
            server: MockServer::start().await,
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    /// Base URL to hand to the gateway in place of `https://api.github.com`.
    pub fn api_base(&self) -> String {
        self.server.uri()
    }

    /// `/repos/{owner}/{name}{suffix}`
    pub fn repo_path(&self, suffix: &str) -> String {
        format!("/repos/{}/{}{}", self.owner, self.name, suffix)
    }

    /// Mount the repo-info endpoint with a standard payload.
    pub async fn mount_repo(&self, pushed_at: &str) {
        self.mount_repo_json(repo_json(&self.owner, &self.name, pushed_at))
            .await;
    }

    pub async fn mount_repo_json(&self, body: Value) {
        self.mount_json("", body).await;
    }

    /// Mount a JSON response under the repository path.
    pub async fn mount_json(&self, suffix: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(self.repo_path(suffix)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Mount a directory listing. `entries` are `(name, "file" | "dir")` pairs.
    pub async fn mount_contents(&self, dir: &str, entries: &[(&str, &str)]) {
        let listing: Vec<Value> = entries
            .iter()
            .map(|(name, kind)| {
                let full = if dir.is_empty() {
                    (*name).to_string()
                } else {
                    format!("{dir}/{name}")
                };
                json!({ "name": name, "path": full, "type": kind, "size": 0 })
            })
            .collect();
        let suffix = if dir.is_empty() {
            "/contents".to_string()
        } else {
            format!("/contents/{dir}")
        };
        self.mount_json(&suffix, Value::Array(listing)).await;
    }

    /// Mount a single file's contents response.
    pub async fn mount_file(&self, file_path: &str, text: &str) {
        let name = file_path.rsplit('/').next().unwrap_or(file_path);
        self.mount_json(
            &format!("/contents/{file_path}"),
            json!({
                "type": "file",
                "name": name,
                "path": file_path,
                "encoding": "base64",
                "content": encode_content(text)
            }),
        )
        .await;
    }

    pub async fn mount_readme(&self, text: &str) {
        self.mount_json(
            "/readme",
            json!({ "name": "README.md", "encoding": "base64", "content": encode_content(text) }),
        )
        .await;
    }

    /// Mount empty languages/commits/issues/contributors responses.
    pub async fn mount_empty_activity(&self) {
        self.mount_json("/languages", json!({})).await;
        self.mount_json("/commits", json!([])).await;
        self.mount_json("/issues", json!([])).await;
        self.mount_json("/contributors", json!([])).await;
    }

    /// Respond to `suffix` with an arbitrary status and JSON body.
    pub async fn mount_status(&self, suffix: &str, status: u16, body: Value) {
        Mock::given(method("GET"))
            .and(path(self.repo_path(suffix)))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }
}
