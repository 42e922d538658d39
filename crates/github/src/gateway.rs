//! GitHub REST gateway.
//!
//! `repo_info` propagates errors so callers can tell a missing repository from
//! an exhausted rate limit. Every other accessor degrades to an empty default
//! on failure; an empty result means "unknown", not "confirmed empty".

use crate::types::{
    CommitSummary, ContentEntry, Contributor, EntryKind, IssueState, IssueSummary, RepoMetadata,
    RepositoryIdentity,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use repolens_remote::{RemoteClient, RemoteError};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Service label used in error messages.
pub const GITHUB_SERVICE: &str = "GitHub";

/// Default public API root.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default page size for commits, issues and contributors.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Read access to a hosted repository.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Repository metadata. The only accessor that propagates failure.
    async fn repo_info(&self, repo: &RepositoryIdentity) -> Result<RepoMetadata, RemoteError>;

    /// Language name to byte count.
    async fn languages(&self, repo: &RepositoryIdentity) -> BTreeMap<String, u64>;

    /// Decoded README text.
    async fn readme(&self, repo: &RepositoryIdentity) -> Option<String>;

    async fn commits(&self, repo: &RepositoryIdentity, per_page: u32) -> Vec<CommitSummary>;

    async fn issues(
        &self,
        repo: &RepositoryIdentity,
        state: IssueState,
        per_page: u32,
    ) -> Vec<IssueSummary>;

    async fn contributors(&self, repo: &RepositoryIdentity, per_page: u32) -> Vec<Contributor>;

    /// Listing of one directory; `""` is the repository root.
    async fn contents(&self, repo: &RepositoryIdentity, path: &str) -> Vec<ContentEntry>;

    /// Decoded text of a single file. `None` for missing or binary files.
    async fn file_content(&self, repo: &RepositoryIdentity, path: &str) -> Option<String>;
}

/// [`RepositorySource`] backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubGateway {
    client: RemoteClient,
    api_base: Url,
    token: Option<String>,
}

impl GitHubGateway {
    /// Create a gateway. Blank tokens are treated as absent.
    pub fn new(client: RemoteClient, api_base: &str, token: Option<String>) -> Result<Self> {
        let api_base = Url::parse(api_base.trim())
            .with_context(|| format!("invalid GitHub API base URL '{api_base}'"))?;
        if api_base.cannot_be_a_base() {
            anyhow::bail!("GitHub API base URL '{api_base}' cannot carry a path");
        }
        let token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Ok(Self {
            client,
            api_base,
            token,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// `{base}/repos/{owner}/{name}/{tail...}` with each segment percent-encoded.
    fn endpoint(&self, repo: &RepositoryIdentity, tail: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["repos", repo.owner.as_str(), repo.name.as_str()])
                .extend(tail.iter().flat_map(|t| t.split('/')).filter(|s| !s.is_empty()));
        }
        url
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        repo: &RepositoryIdentity,
        tail: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        let url = self.endpoint(repo, tail);
        let resource = url.path().to_string();
        let value: Value = self
            .client
            .send_json(GITHUB_SERVICE, &resource, self.is_authenticated(), |http| {
                let builder = http.get(url.clone()).header(ACCEPT, GITHUB_ACCEPT).query(query);
                match &self.token {
                    Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
                    None => builder,
                }
            })
            .await?;
        serde_json::from_value(value).map_err(|e| RemoteError::Decode {
            service: GITHUB_SERVICE.to_string(),
            message: format!("{resource}: {e}"),
        })
    }

    /// Fetch, logging and defaulting on any failure.
    async fn fetch_or_default<T: DeserializeOwned + Default>(
        &self,
        repo: &RepositoryIdentity,
        tail: &[&str],
        query: &[(&str, String)],
    ) -> T {
        match self.fetch(repo, tail, query).await {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(
                    target: "repolens::github",
                    owner = %repo.owner,
                    repo = %repo.name,
                    endpoint = %tail.join("/"),
                    error = %e,
                    "request failed, using empty default"
                );
                T::default()
            }
        }
    }
}

#[async_trait]
impl RepositorySource for GitHubGateway {
    async fn repo_info(&self, repo: &RepositoryIdentity) -> Result<RepoMetadata, RemoteError> {
        let raw: RawRepo = self.fetch(repo, &[], &[]).await?;
        Ok(raw.into_metadata(repo))
    }

    async fn languages(&self, repo: &RepositoryIdentity) -> BTreeMap<String, u64> {
        self.fetch_or_default(repo, &["languages"], &[]).await
    }

    async fn readme(&self, repo: &RepositoryIdentity) -> Option<String> {
        let raw: Option<RawFile> = self.fetch_or_default(repo, &["readme"], &[]).await;
        raw.and_then(|f| f.decode())
    }

    async fn commits(&self, repo: &RepositoryIdentity, per_page: u32) -> Vec<CommitSummary> {
        let raw: Vec<RawCommit> = self
            .fetch_or_default(repo, &["commits"], &[("per_page", per_page.to_string())])
            .await;
        raw.into_iter().map(RawCommit::into_summary).collect()
    }

    async fn issues(
        &self,
        repo: &RepositoryIdentity,
        state: IssueState,
        per_page: u32,
    ) -> Vec<IssueSummary> {
        let query = [
            ("state", state.as_str().to_string()),
            ("per_page", per_page.to_string()),
        ];
        let raw: Vec<RawIssue> = self.fetch_or_default(repo, &["issues"], &query).await;
        raw.into_iter().map(RawIssue::into_summary).collect()
    }

    async fn contributors(&self, repo: &RepositoryIdentity, per_page: u32) -> Vec<Contributor> {
        let raw: Vec<RawContributor> = self
            .fetch_or_default(
                repo,
                &["contributors"],
                &[("per_page", per_page.to_string())],
            )
            .await;
        raw.into_iter()
            .map(|c| Contributor {
                login: c.login,
                contributions: c.contributions,
            })
            .collect()
    }

    async fn contents(&self, repo: &RepositoryIdentity, path: &str) -> Vec<ContentEntry> {
        // A file path answers with an object rather than an array.
        let raw: Value = self.fetch_or_default(repo, &["contents", path], &[]).await;
        let Value::Array(items) = raw else {
            return Vec::new();
        };
        items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<RawEntry>(item).ok())
            .map(RawEntry::into_entry)
            .collect()
    }

    async fn file_content(&self, repo: &RepositoryIdentity, path: &str) -> Option<String> {
        let raw: Value = self.fetch_or_default(repo, &["contents", path], &[]).await;
        serde_json::from_value::<RawFile>(raw).ok()?.decode()
    }
}

/// Decode a base64 contents payload, ignoring the embedded line breaks.
pub fn decode_base64_content(encoded: &str) -> Option<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact).ok()?;
    String::from_utf8(bytes).ok()
}

#[derive(Debug, Deserialize)]
struct RawRepo {
    #[serde(default)]
    full_name: String,
    description: Option<String>,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    watchers_count: u64,
    #[serde(default)]
    open_issues_count: u64,
    language: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    pushed_at: Option<String>,
    license: Option<RawLicense>,
    #[serde(default)]
    topics: Vec<String>,
    default_branch: Option<String>,
    #[serde(default)]
    archived: bool,
}

#[derive(Debug, Deserialize)]
struct RawLicense {
    name: Option<String>,
    spdx_id: Option<String>,
}

impl RawRepo {
    fn into_metadata(self, repo: &RepositoryIdentity) -> RepoMetadata {
        let full_name = if self.full_name.is_empty() {
            repo.full_name()
        } else {
            self.full_name
        };
        RepoMetadata {
            html_url: if self.html_url.is_empty() {
                format!("https://github.com/{full_name}")
            } else {
                self.html_url
            },
            full_name,
            description: self.description.filter(|d| !d.trim().is_empty()),
            stars: self.stargazers_count,
            forks: self.forks_count,
            watchers: self.watchers_count,
            open_issues: self.open_issues_count,
            primary_language: self.language,
            created_at: self.created_at,
            updated_at: self.updated_at,
            pushed_at: self.pushed_at,
            license: self.license.and_then(|l| l.name.or(l.spdx_id)),
            topics: self.topics,
            default_branch: self.default_branch.unwrap_or_else(|| "main".to_string()),
            archived: self.archived,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawFile {
    content: Option<String>,
    encoding: Option<String>,
}

impl RawFile {
    fn decode(self) -> Option<String> {
        let content = self.content?;
        match self.encoding.as_deref() {
            Some("base64") | None => decode_base64_content(&content),
            Some(_) => Some(content),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    #[serde(default)]
    sha: String,
    commit: RawCommitDetail,
    author: Option<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawCommitDetail {
    #[serde(default)]
    message: String,
    author: Option<RawGitAuthor>,
}

#[derive(Debug, Deserialize)]
struct RawGitAuthor {
    name: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

impl RawCommit {
    fn into_summary(self) -> CommitSummary {
        let (git_name, date) = match self.commit.author {
            Some(a) => (a.name, a.date),
            None => (None, None),
        };
        CommitSummary {
            sha: self.sha,
            message: self.commit.message.lines().next().unwrap_or_default().to_string(),
            author: self.author.map(|u| u.login).or(git_name),
            date,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    state: String,
    pull_request: Option<Value>,
    created_at: Option<String>,
    #[serde(default)]
    labels: Vec<RawLabel>,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    name: String,
}

impl RawIssue {
    fn into_summary(self) -> IssueSummary {
        IssueSummary {
            number: self.number,
            title: self.title,
            state: self.state,
            is_pull_request: self.pull_request.is_some(),
            created_at: self.created_at,
            labels: self.labels.into_iter().map(|l| l.name).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawContributor {
    login: String,
    #[serde(default)]
    contributions: u64,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: u64,
}

impl RawEntry {
    fn into_entry(self) -> ContentEntry {
        let kind = match self.kind.as_str() {
            "file" => Some(EntryKind::File),
            "dir" => Some(EntryKind::Dir),
            _ => None,
        };
        ContentEntry {
            name: self.name,
            path: self.path,
            kind,
            size: self.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn gateway(base: &str, token: Option<&str>) -> GitHubGateway {
        GitHubGateway::new(
            RemoteClient::with_defaults().unwrap(),
            base,
            token.map(str::to_string),
        )
        .unwrap()
    }

    #[test]
    fn endpoint_encodes_segments_and_keeps_base_path() {
        let gw = gateway("https://ghe.example.com/api/v3/", None);
        let repo = RepositoryIdentity::new("octo", "demo");
        let url = gw.endpoint(&repo, &["contents", "src/my file.py"]);
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/octo/demo/contents/src/my%20file.py"
        );
        let root = gw.endpoint(&repo, &["contents", ""]);
        assert_eq!(
            root.as_str(),
            "https://ghe.example.com/api/v3/repos/octo/demo/contents"
        );
    }

    #[test]
    fn blank_token_means_unauthenticated() {
        assert!(!gateway(DEFAULT_API_BASE, Some("   \t")).is_authenticated());
        assert!(gateway(DEFAULT_API_BASE, Some(" ghp_x ")).is_authenticated());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = GitHubGateway::new(RemoteClient::with_defaults().unwrap(), "not a url", None);
        assert!(result.is_err());
    }

    #[test]
    fn base64_with_line_breaks_decodes() {
        let encoded = "aW1wb3J0IG9z\nCnByaW50KCJo\naSIp\n";
        assert_eq!(
            decode_base64_content(encoded).as_deref(),
            Some("import os\nprint(\"hi\")")
        );
    }

    #[test]
    fn binary_content_decodes_to_none() {
        let encoded = STANDARD.encode([0xff, 0xfe, 0x00, 0x81]);
        assert_eq!(decode_base64_content(&encoded), None);
    }

    #[test]
    fn raw_repo_defaults_missing_fields() {
        let raw: RawRepo = serde_json::from_value(json!({
            "stargazers_count": 5,
            "license": { "name": null, "spdx_id": "Apache-2.0" },
            "description": "  "
        }))
        .unwrap();
        let meta = raw.into_metadata(&RepositoryIdentity::new("octo", "demo"));
        assert_eq!(meta.full_name, "octo/demo");
        assert_eq!(meta.html_url, "https://github.com/octo/demo");
        assert_eq!(meta.stars, 5);
        assert_eq!(meta.description, None);
        assert_eq!(meta.license.as_deref(), Some("Apache-2.0"));
        assert_eq!(meta.default_branch, "main");
    }

    #[test]
    fn commit_summary_keeps_first_line_and_login() {
        let raw: RawCommit = serde_json::from_value(json!({
            "sha": "abc123",
            "commit": {
                "message": "Fix loader\n\nLonger body",
                "author": { "name": "Ada", "date": "2024-03-01T10:00:00Z" }
            },
            "author": { "login": "ada-l" }
        }))
        .unwrap();
        let summary = raw.into_summary();
        assert_eq!(summary.message, "Fix loader");
        assert_eq!(summary.author.as_deref(), Some("ada-l"));
        assert_eq!(summary.date.as_deref(), Some("2024-03-01T10:00:00Z"));
    }

    #[test]
    fn issue_summary_flags_pull_requests() {
        let raw: RawIssue = serde_json::from_value(json!({
            "number": 7,
            "title": "Add CI",
            "state": "open",
            "pull_request": { "url": "https://api.github.com/..." },
            "labels": [{ "name": "ci" }]
        }))
        .unwrap();
        let issue = raw.into_summary();
        assert!(issue.is_pull_request);
        assert_eq!(issue.labels, vec!["ci".to_string()]);
    }

    proptest! {
        #[test]
        fn decode_never_panics(input in "\\PC*") {
            let _ = decode_base64_content(&input);
        }

        #[test]
        fn wrapped_encoding_round_trips(text in "[ -~\\n]{0,400}") {
            let encoded = repolens_test_utils::encode_content(&text);
            prop_assert_eq!(decode_base64_content(&encoded), Some(text));
        }
    }
}
