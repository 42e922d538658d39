//! In-memory stand-ins for the remote seams, used by unit tests.

use crate::embeddings::Embedder;
use crate::llm::{ChatMessage, ChatModel};
use async_trait::async_trait;
use parking_lot::Mutex;
use repolens_github::{
    CommitSummary, ContentEntry, Contributor, EntryKind, IssueState, IssueSummary, RepoMetadata,
    RepositoryIdentity, RepositorySource,
};
use repolens_remote::RemoteError;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A repository held in memory. Unknown directories list as empty.
#[derive(Default)]
pub(crate) struct FakeSource {
    dirs: HashMap<String, Vec<ContentEntry>>,
    files: HashMap<String, String>,
    metadata: Option<RepoMetadata>,
    listings: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// `entries` are `(name, "file" | "dir")` pairs under `dir` (`""` for the root).
    pub(crate) fn with_dir(mut self, dir: &str, entries: &[(&str, &str)]) -> Self {
        let listing = entries
            .iter()
            .map(|(name, kind)| ContentEntry {
                name: (*name).to_string(),
                path: if dir.is_empty() {
                    (*name).to_string()
                } else {
                    format!("{dir}/{name}")
                },
                kind: match *kind {
                    "dir" => Some(EntryKind::Dir),
                    "file" => Some(EntryKind::File),
                    _ => None,
                },
                size: 0,
            })
            .collect();
        self.dirs.insert(dir.to_string(), listing);
        self
    }

    pub(crate) fn with_file(mut self, path: &str, text: &str) -> Self {
        self.files.insert(path.to_string(), text.to_string());
        self
    }

    pub(crate) fn with_metadata(mut self, metadata: RepoMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub(crate) fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepositorySource for FakeSource {
    async fn repo_info(&self, repo: &RepositoryIdentity) -> Result<RepoMetadata, RemoteError> {
        self.metadata.clone().ok_or_else(|| RemoteError::NotFound {
            service: "GitHub".into(),
            resource: repo.full_name(),
        })
    }

    async fn languages(&self, _repo: &RepositoryIdentity) -> BTreeMap<String, u64> {
        BTreeMap::new()
    }

    async fn readme(&self, _repo: &RepositoryIdentity) -> Option<String> {
        None
    }

    async fn commits(&self, _repo: &RepositoryIdentity, _per_page: u32) -> Vec<CommitSummary> {
        Vec::new()
    }

    async fn issues(
        &self,
        _repo: &RepositoryIdentity,
        _state: IssueState,
        _per_page: u32,
    ) -> Vec<IssueSummary> {
        Vec::new()
    }

    async fn contributors(&self, _repo: &RepositoryIdentity, _per_page: u32) -> Vec<Contributor> {
        Vec::new()
    }

    async fn contents(&self, _repo: &RepositoryIdentity, path: &str) -> Vec<ContentEntry> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        self.dirs.get(path).cloned().unwrap_or_default()
    }

    async fn file_content(&self, _repo: &RepositoryIdentity, path: &str) -> Option<String> {
        self.files.get(path).cloned()
    }
}

/// Embeds by exact input text; unknown inputs get the default vector.
#[derive(Default)]
pub(crate) struct FakeEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    default: Option<Vec<f32>>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub(crate) fn new() -> Self {
        Self {
            default: Some(vec![1.0, 0.0, 0.0]),
            ..Self::default()
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn with_vector(mut self, input: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(input.to_string(), vector);
        self
    }

    pub(crate) fn with_default(mut self, vector: Vec<f32>) -> Self {
        self.default = Some(vector);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RemoteError::Status {
                service: "Embeddings".into(),
                status: 500,
                body: "unavailable".into(),
            });
        }
        self.vectors
            .get(text)
            .or(self.default.as_ref())
            .cloned()
            .ok_or_else(|| RemoteError::Decode {
                service: "Embeddings".into(),
                message: "no vector".into(),
            })
    }
}

/// Replies with a fixed answer and records every conversation.
pub(crate) struct FakeChat {
    reply: Result<String, Box<dyn Fn() -> RemoteError + Send + Sync>>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FakeChat {
    pub(crate) fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call with the given HTTP status.
    pub(crate) fn failing(status: u16) -> Self {
        Self {
            reply: Err(Box::new(move || RemoteError::Status {
                service: "LLM".into(),
                status,
                body: "failure".into(),
            })),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Answers every call with a 2xx body that is not a chat completion.
    pub(crate) fn undecodable() -> Self {
        Self {
            reply: Err(Box::new(|| RemoteError::Decode {
                service: "LLM".into(),
                message: "expected value at line 1 column 1".into(),
            })),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.seen.lock().len()
    }

    pub(crate) fn last_prompt(&self) -> Option<String> {
        self.seen
            .lock()
            .last()
            .and_then(|m| m.last())
            .map(|m| m.content.clone())
    }
}

#[async_trait]
impl ChatModel for FakeChat {
    fn model(&self) -> &str {
        "fake-model"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, RemoteError> {
        self.seen.lock().push(messages.to_vec());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(error) => Err(error()),
        }
    }
}
