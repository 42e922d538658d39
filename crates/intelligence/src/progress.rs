//! Progress reporting for long-running analyses.

use repolens_remote::{OnRetry, RetryNotice};
use std::fmt;
use std::sync::Arc;

/// Pipeline stage a progress update belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressStage {
    CheckCache,
    CollectTree,
    ClassifyAndScore,
    RankImportance,
    FetchFileContents,
    CallLlm,
    AssembleResult,
    WriteCache,
    /// A remote call failed and is about to be retried.
    Retrying,
}

impl ProgressStage {
    pub fn label(&self) -> &'static str {
        match self {
            ProgressStage::CheckCache => "check-cache",
            ProgressStage::CollectTree => "collect-tree",
            ProgressStage::ClassifyAndScore => "classify",
            ProgressStage::RankImportance => "rank",
            ProgressStage::FetchFileContents => "fetch-contents",
            ProgressStage::CallLlm => "call-llm",
            ProgressStage::AssembleResult => "assemble",
            ProgressStage::WriteCache => "write-cache",
            ProgressStage::Retrying => "retrying",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub stage: ProgressStage,
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: ProgressStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProgressUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage.label(), self.message)
    }
}

/// Receives progress updates. Must not block or fail.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _update: ProgressUpdate) {}
}

impl<F> ProgressReporter for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        self(update)
    }
}

/// Adapt a reporter into a retry observer emitting [`ProgressStage::Retrying`] updates.
pub fn retry_reporter(progress: Arc<dyn ProgressReporter>) -> OnRetry {
    Arc::new(move |notice: RetryNotice| {
        progress.report(ProgressUpdate::new(ProgressStage::Retrying, notice.to_string()));
    })
}
