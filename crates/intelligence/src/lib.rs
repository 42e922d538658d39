//! Repository analysis built on collected GitHub data.
//!
//! This crate provides:
//! - Bounded tree collection over a [`RepositorySource`](repolens_github::RepositorySource)
//! - Heuristic and embedding-based importance ranking
//! - Chat-completion and embedding clients behind the [`ChatModel`] and [`Embedder`] seams
//! - A time- and freshness-bounded [`AnalysisCache`]
//! - The [`AnalysisOrchestrator`] composing all of the above

pub mod cache;
pub mod embeddings;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod progress;
pub mod prompt;
pub mod rank;
pub mod response;
pub mod tree;
pub mod types;

#[cfg(test)]
mod test_support;

pub use cache::{AnalysisCache, CacheEntry};
pub use embeddings::{Embedder, OpenAiEmbedder, EMBEDDINGS_SERVICE};
pub use error::AnalysisError;
pub use llm::{ChatMessage, ChatModel, OpenAiChat, LLM_SERVICE};
pub use orchestrator::{
    content_candidates, AnalysisOrchestrator, DEFAULT_SEMANTIC_TIMEOUT, MAX_CONTENT_FILES,
    MAX_FILE_CHARS,
};
pub use progress::{retry_reporter, NoopProgress, ProgressReporter, ProgressStage, ProgressUpdate};
pub use prompt::{build_messages, PromptInput};
pub use rank::{
    cosine_similarity, rank_heuristic, RankedFiles, SemanticRanker, SemanticWeights, TOP_FILES,
};
pub use response::{parse_analysis_response, strip_code_fences, validate_key_files, ModelAnalysis};
pub use tree::{TreeCollector, IMPORTANT_DIRS, MAX_DEPTH, MAX_IMPORTANT_DIRS};
pub use types::{
    AnalysisCounts, AnalysisMetadata, AnalysisOptions, AnalysisOutcome, Dependency, FileInsight,
    HealthAssessment, RankingMode, RepositoryAnalysis, RequirementsAudit,
};
