//! Importance ranking of technical files.
//!
//! Two strategies share one output shape:
//! - [`rank_heuristic`]: sort by additive heuristic score, no network.
//! - [`SemanticRanker`]: embedding similarity to reference concepts, with
//!   heuristic fallback when embeddings are unavailable.

mod heuristic;
mod semantic;
mod similarity;

use crate::types::RankingMode;
use repolens_analyze::ScoredFile;

pub use heuristic::{rank_heuristic, top_files};
pub use semantic::{
    embedding_input, SemanticRanker, SemanticSignals, SemanticWeights, ARCHITECTURE_REFERENCE,
    CORE_LOGIC_REFERENCE, EMBEDDING_INPUT_CHARS, UNIFORM_RANK_LIMIT,
};
pub use similarity::cosine_similarity;

/// Key files reported per analysis.
pub const TOP_FILES: usize = 5;

/// Ranked files and the strategy that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFiles {
    pub mode: RankingMode,
    pub files: Vec<ScoredFile>,
}
