//! Embedding-based ranking.
//!
//! Each candidate is embedded and compared with two reference concepts. The
//! composite score mixes those similarities with local content heuristics:
//!
//! ```text
//! 0.35 * cos(core) + 0.25 * cos(architecture) + 0.20 * density
//!     + 0.10 * uniqueness + 0.10 * connectivity
//! ```
//!
//! Sets of seven files or fewer are returned as-is with a uniform score.

use super::heuristic::top_files;
use super::similarity::cosine_similarity;
use super::{RankedFiles, TOP_FILES};
use crate::embeddings::Embedder;
use crate::types::RankingMode;
use futures::future::join_all;
use repolens_analyze::{connectivity, content_density, file_name_of, manifest_digest, sort_by_score, ScoredFile};
use repolens_remote::RemoteError;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::OnceCell;

/// Candidate counts at or below this are not ranked.
pub const UNIFORM_RANK_LIMIT: usize = 7;
pub const CORE_LOGIC_REFERENCE: &str = "core application logic";
pub const ARCHITECTURE_REFERENCE: &str = "architectural entrypoint";
/// Raw content prefix embedded for non-manifest files.
pub const EMBEDDING_INPUT_CHARS: usize = 8000;

const NEAR_DUPLICATE_SIMILARITY: f64 = 0.85;
const NEAR_DUPLICATE_PENALTY: f64 = 0.1;

/// Weights of the composite score. They sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticWeights {
    pub core_logic: f64,
    pub architecture: f64,
    pub density: f64,
    pub uniqueness: f64,
    pub connectivity: f64,
}

impl Default for SemanticWeights {
    fn default() -> Self {
        Self {
            core_logic: 0.35,
            architecture: 0.25,
            density: 0.20,
            uniqueness: 0.10,
            connectivity: 0.10,
        }
    }
}

/// The parts of one file's composite score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticSignals {
    pub core_similarity: f64,
    pub architecture_similarity: f64,
    pub density: f64,
    pub uniqueness: f64,
    pub connectivity: f64,
}

impl SemanticWeights {
    pub fn composite(&self, s: &SemanticSignals) -> f64 {
        self.core_logic * s.core_similarity.max(0.0)
            + self.architecture * s.architecture_similarity.max(0.0)
            + self.density * s.density
            + self.uniqueness * s.uniqueness
            + self.connectivity * s.connectivity
    }
}

struct References {
    core: Vec<f32>,
    architecture: Vec<f32>,
}

/// Ranks one analysis run's candidates. Reference embeddings are fetched once per ranker.
pub struct SemanticRanker<'a> {
    embedder: Option<&'a dyn Embedder>,
    weights: SemanticWeights,
    references: OnceCell<References>,
}

impl<'a> SemanticRanker<'a> {
    pub fn new(embedder: Option<&'a dyn Embedder>) -> Self {
        Self {
            embedder,
            weights: SemanticWeights::default(),
            references: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn with_weights(mut self, weights: SemanticWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Rank `candidates` using `contents` for embedding input and heuristics.
    ///
    /// Falls back to heuristic order when there is no embedder or every
    /// embedding call fails.
    pub async fn rank(
        &self,
        candidates: &[ScoredFile],
        contents: &HashMap<String, String>,
    ) -> RankedFiles {
        if candidates.len() <= UNIFORM_RANK_LIMIT {
            return uniform(candidates);
        }
        let Some(embedder) = self.embedder else {
            return heuristic_fallback(candidates);
        };

        let references = match self.references(embedder).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(
                    target: "repolens::rank",
                    error = %e,
                    "reference embeddings failed; using heuristic ranking"
                );
                return heuristic_fallback(candidates);
            }
        };

        let vectors: Vec<Option<Vec<f32>>> = join_all(candidates.iter().map(|file| {
            let input = embedding_input(&file.path, contents.get(&file.path).map(String::as_str));
            async move {
                match embedder.embed(&input).await {
                    Ok(v) => Some(v),
                    Err(e) => {
                        tracing::debug!(
                            target: "repolens::rank",
                            path = %file.path,
                            error = %e,
                            "embedding failed"
                        );
                        None
                    }
                }
            }
        }))
        .await;

        if vectors.iter().all(Option::is_none) {
            tracing::warn!(
                target: "repolens::rank",
                candidates = candidates.len(),
                "no file embeddings; using heuristic ranking"
            );
            return heuristic_fallback(candidates);
        }

        let uniqueness = uniqueness_scores(&vectors);
        let mut ranked: Vec<ScoredFile> = candidates
            .iter()
            .zip(vectors.iter())
            .zip(uniqueness)
            .map(|((file, vector), uniqueness)| {
                let content = contents.get(&file.path).map(String::as_str).unwrap_or_default();
                let (core_similarity, architecture_similarity) = match vector {
                    Some(v) => (
                        cosine_similarity(v, &references.core),
                        cosine_similarity(v, &references.architecture),
                    ),
                    None => (0.0, 0.0),
                };
                let signals = SemanticSignals {
                    core_similarity,
                    architecture_similarity,
                    density: content_density(content),
                    uniqueness,
                    connectivity: connectivity(content),
                };
                let mut scored = file.clone();
                scored.embedding_score = Some(self.weights.composite(&signals));
                scored
            })
            .collect();

        ranked.sort_by(|a, b| {
            let (ea, eb) = (a.embedding_score.unwrap_or(0.0), b.embedding_score.unwrap_or(0.0));
            eb.partial_cmp(&ea)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.score.cmp(&a.score))
                .then_with(|| a.path.cmp(&b.path))
        });
        ranked.truncate(TOP_FILES);

        tracing::debug!(
            target: "repolens::rank",
            top = ?ranked.iter().map(|f| f.path.as_str()).collect::<Vec<_>>(),
            "semantic ranking complete"
        );
        RankedFiles {
            mode: RankingMode::Semantic,
            files: ranked,
        }
    }

    async fn references(&self, embedder: &dyn Embedder) -> Result<&References, RemoteError> {
        self.references
            .get_or_try_init(|| async {
                let (core, architecture) = futures::try_join!(
                    embedder.embed(CORE_LOGIC_REFERENCE),
                    embedder.embed(ARCHITECTURE_REFERENCE)
                )?;
                Ok::<_, RemoteError>(References { core, architecture })
            })
            .await
    }
}

/// Manifest digest when the file is a known manifest, else the content prefix.
///
/// Files without content are embedded by path.
pub fn embedding_input(path: &str, content: Option<&str>) -> String {
    let Some(content) = content.filter(|c| !c.trim().is_empty()) else {
        return path.to_string();
    };
    manifest_digest(file_name_of(path), content)
        .unwrap_or_else(|| content.chars().take(EMBEDDING_INPUT_CHARS).collect())
}

/// `1 - 0.1` per other embedded file above the near-duplicate threshold, floored at 0.
fn uniqueness_scores(vectors: &[Option<Vec<f32>>]) -> Vec<f64> {
    vectors
        .iter()
        .enumerate()
        .map(|(i, own)| {
            let Some(own) = own else {
                return 1.0;
            };
            let near = vectors
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .filter_map(|(_, other)| other.as_ref())
                .filter(|other| cosine_similarity(own, other) > NEAR_DUPLICATE_SIMILARITY)
                .count();
            (1.0 - NEAR_DUPLICATE_PENALTY * near as f64).max(0.0)
        })
        .collect()
}

/// Every candidate in heuristic order, all sharing the top heuristic score.
fn uniform(candidates: &[ScoredFile]) -> RankedFiles {
    let mut files = candidates.to_vec();
    sort_by_score(&mut files);
    let top = files.first().map(|f| f.score).unwrap_or_default();
    for file in &mut files {
        file.score = top;
        file.embedding_score = Some(1.0);
    }
    RankedFiles {
        mode: RankingMode::Uniform,
        files,
    }
}

fn heuristic_fallback(candidates: &[ScoredFile]) -> RankedFiles {
    RankedFiles {
        mode: RankingMode::HeuristicFiles,
        files: top_files(candidates),
    }
}
