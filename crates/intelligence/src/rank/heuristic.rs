//! Network-free ranking over heuristic scores.

use super::{RankedFiles, TOP_FILES};
use crate::types::RankingMode;
use repolens_analyze::{has_nesting, sort_by_score, ScoredFile};

/// The five highest-scoring files, ties broken by path.
pub fn top_files(scored: &[ScoredFile]) -> Vec<ScoredFile> {
    let mut files = scored.to_vec();
    sort_by_score(&mut files);
    files.truncate(TOP_FILES);
    files
}

/// Rank by heuristic score alone.
///
/// Nested repositories are reported in folder mode; the key folders
/// themselves come from [`repolens_analyze::identify_key_folders`].
pub fn rank_heuristic(scored: &[ScoredFile]) -> RankedFiles {
    let mode = if has_nesting(scored) {
        RankingMode::HeuristicFolders
    } else {
        RankingMode::HeuristicFiles
    };
    RankedFiles {
        mode,
        files: top_files(scored),
    }
}
