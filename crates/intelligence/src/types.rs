//! The analysis result and the options that shape it.

use repolens_analyze::KeyFolder;
use repolens_github::RepoMetadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status reported when the model gives none.
pub const UNKNOWN_STATUS: &str = "unknown";

/// A file the analysis calls out, with a one-line purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInsight {
    pub path: String,
    #[serde(default)]
    pub purpose: String,
}

/// One declared dependency as judged by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dependency {
    pub name: String,
    pub version: Option<String>,
    pub purpose: String,
    /// e.g. `current`, `outdated`, `deprecated`
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequirementsAudit {
    pub summary: String,
    pub dependencies: Vec<Dependency>,
    pub risks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthAssessment {
    pub status: String,
    /// 0 to 100.
    pub score: u8,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendations: Vec<String>,
}

impl Default for HealthAssessment {
    fn default() -> Self {
        Self {
            status: UNKNOWN_STATUS.to_string(),
            score: 0,
            strengths: Vec::new(),
            concerns: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

/// Which ranking strategy produced the key files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankingMode {
    #[default]
    HeuristicFiles,
    HeuristicFolders,
    Semantic,
    /// Too few files to rank; all carry the same score.
    Uniform,
}

impl RankingMode {
    pub fn label(&self) -> &'static str {
        match self {
            RankingMode::HeuristicFiles => "heuristic-files",
            RankingMode::HeuristicFolders => "heuristic-folders",
            RankingMode::Semantic => "semantic",
            RankingMode::Uniform => "uniform",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisCounts {
    pub files_collected: usize,
    pub technical_files: usize,
    pub commits: usize,
    /// Open issues, pull requests excluded.
    pub open_issues: usize,
    pub contributors: usize,
}

/// Facts gathered locally, independent of the model's answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisMetadata {
    pub repository: RepoMetadata,
    /// Language name to byte count.
    pub languages: BTreeMap<String, u64>,
    pub counts: AnalysisCounts,
    pub latest_commit_date: Option<String>,
    pub ranking_mode: RankingMode,
    /// RFC 3339
    pub analyzed_at: String,
    pub model: String,
}

/// The final product of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryAnalysis {
    pub summary: String,
    /// At most five, every path present in the collected tree.
    #[serde(default)]
    pub key_files: Vec<FileInsight>,
    #[serde(default)]
    pub key_folders: Vec<KeyFolder>,
    #[serde(default)]
    pub pipeline: String,
    #[serde(default)]
    pub use_cases: Vec<String>,
    #[serde(default)]
    pub requirements: RequirementsAudit,
    #[serde(default)]
    pub health: HealthAssessment,
    #[serde(default)]
    pub metadata: AnalysisMetadata,
}

/// An analysis plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub analysis: RepositoryAnalysis,
    pub from_cache: bool,
}

/// Caller-controlled switches for one analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Skip the cache check and always analyze afresh.
    pub force_refresh: bool,
    /// Use embedding-based ranking when an embedder is configured.
    pub semantic: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            force_refresh: false,
            semantic: true,
        }
    }
}
