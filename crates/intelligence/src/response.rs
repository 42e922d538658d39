//! Parsing and validation of the model's answer.

use crate::error::AnalysisError;
use crate::rank::TOP_FILES;
use crate::types::{Dependency, FileInsight, HealthAssessment, RequirementsAudit, UNKNOWN_STATUS};
use repolens_analyze::{file_name_of, priority_bucket, ScoredFile};
use repolens_github::RepoFileEntry;
use serde::Deserialize;
use std::collections::HashSet;

/// The model-provided facets of an analysis, defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAnalysis {
    pub summary: String,
    pub key_files: Vec<FileInsight>,
    pub pipeline: String,
    pub use_cases: Vec<String>,
    pub requirements: RequirementsAudit,
    pub health: HealthAssessment,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawResponse {
    summary: Option<String>,
    key_files: Vec<RawKeyFile>,
    pipeline: Option<String>,
    use_cases: Vec<String>,
    requirements: Option<RawRequirements>,
    health: Option<RawHealth>,
}

/// Models return either `{"path", "purpose"}` objects or bare paths.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawKeyFile {
    Detailed {
        path: String,
        #[serde(default)]
        purpose: String,
    },
    Path(String),
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawRequirements {
    summary: String,
    dependencies: Vec<Dependency>,
    risks: Vec<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawHealth {
    status: Option<String>,
    score: Option<f64>,
    strengths: Vec<String>,
    concerns: Vec<String>,
    recommendations: Vec<String>,
}

/// The body of the first markdown code fence, or the trimmed input when it has none.
///
/// Bare JSON is returned untouched so backticks inside string values survive.
/// Prose around the fence is dropped, as is a fence that shares one line with its body.
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    if trimmed.starts_with('{') {
        return trimmed;
    }
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let after = &trimmed[open + 3..];
    // Info string (e.g. `json`) runs until the first non-word character.
    let info_len = after
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(after.len());
    let body = &after[info_len..];
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Parse the model's JSON answer. A missing or empty `summary` is a shape error.
pub fn parse_analysis_response(response: &str) -> Result<ModelAnalysis, AnalysisError> {
    let body = strip_code_fences(response);
    let raw: RawResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::ResponseShape(format!("response is not valid JSON: {e}")))?;

    let summary = raw
        .summary
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AnalysisError::ResponseShape("response has no summary".to_string()))?;

    let key_files = raw
        .key_files
        .into_iter()
        .map(|f| match f {
            RawKeyFile::Detailed { path, purpose } => FileInsight { path, purpose },
            RawKeyFile::Path(path) => FileInsight {
                path,
                purpose: String::new(),
            },
        })
        .collect();

    let requirements = raw
        .requirements
        .map(|r| RequirementsAudit {
            summary: r.summary,
            dependencies: r.dependencies,
            risks: r.risks,
        })
        .unwrap_or_default();

    Ok(ModelAnalysis {
        summary,
        key_files,
        pipeline: raw.pipeline.unwrap_or_default(),
        use_cases: raw.use_cases,
        requirements,
        health: raw.health.map(normalize_health).unwrap_or_default(),
    })
}

fn normalize_health(raw: RawHealth) -> HealthAssessment {
    let status = raw
        .status
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_STATUS.to_string());
    let score = raw
        .score
        .filter(|s| s.is_finite())
        .map(|s| s.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(0);
    HealthAssessment {
        status,
        score,
        strengths: raw.strengths,
        concerns: raw.concerns,
        recommendations: raw.recommendations,
    }
}

fn normalize_path(path: &str) -> &str {
    let path = path.trim();
    let path = path.strip_prefix("./").unwrap_or(path);
    path.trim_start_matches('/')
}

/// Keep only claimed key files present in the collected tree, first five, no repeats.
pub fn validate_key_files(claimed: Vec<FileInsight>, tree: &[RepoFileEntry]) -> Vec<FileInsight> {
    let known: HashSet<&str> = tree
        .iter()
        .filter(|e| e.is_file())
        .map(|e| e.path.as_str())
        .collect();
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    for insight in claimed {
        let path = normalize_path(&insight.path);
        if !known.contains(path) {
            tracing::debug!(target: "repolens::analyze", path, "dropping key file not in tree");
            continue;
        }
        if seen.insert(path.to_string()) {
            kept.push(FileInsight {
                path: path.to_string(),
                purpose: insight.purpose,
            });
        }
        if kept.len() == TOP_FILES {
            break;
        }
    }
    kept
}

/// Key files from local ranking, for when the model names none that exist.
pub fn fallback_key_files(ranked: &[ScoredFile]) -> Vec<FileInsight> {
    ranked
        .iter()
        .take(TOP_FILES)
        .map(|f| FileInsight {
            path: f.path.clone(),
            purpose: priority_bucket(&f.path, file_name_of(&f.path))
                .purpose()
                .to_string(),
        })
        .collect()
}
