//! Plain-text rendering for terminal output.

use repolens_github::RepositoryIdentity;
use repolens_intelligence::{CacheEntry, RepositoryAnalysis};
use std::time::Duration;

/// Human-readable report for one analysis, newline terminated.
pub(crate) fn render_summary(analysis: &RepositoryAnalysis, from_cache: bool) -> String {
    let meta = &analysis.metadata;
    let repo = &meta.repository;
    let mut lines = Vec::new();

    let mut title = repo.full_name.clone();
    if from_cache {
        title.push_str(" (cached)");
    }
    lines.push(title);
    if let Some(description) = repo.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(description.to_string());
    }
    lines.push(format!(
        "stars {}  forks {}  open issues {}  contributors {}",
        repo.stars, repo.forks, meta.counts.open_issues, meta.counts.contributors
    ));
    lines.push(String::new());
    lines.push(analysis.summary.clone());

    if !analysis.key_files.is_empty() {
        lines.push(String::new());
        lines.push("Key files:".to_string());
        for file in &analysis.key_files {
            if file.purpose.is_empty() {
                lines.push(format!("  {}", file.path));
            } else {
                lines.push(format!("  {} - {}", file.path, file.purpose));
            }
        }
    }

    if !analysis.key_folders.is_empty() {
        lines.push(String::new());
        lines.push("Key folders:".to_string());
        for folder in &analysis.key_folders {
            lines.push(format!("  {}/ ({})", folder.path, folder.key_files.join(", ")));
        }
    }

    if !analysis.pipeline.is_empty() {
        lines.push(String::new());
        lines.push(format!("Pipeline: {}", analysis.pipeline));
    }

    if !analysis.use_cases.is_empty() {
        lines.push(String::new());
        lines.push("Use cases:".to_string());
        lines.extend(analysis.use_cases.iter().map(|u| format!("  - {u}")));
    }

    let requirements = &analysis.requirements;
    if !requirements.dependencies.is_empty() || !requirements.summary.is_empty() {
        lines.push(String::new());
        lines.push("Requirements:".to_string());
        if !requirements.summary.is_empty() {
            lines.push(format!("  {}", requirements.summary));
        }
        for dep in &requirements.dependencies {
            let version = dep.version.as_deref().unwrap_or("*");
            lines.push(format!("  {} {} [{}]", dep.name, version, dep.status));
        }
        lines.extend(requirements.risks.iter().map(|r| format!("  risk: {r}")));
    }

    let health = &analysis.health;
    lines.push(String::new());
    lines.push(format!("Health: {} ({}/100)", health.status, health.score));
    lines.extend(health.strengths.iter().map(|s| format!("  + {s}")));
    lines.extend(health.concerns.iter().map(|c| format!("  - {c}")));
    lines.extend(health.recommendations.iter().map(|r| format!("  > {r}")));

    lines.push(String::new());
    lines.push(format!(
        "{} files collected, {} technical; ranking: {}; model: {}; analyzed {}",
        meta.counts.files_collected,
        meta.counts.technical_files,
        meta.ranking_mode.label(),
        meta.model,
        meta.analyzed_at
    ));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Summary of a raw cache entry for `repolens cache show`.
pub(crate) fn describe_cache_entry(
    repo: &RepositoryIdentity,
    entry: &CacheEntry,
    ttl: Duration,
) -> String {
    let age = entry.elapsed();
    let state = if age > ttl { "expired" } else { "fresh" };
    format!(
        "{repo}\n  cached {} ago ({state}, ttl {})\n  pushed at {}\n  ranking {}\n",
        format_duration(age),
        format_duration(ttl),
        entry.repo_pushed_at.as_deref().unwrap_or("unknown"),
        entry.analysis.metadata.ranking_mode.label(),
    )
}

/// Coarse duration text, e.g. `45s`, `12m`, `3h 5m`, `2d 4h`.
pub(crate) fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        0..=59 => format!("{secs}s"),
        60..=3599 => format!("{}m", secs / 60),
        3600..=86_399 => format!("{}h {}m", secs / 3600, (secs % 3600) / 60),
        _ => format!("{}d {}h", secs / 86_400, (secs % 86_400) / 3600),
    }
}

/// Keep the first and last four characters of long secrets.
pub(crate) fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
