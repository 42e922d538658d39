//! Prompt assembly for the analysis call.

use crate::llm::ChatMessage;
use repolens_analyze::{KeyFolder, ScoredFile};
use repolens_github::{CommitSummary, Contributor, IssueSummary, RepoFileEntry, RepoMetadata};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

pub const README_PROMPT_CHARS: usize = 4000;
pub const MAX_PROMPT_PATHS: usize = 400;
pub const EXCERPT_CHARS: usize = 1500;

const SYSTEM_PROMPT: &str = r#"You are a senior software engineer reviewing a GitHub repository.
Answer with a single JSON object and nothing else, using exactly this shape:
{
  "summary": "2-4 sentences on what the project does and for whom",
  "keyFiles": [{"path": "path from the file list", "purpose": "one line"}],
  "pipeline": "how data or control flows through the main components",
  "useCases": ["concrete use case"],
  "requirements": {
    "summary": "one paragraph on the dependency stack",
    "dependencies": [{"name": "", "version": "", "purpose": "", "status": "current|outdated|deprecated|unknown"}],
    "risks": ["dependency or setup risk"]
  },
  "health": {
    "status": "healthy|moderate|at-risk|unknown",
    "score": 0,
    "strengths": [""],
    "concerns": [""],
    "recommendations": [""]
  }
}
Only name key files that appear in the provided file list. Use at most 5 key files. The health score is an integer from 0 to 100."#;

/// Everything gathered about a repository before the model call.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub metadata: &'a RepoMetadata,
    pub languages: &'a BTreeMap<String, u64>,
    pub readme: Option<&'a str>,
    pub tree: &'a [RepoFileEntry],
    pub commits: &'a [CommitSummary],
    pub open_issues: usize,
    pub contributors: &'a [Contributor],
    pub ranked_files: &'a [ScoredFile],
    pub key_folders: &'a [KeyFolder],
    pub contents: &'a HashMap<String, String>,
}

/// First `max` characters of `text`, on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Language shares as `Python 72.1%, Shell 27.9%`, largest first.
fn language_shares(languages: &BTreeMap<String, u64>) -> String {
    let total: u64 = languages.values().sum();
    if total == 0 {
        return "unknown".to_string();
    }
    let mut shares: Vec<(&String, &u64)> = languages.iter().collect();
    shares.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    shares
        .into_iter()
        .map(|(name, bytes)| format!("{name} {:.1}%", *bytes as f64 * 100.0 / total as f64))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn build_messages(input: &PromptInput<'_>) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(build_user_prompt(input)),
    ]
}

pub fn build_user_prompt(input: &PromptInput<'_>) -> String {
    let meta = input.metadata;
    let mut out = String::new();

    // `write!` into a String cannot fail.
    let _ = writeln!(out, "Repository: {}", meta.full_name);
    if let Some(description) = meta.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(out, "Description: {description}");
    }
    let _ = writeln!(
        out,
        "Stars: {} | Forks: {} | Open issues: {}",
        meta.stars, meta.forks, input.open_issues
    );
    let _ = writeln!(out, "License: {}", meta.license.as_deref().unwrap_or("none"));
    if !meta.topics.is_empty() {
        let _ = writeln!(out, "Topics: {}", meta.topics.join(", "));
    }
    let _ = writeln!(out, "Languages: {}", language_shares(input.languages));
    let _ = writeln!(
        out,
        "Activity: {} recent commits (latest {}), {} contributors",
        input.commits.len(),
        input
            .commits
            .first()
            .and_then(|c| c.date.as_deref())
            .unwrap_or("unknown"),
        input.contributors.len()
    );

    out.push_str("\nREADME:\n");
    match input.readme.filter(|r| !r.trim().is_empty()) {
        Some(readme) => {
            out.push_str(truncate_chars(readme, README_PROMPT_CHARS));
            out.push('\n');
        }
        None => out.push_str("(no README)\n"),
    }

    let files: Vec<&str> = input
        .tree
        .iter()
        .filter(|e| e.is_file())
        .map(|e| e.path.as_str())
        .collect();
    let _ = writeln!(out, "\nFile list ({} files):", files.len());
    for path in files.iter().take(MAX_PROMPT_PATHS) {
        let _ = writeln!(out, "- {path}");
    }
    if files.len() > MAX_PROMPT_PATHS {
        let _ = writeln!(out, "... {} more", files.len() - MAX_PROMPT_PATHS);
    }

    if !input.ranked_files.is_empty() {
        out.push_str("\nLocally ranked key files:\n");
        for file in input.ranked_files {
            let _ = writeln!(out, "- {} (score {})", file.path, file.score);
        }
    }
    if !input.key_folders.is_empty() {
        out.push_str("\nKey folders:\n");
        for folder in input.key_folders {
            let _ = writeln!(out, "- {}/: {}", folder.path, folder.key_files.join(", "));
        }
    }

    for file in input.ranked_files {
        if let Some(content) = input.contents.get(&file.path) {
            let _ = write!(
                out,
                "\n--- {} ---\n{}\n",
                file.path,
                truncate_chars(content, EXCERPT_CHARS)
            );
        }
    }
    out
}
