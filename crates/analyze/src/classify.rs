//! Technical-file detection and heuristic importance scoring.
//!
//! Everything here is pure: the same `(path, filename, content)` always yields
//! the same answer and nothing touches the network.

use regex::Regex;
use repolens_github::RepoFileEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Filename fragments that mark documentation or legal boilerplate.
const BLACKLIST_NAME_FRAGMENTS: &[&str] = &[
    "readme",
    "license",
    "licence",
    "changelog",
    "contributing",
    "code_of_conduct",
];

/// Documentation, media, archive and generated-artifact suffixes.
const BLACKLIST_SUFFIXES: &[&str] = &[
    ".md", ".markdown", ".rst", ".adoc", ".pdf", ".doc", ".docx", ".odt", ".ppt", ".pptx",
    ".xls", ".xlsx", ".csv", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".bmp", ".webp",
    ".tiff", ".psd", ".mp4", ".mov", ".avi", ".mkv", ".webm", ".mp3", ".wav", ".ogg", ".flac",
    ".zip", ".tar", ".gz", ".tgz", ".bz2", ".xz", ".7z", ".rar", ".jar", ".war", ".whl",
    ".egg", ".woff", ".woff2", ".ttf", ".otf", ".eot", ".min.js", ".min.css", ".map", ".pyc",
    ".so", ".dll", ".exe", ".bin", ".pt", ".pth", ".onnx", ".h5", ".ckpt", ".safetensors",
    ".pkl", ".parquet",
];

/// Directory names whose contents never count as technical.
const NON_TECHNICAL_DIRS: &[&str] = &[
    "docs",
    "doc",
    "documentation",
    "test",
    "tests",
    "__tests__",
    "testing",
    "spec",
    "specs",
    "fixtures",
    "__mocks__",
    "examples",
    "example",
    "samples",
    "sample",
    "static",
    "assets",
    "public",
    "images",
    "img",
    "media",
    "vendor",
    "third_party",
    "node_modules",
    "bower_components",
    "dist",
    "build",
    "out",
    "target",
    "coverage",
    ".next",
    ".nuxt",
    ".git",
    ".svn",
    ".hg",
    ".vscode",
    ".idea",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".tox",
    ".cache",
    "venv",
    ".venv",
    "env",
    "site-packages",
];

const TECHNICAL_EXTENSIONS: &[&str] = &[
    "py", "ipynb", "js", "jsx", "mjs", "cjs", "ts", "tsx", "rs", "go", "java", "kt", "kts",
    "scala", "rb", "php", "c", "h", "cc", "cpp", "cxx", "hpp", "cs", "swift", "m", "mm", "r",
    "jl", "dart", "lua", "ex", "exs", "erl", "clj", "hs", "ml", "fs", "zig", "nim", "sol", "sh",
    "bash", "zsh", "ps1", "sql", "proto", "graphql", "gql", "vue", "svelte", "astro", "yaml",
    "yml", "toml", "json", "ini", "cfg", "conf", "tf", "hcl", "gradle", "cmake", "mk", "lock",
];

/// Application entry points (+10).
const ENTRYPOINT_FILENAMES: &[&str] = &[
    "main.py",
    "__main__.py",
    "app.py",
    "server.py",
    "run.py",
    "manage.py",
    "wsgi.py",
    "asgi.py",
    "cli.py",
    "index.js",
    "index.ts",
    "index.tsx",
    "main.js",
    "main.ts",
    "main.tsx",
    "app.js",
    "app.ts",
    "app.tsx",
    "app.jsx",
    "server.js",
    "server.ts",
    "main.go",
    "main.rs",
    "lib.rs",
    "main.java",
    "application.java",
    "program.cs",
    "index.php",
    "main.c",
    "main.cpp",
    "main.swift",
    "main.kt",
];

/// Model and pipeline core files (+8).
const ML_CORE_FILENAMES: &[&str] = &[
    "train.py",
    "training.py",
    "model.py",
    "models.py",
    "pipeline.py",
    "pipelines.py",
    "inference.py",
    "predict.py",
    "dataset.py",
    "data_loader.py",
    "dataloader.py",
    "preprocess.py",
    "preprocessing.py",
    "features.py",
    "evaluate.py",
    "workflow.py",
    "dag.py",
    "tasks.py",
];

/// Browser-extension core files (+8).
const EXTENSION_CORE_FILENAMES: &[&str] = &[
    "manifest.json",
    "background.js",
    "background.ts",
    "content.js",
    "content.ts",
    "content_script.js",
    "content-script.js",
    "service_worker.js",
    "service-worker.js",
    "popup.js",
    "popup.ts",
    "options.js",
];

/// Container and build orchestration files (+6).
const INFRA_FILENAMES: &[&str] = &[
    "dockerfile",
    "containerfile",
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
    "makefile",
];

/// High-value configuration and manifests (+4).
const CONFIG_FILENAMES: &[&str] = &[
    "package.json",
    "pyproject.toml",
    "setup.py",
    "setup.cfg",
    "requirements.txt",
    "environment.yml",
    "cargo.toml",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "composer.json",
    "gemfile",
    "tsconfig.json",
    "vite.config.ts",
    "vite.config.js",
    "webpack.config.js",
    "next.config.js",
    "serverless.yml",
    "firebase.json",
    "app.yaml",
    "cloudbuild.yaml",
    "vercel.json",
    "netlify.toml",
];

/// Other names accepted as technical regardless of extension.
const EXTRA_TECHNICAL_FILENAMES: &[&str] = &[
    "procfile",
    "jenkinsfile",
    "rakefile",
    "pipfile",
    "cmakelists.txt",
    "requirements-dev.txt",
    ".env.example",
    "go.sum",
];

/// Directory names that signal core code (+5, and a key-folder bonus).
pub const HIGH_IMPORTANCE_DIRS: &[&str] = &[
    "src",
    "app",
    "core",
    "lib",
    "services",
    "service",
    "api",
    "server",
    "backend",
    "pipelines",
    "pipeline",
    "functions",
    "models",
    "engine",
    "agents",
];

const ENTRYPOINT_BONUS: u32 = 10;
const ML_CORE_BONUS: u32 = 8;
const EXTENSION_CORE_BONUS: u32 = 8;
const INFRA_BONUS: u32 = 6;
const HIGH_IMPORTANCE_DIR_BONUS: u32 = 5;
const CONFIG_BONUS: u32 = 4;
const DECLARATION_BONUS: u32 = 2;
const BASE_SCORE: u32 = 1;

static DECLARATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^\s*(?:export\s+)?(?:default\s+)?(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:class|def|fn|func|function|interface|struct|trait|impl)\b",
    )
    .expect("DECLARATION_REGEX: compile-time constant")
});

/// Coarse role of a technical file, in content-read order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityBucket {
    Config,
    Model,
    Entrypoint,
    AgentPrompt,
    Supporting,
}

impl PriorityBucket {
    pub fn label(&self) -> &'static str {
        match self {
            PriorityBucket::Config => "config",
            PriorityBucket::Model => "model",
            PriorityBucket::Entrypoint => "entrypoint",
            PriorityBucket::AgentPrompt => "agent-prompt",
            PriorityBucket::Supporting => "supporting",
        }
    }

    /// One-line purpose used when describing a file without model input.
    pub fn purpose(&self) -> &'static str {
        match self {
            PriorityBucket::Config => "Project configuration and dependency manifest",
            PriorityBucket::Model => "Model, data or pipeline logic",
            PriorityBucket::Entrypoint => "Application entry point",
            PriorityBucket::AgentPrompt => "Agent, prompt or tool definitions",
            PriorityBucket::Supporting => "Supporting source code",
        }
    }
}

/// A technical file with its heuristic score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredFile {
    pub path: String,
    pub score: u32,
    /// Semantic composite in `[0, 1]`, set only by the semantic ranker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_score: Option<f64>,
}

impl ScoredFile {
    pub fn new(path: impl Into<String>, score: u32) -> Self {
        Self {
            path: path.into(),
            score,
            embedding_score: None,
        }
    }

    pub fn file_name(&self) -> &str {
        file_name_of(&self.path)
    }
}

/// Last segment of a forward-slash path.
pub fn file_name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn extension_of(lower_name: &str) -> Option<&str> {
    let (stem, ext) = lower_name.rsplit_once('.')?;
    if stem.is_empty() {
        None
    } else {
        Some(ext)
    }
}

fn stem_of(lower_name: &str) -> &str {
    match lower_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => lower_name,
    }
}

/// Directory segments of `path`, excluding the file name.
fn dir_segments(path: &str) -> impl Iterator<Item = &str> {
    let mut parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    parts.pop();
    parts.into_iter()
}

fn is_infra_name(lower_name: &str) -> bool {
    INFRA_FILENAMES.contains(&lower_name)
        || lower_name.starts_with("dockerfile.")
        || lower_name.ends_with(".dockerfile")
}

/// True when any directory segment of `path` is a non-technical directory.
pub fn in_non_technical_dir(path: &str) -> bool {
    dir_segments(path).any(|segment| {
        let lower = segment.to_ascii_lowercase();
        NON_TECHNICAL_DIRS.contains(&lower.as_str())
    })
}

/// True when `name` is a high-importance directory name.
pub fn is_high_importance_dir(name: &str) -> bool {
    HIGH_IMPORTANCE_DIRS.contains(&name.to_ascii_lowercase().as_str())
}

/// Decide whether a file is worth reading to understand how the software works.
///
/// The blacklist always wins: `tests/model.py` is not technical even though
/// `.py` is whitelisted. Unknown files are rejected.
pub fn is_technical_file(path: &str, filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();

    if BLACKLIST_NAME_FRAGMENTS.iter().any(|f| lower.contains(f))
        || BLACKLIST_SUFFIXES.iter().any(|s| lower.ends_with(s))
    {
        return false;
    }
    if in_non_technical_dir(path) {
        return false;
    }

    let known_name = ENTRYPOINT_FILENAMES.contains(&lower.as_str())
        || ML_CORE_FILENAMES.contains(&lower.as_str())
        || EXTENSION_CORE_FILENAMES.contains(&lower.as_str())
        || CONFIG_FILENAMES.contains(&lower.as_str())
        || EXTRA_TECHNICAL_FILENAMES.contains(&lower.as_str())
        || is_infra_name(&lower);

    known_name || extension_of(&lower).is_some_and(|ext| TECHNICAL_EXTENSIONS.contains(&ext))
}

/// Additive heuristic importance. Missing content scores as empty text.
pub fn score_technical_file(path: &str, filename: &str, content: Option<&str>) -> u32 {
    let lower = filename.to_ascii_lowercase();
    let name = lower.as_str();
    let content = content.unwrap_or_default();
    let mut score = BASE_SCORE;

    if ENTRYPOINT_FILENAMES.contains(&name) {
        score += ENTRYPOINT_BONUS;
    }
    if ML_CORE_FILENAMES.contains(&name) {
        score += ML_CORE_BONUS;
    }
    if EXTENSION_CORE_FILENAMES.contains(&name) {
        score += EXTENSION_CORE_BONUS;
    }
    if is_infra_name(name) {
        score += INFRA_BONUS;
    }
    if CONFIG_FILENAMES.contains(&name) {
        score += CONFIG_BONUS;
    }
    if dir_segments(path).any(is_high_importance_dir) {
        score += HIGH_IMPORTANCE_DIR_BONUS;
    }

    score += line_tier_bonus(content.lines().count());

    if DECLARATION_REGEX.is_match(content) {
        score += DECLARATION_BONUS;
    }
    score
}

fn line_tier_bonus(lines: usize) -> u32 {
    match lines {
        n if n > 500 => 3,
        n if n > 200 => 2,
        n if n > 50 => 1,
        _ => 0,
    }
}

/// Classify a technical file's role.
pub fn priority_bucket(path: &str, filename: &str) -> PriorityBucket {
    let lower = filename.to_ascii_lowercase();
    let name = lower.as_str();
    let stem = stem_of(name);

    let config_ext = matches!(
        extension_of(name),
        Some("toml" | "yaml" | "yml" | "ini" | "cfg" | "conf" | "json" | "lock" | "tf" | "hcl")
    );
    if CONFIG_FILENAMES.contains(&name)
        || is_infra_name(name)
        || config_ext
        || stem.contains("config")
        || stem.contains("settings")
    {
        return PriorityBucket::Config;
    }

    let in_model_dir = dir_segments(path).any(|s| {
        let s = s.to_ascii_lowercase();
        s == "models" || s == "ml" || s == "pipelines"
    });
    if ML_CORE_FILENAMES.contains(&name)
        || in_model_dir
        || ["model", "train", "pipeline", "inference"]
            .iter()
            .any(|k| stem.contains(k))
    {
        return PriorityBucket::Model;
    }

    if ENTRYPOINT_FILENAMES.contains(&name) || EXTENSION_CORE_FILENAMES.contains(&name) {
        return PriorityBucket::Entrypoint;
    }

    if ["agent", "prompt", "chain", "tool", "llm"]
        .iter()
        .any(|k| stem.contains(k))
    {
        return PriorityBucket::AgentPrompt;
    }

    PriorityBucket::Supporting
}

/// Score every technical file in `entries`, highest first (ties by path).
///
/// `contents` holds whatever file text is available; absent files score on
/// path and name alone.
pub fn score_entries(entries: &[RepoFileEntry], contents: &HashMap<String, String>) -> Vec<ScoredFile> {
    let mut scored: Vec<ScoredFile> = entries
        .iter()
        .filter(|e| e.is_file() && is_technical_file(&e.path, e.file_name()))
        .map(|e| {
            let content = contents.get(&e.path).map(String::as_str);
            ScoredFile::new(e.path.clone(), score_technical_file(&e.path, e.file_name(), content))
        })
        .collect();
    sort_by_score(&mut scored);
    scored
}

/// Descending score, then ascending path.
pub fn sort_by_score(files: &mut [ScoredFile]) {
    files.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.path.cmp(&b.path)));
}
