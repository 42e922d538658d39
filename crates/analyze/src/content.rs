//! Content heuristics feeding the semantic ranker.

use regex::Regex;
use std::sync::LazyLock;

/// A function body longer than this many lines counts as long.
const LONG_FUNCTION_LINES: usize = 50;
const DENSITY_SATURATION: f64 = 20.0;
const IMPORT_SATURATION: f64 = 15.0;
const IMPORT_WEIGHT: f64 = 0.6;
const ORCHESTRATION_WEIGHT: f64 = 0.4;
/// Dependencies listed per manifest section in a digest.
const MAX_DIGEST_ITEMS: usize = 40;

static CLASS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?(?:pub(?:\([^)]*\))?\s+)?(?:class|struct|interface|trait|enum)\s+\w+",
    )
    .expect("CLASS_REGEX: compile-time constant")
});

static FUNCTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:export\s+)?(?:default\s+)?(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:def|fn|func|function)\s+\w+|^[ \t]*(?:export\s+)?const\s+\w+\s*=\s*(?:async\s*)?\([^)]*\)\s*=>",
    )
    .expect("FUNCTION_REGEX: compile-time constant")
});

static IMPORT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*(?:import\s|from\s+\S+\s+import\s|use\s+\w|#include\s|(?:const|let|var)\s+.*=\s*require\s*\()"#,
    )
    .expect("IMPORT_REGEX: compile-time constant")
});

const ORCHESTRATION_KEYWORDS: &[&str] = &[
    "__main__",
    "init",
    "setup",
    "bootstrap",
    "main(",
    "app.listen",
    "register",
    "pipeline",
    "orchestrat",
];

/// How much structure a file carries, in `[0, 1]`.
///
/// `min(1, (classes*2 + functions + long_functions*2) / 20)`.
pub fn content_density(content: &str) -> f64 {
    if content.trim().is_empty() {
        return 0.0;
    }
    let lines: Vec<&str> = content.lines().collect();

    let class_starts = declaration_lines(&CLASS_REGEX, content);
    let function_starts = declaration_lines(&FUNCTION_REGEX, content);

    let mut boundaries: Vec<usize> = class_starts
        .iter()
        .chain(function_starts.iter())
        .copied()
        .collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    let long_functions = function_starts
        .iter()
        .filter(|&&start| {
            let end = boundaries
                .iter()
                .find(|&&b| b > start)
                .copied()
                .unwrap_or(lines.len());
            end - start - 1 > LONG_FUNCTION_LINES
        })
        .count();

    let raw = class_starts.len() as f64 * 2.0
        + function_starts.len() as f64
        + long_functions as f64 * 2.0;
    (raw / DENSITY_SATURATION).min(1.0)
}

/// Line numbers (0-based) where `regex` matches.
fn declaration_lines(regex: &Regex, content: &str) -> Vec<usize> {
    let mut starts: Vec<usize> = regex
        .find_iter(content)
        .map(|m| content[..m.start()].matches('\n').count())
        .collect();
    starts.dedup();
    starts
}

/// How connected a file is to the rest of the codebase, in `[0, 1]`.
///
/// Import count saturates at 15 and weighs 0.6; any initialization or
/// orchestration keyword adds 0.4.
pub fn connectivity(content: &str) -> f64 {
    let imports = IMPORT_REGEX.find_iter(content).count() as f64;
    let lower = content.to_ascii_lowercase();
    let orchestrates = ORCHESTRATION_KEYWORDS.iter().any(|k| lower.contains(k));

    let score = IMPORT_WEIGHT * (imports / IMPORT_SATURATION).min(1.0)
        + if orchestrates { ORCHESTRATION_WEIGHT } else { 0.0 };
    score.min(1.0)
}

/// Condensed text of a dependency manifest: name, scripts and dependency keys.
///
/// Returns `None` for files that are not recognized manifests or that fail to parse.
pub fn manifest_digest(filename: &str, content: &str) -> Option<String> {
    let digest = match filename.to_ascii_lowercase().as_str() {
        "package.json" => json_manifest(
            content,
            "scripts",
            &["dependencies", "devDependencies", "peerDependencies"],
        ),
        "composer.json" => json_manifest(content, "scripts", &["require", "require-dev"]),
        "pyproject.toml" => pyproject_digest(content),
        "cargo.toml" => cargo_digest(content),
        "requirements.txt" => requirements_digest(content),
        "go.mod" => go_mod_digest(content),
        _ => return None,
    };
    match digest {
        Some(digest) if !digest.trim().is_empty() => Some(digest),
        _ => {
            tracing::debug!(
                target: "repolens::rank",
                file = filename,
                "manifest yielded no digest; using raw content"
            );
            None
        }
    }
}

fn push_section(out: &mut Vec<String>, label: &str, items: Vec<String>) {
    if items.is_empty() {
        return;
    }
    let shown: Vec<String> = items.into_iter().take(MAX_DIGEST_ITEMS).collect();
    out.push(format!("{label}: {}", shown.join(", ")));
}

fn json_manifest(content: &str, scripts_key: &str, dep_keys: &[&str]) -> Option<String> {
    let doc: serde_json::Value = serde_json::from_str(content).ok()?;
    let doc = doc.as_object()?;
    let mut out = Vec::new();

    if let Some(name) = doc.get("name").and_then(|v| v.as_str()) {
        out.push(format!("name: {name}"));
    }
    let keys_of = |key: &str| -> Vec<String> {
        doc.get(key)
            .and_then(|v| v.as_object())
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    };
    push_section(&mut out, "scripts", keys_of(scripts_key));
    for key in dep_keys {
        push_section(&mut out, key, keys_of(key));
    }
    Some(out.join("\n"))
}

fn toml_keys(value: Option<&toml::Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_table())
        .map(|t| t.keys().cloned().collect())
        .unwrap_or_default()
}

fn pyproject_digest(content: &str) -> Option<String> {
    let doc: toml::Value = toml::from_str(content).ok()?;
    let mut out = Vec::new();
    let project = doc.get("project");
    let poetry = doc.get("tool").and_then(|t| t.get("poetry"));

    if let Some(name) = project
        .or(poetry)
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str())
    {
        out.push(format!("name: {name}"));
    }

    let mut scripts = toml_keys(project.and_then(|p| p.get("scripts")));
    scripts.extend(toml_keys(poetry.and_then(|p| p.get("scripts"))));
    push_section(&mut out, "scripts", scripts);

    let mut deps: Vec<String> = project
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|d| d.as_str())
                .map(python_requirement_name)
                .filter(|n| !n.is_empty())
                .collect()
        })
        .unwrap_or_default();
    deps.extend(
        toml_keys(poetry.and_then(|p| p.get("dependencies")))
            .into_iter()
            .filter(|n| n != "python"),
    );
    push_section(&mut out, "dependencies", deps);
    Some(out.join("\n"))
}

fn cargo_digest(content: &str) -> Option<String> {
    let doc: toml::Value = toml::from_str(content).ok()?;
    let mut out = Vec::new();
    if let Some(name) = doc
        .get("package")
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str())
    {
        out.push(format!("name: {name}"));
    }
    let bins: Vec<String> = doc
        .get("bin")
        .and_then(|b| b.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|b| b.get("name").and_then(|n| n.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    push_section(&mut out, "binaries", bins);
    push_section(&mut out, "dependencies", toml_keys(doc.get("dependencies")));
    push_section(&mut out, "dev-dependencies", toml_keys(doc.get("dev-dependencies")));
    push_section(
        &mut out,
        "workspace-dependencies",
        toml_keys(doc.get("workspace").and_then(|w| w.get("dependencies"))),
    );
    Some(out.join("\n"))
}

fn requirements_digest(content: &str) -> Option<String> {
    let deps: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('-'))
        .map(python_requirement_name)
        .filter(|n| !n.is_empty())
        .collect();
    let mut out = Vec::new();
    push_section(&mut out, "dependencies", deps);
    Some(out.join("\n"))
}

fn go_mod_digest(content: &str) -> Option<String> {
    let mut out = Vec::new();
    let mut requires = Vec::new();
    let mut in_block = false;

    for line in content.lines().map(str::trim) {
        if let Some(module) = line.strip_prefix("module ") {
            out.push(format!("name: {}", module.trim()));
        } else if line.starts_with("require (") {
            in_block = true;
        } else if in_block && line == ")" {
            in_block = false;
        } else if let Some(single) = line.strip_prefix("require ") {
            if let Some(path) = single.split_whitespace().next() {
                requires.push(path.to_string());
            }
        } else if in_block && !line.is_empty() && !line.starts_with("//") {
            if let Some(path) = line.split_whitespace().next() {
                requires.push(path.to_string());
            }
        }
    }
    push_section(&mut out, "dependencies", requires);
    Some(out.join("\n"))
}

/// Package name of a PEP 508 requirement string (`name[extra]>=1.0; marker`).
fn python_requirement_name(requirement: &str) -> String {
    let end = requirement
        .find(|c: char| matches!(c, '=' | '<' | '>' | '!' | '~' | '^' | '[' | ';' | ' ' | '@'))
        .unwrap_or(requirement.len());
    requirement[..end].trim().to_string()
}
