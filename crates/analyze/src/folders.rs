//! Directory-level aggregation of scored files.

use crate::classify::{is_high_importance_dir, ScoredFile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Folders returned by [`identify_key_folders`].
pub const MAX_KEY_FOLDERS: usize = 5;
/// Files carried per key folder.
pub const MAX_FILES_PER_FOLDER: usize = 2;

const SECOND_FILE_WEIGHT: f64 = 0.5;
const HIGH_IMPORTANCE_FOLDER_BONUS: f64 = 5.0;
const LARGE_FOLDER_BONUS: f64 = 3.0;
const MEDIUM_FOLDER_BONUS: f64 = 1.0;

/// A top-level folder judged central to the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFolder {
    pub path: String,
    pub name: String,
    /// At most two paths, best first.
    pub key_files: Vec<String>,
    #[serde(default)]
    pub score: f64,
}

/// Group technical files by their first path segment and pick the strongest folders.
///
/// Root-level files take no part. Folder score is the top file's score plus
/// half the second's, plus 5 for a high-importance name, plus 3 when the
/// folder holds more than 5 files or 1 when it holds more than 2.
pub fn identify_key_folders(files: &[ScoredFile]) -> Vec<KeyFolder> {
    let mut groups: BTreeMap<&str, Vec<&ScoredFile>> = BTreeMap::new();
    for file in files {
        if let Some((top, _rest)) = file.path.split_once('/') {
            if !top.is_empty() {
                groups.entry(top).or_default().push(file);
            }
        }
    }

    let mut folders: Vec<KeyFolder> = groups
        .into_iter()
        .map(|(name, mut members)| {
            members.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.path.cmp(&b.path)));

            let top = members.first().map_or(0.0, |f| f64::from(f.score));
            let second = members.get(1).map_or(0.0, |f| f64::from(f.score));
            let mut score = top + SECOND_FILE_WEIGHT * second;
            if is_high_importance_dir(name) {
                score += HIGH_IMPORTANCE_FOLDER_BONUS;
            }
            score += match members.len() {
                n if n > 5 => LARGE_FOLDER_BONUS,
                n if n > 2 => MEDIUM_FOLDER_BONUS,
                _ => 0.0,
            };

            KeyFolder {
                path: name.to_string(),
                name: name.to_string(),
                key_files: members
                    .iter()
                    .take(MAX_FILES_PER_FOLDER)
                    .map(|f| f.path.clone())
                    .collect(),
                score,
            }
        })
        .collect();

    folders.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.name.cmp(&b.name))
    });
    folders.truncate(MAX_KEY_FOLDERS);
    folders
}

/// True when any file sits below the repository root.
pub fn has_nesting(files: &[ScoredFile]) -> bool {
    files.iter().any(|f| f.path.contains('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn file(path: &str, score: u32) -> ScoredFile {
        ScoredFile::new(path, score)
    }

    #[test]
    fn root_files_are_not_grouped() {
        let folders = identify_key_folders(&[file("main.py", 11), file("setup.py", 5)]);
        assert!(folders.is_empty());
    }

    #[test]
    fn folder_score_combines_top_two_and_bonuses() {
        let files = vec![
            file("src/a.py", 10),
            file("src/b.py", 6),
            file("src/c.py", 1),
            file("scripts/run.sh", 12),
        ];
        let folders = identify_key_folders(&files);

        let src = folders.iter().find(|f| f.name == "src").unwrap();
        // 10 + 0.5*6 + 5 (high importance) + 1 (more than 2 files)
        assert_eq!(src.score, 19.0);
        assert_eq!(src.key_files, vec!["src/a.py", "src/b.py"]);

        let scripts = folders.iter().find(|f| f.name == "scripts").unwrap();
        assert_eq!(scripts.score, 12.0);
        assert_eq!(folders[0].name, "src");
    }

    #[test]
    fn large_folders_get_larger_bonus() {
        let files: Vec<ScoredFile> = (0..6).map(|i| file(&format!("misc/f{i}.py"), 1)).collect();
        let folders = identify_key_folders(&files);
        assert_eq!(folders[0].score, 1.0 + 0.5 + 3.0);
    }

    #[test]
    fn ties_break_by_name() {
        let folders = identify_key_folders(&[file("zeta/a.py", 3), file("alpha/a.py", 3)]);
        let names: Vec<&str> = folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn nesting_detection() {
        assert!(!has_nesting(&[file("main.py", 1)]));
        assert!(has_nesting(&[file("main.py", 1), file("src/lib.rs", 1)]));
    }

    proptest! {
        #[test]
        fn never_more_than_five_folders_of_two_files(
            entries in prop::collection::vec(("[a-h]{1,2}", "[a-z]{1,6}", 0u32..30), 0..60)
        ) {
            let files: Vec<ScoredFile> = entries
                .iter()
                .map(|(dir, name, score)| file(&format!("{dir}/{name}.py"), *score))
                .collect();
            let folders = identify_key_folders(&files);
            prop_assert!(folders.len() <= MAX_KEY_FOLDERS);
            for folder in &folders {
                prop_assert!(folder.key_files.len() <= MAX_FILES_PER_FOLDER);
                prop_assert!(!folder.key_files.is_empty());
            }
        }
    }
}
