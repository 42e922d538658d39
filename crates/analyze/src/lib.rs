//! Repository file classification.
//!
//! This crate decides which files of a repository matter and how much:
//! - Technical-file detection (blacklist first, then whitelist)
//! - Additive heuristic importance scores and priority buckets
//! - Key-folder aggregation over the first path segment
//! - Content heuristics (density, connectivity, manifest digests)
//!
//! # Example
//!
//! ```rust
//! use repolens_analyze::{is_technical_file, score_technical_file};
//!
//! assert!(is_technical_file("src/main.py", "main.py"));
//! assert!(!is_technical_file("tests/model.py", "model.py"));
//! assert!(score_technical_file("main.py", "main.py", None) > score_technical_file("util.py", "util.py", None));
//! ```

#![deny(unsafe_code)]

pub mod classify;
pub mod content;
pub mod folders;

pub use classify::{
    file_name_of, in_non_technical_dir, is_high_importance_dir, is_technical_file,
    priority_bucket, score_entries, score_technical_file, sort_by_score, PriorityBucket,
    ScoredFile, HIGH_IMPORTANCE_DIRS,
};
pub use content::{connectivity, content_density, manifest_digest};
pub use folders::{
    has_nesting, identify_key_folders, KeyFolder, MAX_FILES_PER_FOLDER, MAX_KEY_FOLDERS,
};
