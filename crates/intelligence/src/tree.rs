//! Bounded recursive collection of a repository's file tree.

use futures::future::{join_all, BoxFuture, FutureExt};
use repolens_github::{ContentEntry, EntryKind, RepoFileEntry, RepositoryIdentity, RepositorySource};

/// Top-level directory names worth descending into.
pub const IMPORTANT_DIRS: &[&str] = &[
    "functions",
    "pipelines",
    "notebooks",
    "streamlit",
    "src",
    "app",
    "backend",
    "frontend",
    "core",
    "models",
    "services",
    "api",
    "server",
];

/// Important directories walked per repository.
pub const MAX_IMPORTANT_DIRS: usize = 8;

/// Listing levels walked below the repository root, the selected directory being level 1.
pub const MAX_DEPTH: usize = 5;

/// True when `name` and an [`IMPORTANT_DIRS`] entry contain one another, ignoring case.
pub fn is_important_dir(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    if lower.is_empty() {
        return false;
    }
    IMPORTANT_DIRS
        .iter()
        .any(|dir| lower.contains(dir) || dir.contains(lower.as_str()))
}

/// Walk order: functions, then pipeline-like directories, then notebooks, then the rest.
fn dir_priority(name: &str) -> u8 {
    let lower = name.to_ascii_lowercase();
    if lower.contains("function") {
        0
    } else if ["pipeline", "orchestrat", "workflow", "dag"]
        .iter()
        .any(|k| lower.contains(k))
    {
        1
    } else if lower.contains("notebook") {
        2
    } else {
        3
    }
}

/// Pick the important directories of a root listing in walk order.
pub fn select_important_dirs(root: &[ContentEntry]) -> Vec<&ContentEntry> {
    let mut dirs: Vec<&ContentEntry> = root
        .iter()
        .filter(|e| e.kind == Some(EntryKind::Dir) && is_important_dir(&e.name))
        .collect();
    dirs.sort_by_key(|e| dir_priority(&e.name));
    dirs.truncate(MAX_IMPORTANT_DIRS);
    dirs
}

/// Collects a flat file list through a [`RepositorySource`].
pub struct TreeCollector<'a> {
    source: &'a dyn RepositorySource,
    max_depth: usize,
}

impl<'a> TreeCollector<'a> {
    pub fn new(source: &'a dyn RepositorySource) -> Self {
        Self {
            source,
            max_depth: MAX_DEPTH,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Fetch the root listing and collect from it.
    pub async fn collect(&self, repo: &RepositoryIdentity) -> Vec<RepoFileEntry> {
        let root = self.source.contents(repo, "").await;
        self.collect_from_root(repo, &root).await
    }

    /// The root listing plus every file under the selected important directories.
    ///
    /// A failed listing only empties its own subtree.
    pub async fn collect_from_root(
        &self,
        repo: &RepositoryIdentity,
        root: &[ContentEntry],
    ) -> Vec<RepoFileEntry> {
        let mut entries: Vec<RepoFileEntry> =
            root.iter().filter_map(ContentEntry::to_file_entry).collect();

        let selected = select_important_dirs(root);
        tracing::debug!(
            target: "repolens::tree",
            owner = %repo.owner,
            repo = %repo.name,
            dirs = ?selected.iter().map(|d| d.path.as_str()).collect::<Vec<_>>(),
            "walking important directories"
        );

        let subtrees = join_all(
            selected
                .into_iter()
                .map(|dir| self.walk(repo, dir.path.clone(), 1)),
        )
        .await;
        entries.extend(subtrees.into_iter().flatten());

        tracing::debug!(
            target: "repolens::tree",
            owner = %repo.owner,
            repo = %repo.name,
            entries = entries.len(),
            "tree collected"
        );
        entries
    }

    fn walk<'s>(
        &'s self,
        repo: &'s RepositoryIdentity,
        path: String,
        depth: usize,
    ) -> BoxFuture<'s, Vec<RepoFileEntry>> {
        async move {
            if depth > self.max_depth {
                tracing::trace!(target: "repolens::tree", %path, "depth limit reached");
                return Vec::new();
            }
            let listing = self.source.contents(repo, &path).await;

            let mut files = Vec::new();
            let mut children = Vec::new();
            for entry in &listing {
                match entry.kind {
                    Some(EntryKind::File) => files.extend(entry.to_file_entry()),
                    Some(EntryKind::Dir) => children.push(self.walk(repo, entry.path.clone(), depth + 1)),
                    None => {}
                }
            }
            for nested in join_all(children).await {
                files.extend(nested);
            }
            files
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSource;

    fn dir(name: &str) -> ContentEntry {
        ContentEntry {
            name: name.into(),
            path: name.into(),
            kind: Some(EntryKind::Dir),
            size: 0,
        }
    }

    #[test]
    fn important_dirs_match_both_ways_ignoring_case() {
        assert!(is_important_dir("SRC"));
        assert!(is_important_dir("cloud_functions"));
        assert!(is_important_dir("ap"));
        assert!(!is_important_dir("docs"));
        assert!(!is_important_dir(""));
    }

    #[test]
    fn selection_orders_functions_then_pipelines_then_notebooks() {
        let root = vec![
            dir("src"),
            dir("notebooks"),
            dir("pipelines"),
            dir("functions"),
            dir("docs"),
        ];
        let names: Vec<&str> = select_important_dirs(&root)
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["functions", "pipelines", "notebooks", "src"]);
    }

    #[test]
    fn selection_is_capped() {
        let root: Vec<ContentEntry> = IMPORTANT_DIRS.iter().map(|n| dir(n)).collect();
        assert_eq!(select_important_dirs(&root).len(), MAX_IMPORTANT_DIRS);
    }

    #[tokio::test]
    async fn collects_root_and_important_subtrees() {
        let source = FakeSource::new()
            .with_dir("", &[("README.md", "file"), ("src", "dir"), ("docs", "dir")])
            .with_dir("src", &[("main.py", "file"), ("pkg", "dir")])
            .with_dir("src/pkg", &[("model.py", "file")])
            .with_dir("docs", &[("guide.md", "file")]);
        let repo = RepositoryIdentity::new("octo", "demo");

        let entries = TreeCollector::new(&source).collect(&repo).await;
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["README.md", "src", "docs", "src/main.py", "src/pkg/model.py"]
        );
    }

    #[tokio::test]
    async fn depth_is_bounded_below_the_selected_dir() {
        let source = FakeSource::new()
            .with_dir("", &[("src", "dir")])
            .with_dir("src", &[("a", "dir"), ("top.py", "file")])
            .with_dir("src/a", &[("b", "dir")])
            .with_dir("src/a/b", &[("deep.py", "file")]);
        let repo = RepositoryIdentity::new("octo", "demo");

        let entries = TreeCollector::new(&source)
            .with_max_depth(2)
            .collect(&repo)
            .await;
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["src", "src/top.py"]);
    }

    #[tokio::test]
    async fn failed_listing_empties_only_its_subtree() {
        // `api` has no listing mounted, so the fake answers with nothing.
        let source = FakeSource::new()
            .with_dir("", &[("api", "dir"), ("src", "dir")])
            .with_dir("src", &[("main.py", "file")]);
        let repo = RepositoryIdentity::new("octo", "demo");

        let entries = TreeCollector::new(&source).collect(&repo).await;
        assert!(entries.iter().any(|e| e.path == "src/main.py"));
    }
}
