//! End-to-end repository analysis.

use crate::cache::AnalysisCache;
use crate::embeddings::Embedder;
use crate::error::AnalysisError;
use crate::llm::ChatModel;
use crate::progress::{NoopProgress, ProgressReporter, ProgressStage, ProgressUpdate};
use crate::prompt::{build_messages, truncate_chars, PromptInput};
use crate::rank::{rank_heuristic, RankedFiles, SemanticRanker};
use crate::response::{fallback_key_files, parse_analysis_response, validate_key_files};
use crate::tree::TreeCollector;
use crate::types::{
    AnalysisCounts, AnalysisMetadata, AnalysisOptions, AnalysisOutcome, RepositoryAnalysis,
};
use chrono::{SecondsFormat, Utc};
use futures::future::join_all;
use repolens_analyze::{
    file_name_of, identify_key_folders, priority_bucket, score_entries, PriorityBucket, ScoredFile,
};
use repolens_github::{
    IssueState, RepoMetadata, RepositoryIdentity, RepositorySource, DEFAULT_PAGE_SIZE,
};
use repolens_remote::{with_timeout, RemoteError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Files whose content is fetched per analysis.
pub const MAX_CONTENT_FILES: usize = 30;
/// Characters kept of each fetched file.
pub const MAX_FILE_CHARS: usize = 8000;
/// Default wall-clock budget for semantic ranking.
pub const DEFAULT_SEMANTIC_TIMEOUT: Duration = Duration::from_secs(45);

/// Composes collection, ranking, the model call and the cache.
///
/// All collaborators are injected; tests substitute fakes for each seam.
pub struct AnalysisOrchestrator {
    source: Arc<dyn RepositorySource>,
    cache: AnalysisCache,
    chat: Option<Arc<dyn ChatModel>>,
    embedder: Option<Arc<dyn Embedder>>,
    progress: Arc<dyn ProgressReporter>,
    semantic_timeout: Duration,
}

impl AnalysisOrchestrator {
    pub fn new(source: Arc<dyn RepositorySource>, cache: AnalysisCache) -> Self {
        Self {
            source,
            cache,
            chat: None,
            embedder: None,
            progress: Arc::new(NoopProgress),
            semantic_timeout: DEFAULT_SEMANTIC_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_chat(mut self, chat: Option<Arc<dyn ChatModel>>) -> Self {
        self.chat = chat;
        self
    }

    #[must_use]
    pub fn with_embedder(mut self, embedder: Option<Arc<dyn Embedder>>) -> Self {
        self.embedder = embedder;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn with_semantic_timeout(mut self, timeout: Duration) -> Self {
        self.semantic_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    fn report(&self, stage: ProgressStage, message: impl Into<String>) {
        self.progress.report(ProgressUpdate::new(stage, message));
    }

    fn remote_error(repo: &RepositoryIdentity, source: RemoteError) -> AnalysisError {
        tracing::error!(
            target: "repolens::analyze",
            owner = %repo.owner,
            repo = %repo.name,
            error = %source,
            "analysis failed"
        );
        AnalysisError::Remote {
            repository: repo.full_name(),
            source,
        }
    }

    /// Analyze `repo`, serving from cache when the cached entry is still current.
    pub async fn analyze(
        &self,
        repo: &RepositoryIdentity,
        options: AnalysisOptions,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let chat = self
            .chat
            .clone()
            .ok_or_else(AnalysisError::missing_llm_credential)?;

        let mut prefetched = None;
        if !options.force_refresh {
            self.report(ProgressStage::CheckCache, format!("checking cache for {repo}"));
            if let Some(cached) = self.cache.get(repo, None) {
                match self.source.repo_info(repo).await {
                    Ok(metadata) => {
                        if let Some(fresh) = self.cache.get(repo, metadata.pushed_at.as_deref()) {
                            tracing::info!(
                                target: "repolens::cache",
                                owner = %repo.owner,
                                repo = %repo.name,
                                "serving cached analysis"
                            );
                            return Ok(AnalysisOutcome {
                                analysis: fresh,
                                from_cache: true,
                            });
                        }
                        prefetched = Some(metadata);
                    }
                    Err(e) => {
                        tracing::warn!(
                            target: "repolens::cache",
                            owner = %repo.owner,
                            repo = %repo.name,
                            error = %e,
                            "could not revalidate cached analysis; serving it unvalidated"
                        );
                        return Ok(AnalysisOutcome {
                            analysis: cached,
                            from_cache: true,
                        });
                    }
                }
            }
        }

        let analysis = self.run(repo, chat.as_ref(), prefetched, options).await?;

        self.report(ProgressStage::WriteCache, "saving analysis");
        self.cache
            .put(repo, &analysis, analysis.metadata.repository.pushed_at.as_deref());

        Ok(AnalysisOutcome {
            analysis,
            from_cache: false,
        })
    }

    async fn run(
        &self,
        repo: &RepositoryIdentity,
        chat: &dyn ChatModel,
        prefetched: Option<RepoMetadata>,
        options: AnalysisOptions,
    ) -> Result<RepositoryAnalysis, AnalysisError> {
        let source = self.source.as_ref();

        self.report(ProgressStage::CollectTree, format!("fetching {repo}"));
        let info = async {
            match prefetched {
                Some(metadata) => Ok(metadata),
                None => source.repo_info(repo).await,
            }
        };
        let (metadata, languages, readme, commits, issues, contributors, root) = tokio::try_join!(
            info,
            async { Ok::<_, RemoteError>(source.languages(repo).await) },
            async { Ok::<_, RemoteError>(source.readme(repo).await) },
            async { Ok::<_, RemoteError>(source.commits(repo, DEFAULT_PAGE_SIZE).await) },
            async {
                Ok::<_, RemoteError>(source.issues(repo, IssueState::Open, DEFAULT_PAGE_SIZE).await)
            },
            async { Ok::<_, RemoteError>(source.contributors(repo, DEFAULT_PAGE_SIZE).await) },
            async { Ok::<_, RemoteError>(source.contents(repo, "").await) },
        )
        .map_err(|e| Self::remote_error(repo, e))?;

        let tree = TreeCollector::new(source).collect_from_root(repo, &root).await;

        self.report(ProgressStage::ClassifyAndScore, format!("classifying {} entries", tree.len()));
        let initial = score_entries(&tree, &HashMap::new());

        let candidates = content_candidates(&initial);
        self.report(
            ProgressStage::FetchFileContents,
            format!("reading {} files", candidates.len()),
        );
        let contents = self.fetch_contents(repo, &candidates).await;

        let scored = score_entries(&tree, &contents);
        let ranked = self.rank(&scored, &candidates, &contents, options).await;
        let key_folders = identify_key_folders(&scored);

        let open_issues = issues.iter().filter(|i| !i.is_pull_request).count();
        let messages = build_messages(&PromptInput {
            metadata: &metadata,
            languages: &languages,
            readme: readme.as_deref(),
            tree: &tree,
            commits: &commits,
            open_issues,
            contributors: &contributors,
            ranked_files: &ranked.files,
            key_folders: &key_folders,
            contents: &contents,
        });

        self.report(ProgressStage::CallLlm, format!("asking {}", chat.model()));
        let response = chat.complete(&messages).await.map_err(|e| match e {
            // A 2xx body that is not a chat completion is a malformed answer.
            RemoteError::Decode { message, .. } => AnalysisError::ResponseShape(message),
            other => Self::remote_error(repo, other),
        })?;

        self.report(ProgressStage::AssembleResult, "validating response");
        let parsed = parse_analysis_response(&response)?;
        let mut key_files = validate_key_files(parsed.key_files, &tree);
        if key_files.is_empty() {
            key_files = fallback_key_files(&ranked.files);
        }

        let counts = AnalysisCounts {
            files_collected: tree.iter().filter(|e| e.is_file()).count(),
            technical_files: scored.len(),
            commits: commits.len(),
            open_issues,
            contributors: contributors.len(),
        };
        tracing::info!(
            target: "repolens::analyze",
            owner = %repo.owner,
            repo = %repo.name,
            files = counts.files_collected,
            technical = counts.technical_files,
            mode = ranked.mode.label(),
            "analysis complete"
        );

        Ok(RepositoryAnalysis {
            summary: parsed.summary,
            key_files,
            key_folders,
            pipeline: parsed.pipeline,
            use_cases: parsed.use_cases,
            requirements: parsed.requirements,
            health: parsed.health,
            metadata: AnalysisMetadata {
                latest_commit_date: commits.first().and_then(|c| c.date.clone()),
                repository: metadata,
                languages,
                counts,
                ranking_mode: ranked.mode,
                analyzed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                model: chat.model().to_string(),
            },
        })
    }

    /// Fetch and truncate each candidate's content; failures are omitted.
    async fn fetch_contents(
        &self,
        repo: &RepositoryIdentity,
        candidates: &[ScoredFile],
    ) -> HashMap<String, String> {
        let fetched = join_all(candidates.iter().map(|file| async move {
            let text = self.source.file_content(repo, &file.path).await?;
            Some((file.path.clone(), truncate_chars(&text, MAX_FILE_CHARS).to_string()))
        }))
        .await;
        fetched.into_iter().flatten().collect()
    }

    async fn rank(
        &self,
        scored: &[ScoredFile],
        candidates: &[ScoredFile],
        contents: &HashMap<String, String>,
        options: AnalysisOptions,
    ) -> RankedFiles {
        let embedder = self.embedder.as_deref().filter(|_| options.semantic);
        let Some(embedder) = embedder else {
            self.report(ProgressStage::RankImportance, "ranking by heuristics");
            return rank_heuristic(scored);
        };

        self.report(
            ProgressStage::RankImportance,
            format!("ranking {} files semantically", candidates.len()),
        );
        // Candidates were picked on path scores; rescore them with content.
        let rescored: Vec<ScoredFile> = candidates
            .iter()
            .filter_map(|c| scored.iter().find(|s| s.path == c.path).cloned())
            .collect();
        let ranker = SemanticRanker::new(Some(embedder));
        with_timeout(
            "semantic ranking",
            self.semantic_timeout,
            ranker.rank(&rescored, contents),
        )
        .await
        .unwrap_or_else(|| rank_heuristic(scored))
    }
}

/// The technical files worth reading, by (bucket, score desc, path), at most [`MAX_CONTENT_FILES`].
pub fn content_candidates(scored: &[ScoredFile]) -> Vec<ScoredFile> {
    let mut ordered: Vec<(PriorityBucket, &ScoredFile)> = scored
        .iter()
        .map(|f| (priority_bucket(&f.path, file_name_of(&f.path)), f))
        .collect();
    ordered.sort_by(|(ba, a), (bb, b)| {
        ba.cmp(bb)
            .then_with(|| b.score.cmp(&a.score))
            .then_with(|| a.path.cmp(&b.path))
    });
    ordered
        .into_iter()
        .take(MAX_CONTENT_FILES)
        .map(|(_, f)| f.clone())
        .collect()
}
