use super::{open_store_and_settings, parse_repo};
use crate::render::render_summary;
use anyhow::{Context, Result};
use repolens_github::GitHubGateway;
use repolens_intelligence::{
    retry_reporter, AnalysisCache, AnalysisOptions, AnalysisOrchestrator, ChatModel, Embedder,
    OpenAiChat, OpenAiEmbedder, ProgressReporter, ProgressUpdate,
};
use repolens_remote::{RemoteClient, RetryPolicy};
use repolens_state::{KeyValueStore, Settings};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
pub(crate) struct AnalyzeArgs {
    pub repo: String,
    pub force: bool,
    pub json: bool,
    pub no_semantic: bool,
    pub github_token: Option<String>,
    pub model: Option<String>,
}

pub(crate) fn handle_analyze_command(args: AnalyzeArgs) -> Result<()> {
    let repo = parse_repo(&args.repo)?;
    let (store, mut settings) = open_store_and_settings()?;
    apply_overrides(&mut settings, &args);

    let progress: Arc<dyn ProgressReporter> = Arc::new(|update: ProgressUpdate| {
        eprintln!("{update}");
    });
    let orchestrator = build_orchestrator(&settings, store, progress)?;
    let options = AnalysisOptions {
        force_refresh: args.force,
        semantic: !args.no_semantic,
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let outcome = rt.block_on(orchestrator.analyze(&repo, options))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.analysis)?);
    } else {
        print!("{}", render_summary(&outcome.analysis, outcome.from_cache));
    }
    Ok(())
}

/// Flags win over every other settings source.
fn apply_overrides(settings: &mut Settings, args: &AnalyzeArgs) {
    if let Some(token) = args
        .github_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        settings.github_token = Some(token.to_string());
    }
    if let Some(model) = args.model.as_deref().filter(|m| !m.trim().is_empty()) {
        settings.llm.model = model.trim().to_string();
    }
}

fn remote_client(
    timeout: Duration,
    settings: &Settings,
    progress: &Arc<dyn ProgressReporter>,
) -> Result<RemoteClient> {
    Ok(RemoteClient::new(timeout)?
        .with_policy(RetryPolicy::new(settings.max_retries))
        .with_on_retry(retry_reporter(progress.clone())))
}

/// Wire the gateway, model clients and cache described by `settings`.
///
/// A missing LLM key is not an error here; the orchestrator reports it when
/// an analysis is requested.
pub(crate) fn build_orchestrator(
    settings: &Settings,
    store: Arc<dyn KeyValueStore>,
    progress: Arc<dyn ProgressReporter>,
) -> Result<AnalysisOrchestrator> {
    let github = RemoteClient::with_defaults()?
        .with_policy(RetryPolicy::new(settings.max_retries))
        .with_on_retry(retry_reporter(progress.clone()));
    let gateway = GitHubGateway::new(
        github,
        &settings.github_api_base,
        settings.github_token.clone(),
    )?;

    let chat = OpenAiChat::from_settings(
        remote_client(settings.llm.timeout, settings, &progress)?,
        &settings.llm,
    )?
    .map(|chat| Arc::new(chat) as Arc<dyn ChatModel>);
    let embedder = OpenAiEmbedder::from_settings(
        remote_client(settings.embeddings.api.timeout, settings, &progress)?,
        &settings.embeddings.api,
    )?
    .map(|embedder| Arc::new(embedder) as Arc<dyn Embedder>);

    tracing::debug!(
        target: "repolens::analyze",
        api_base = %settings.github_api_base,
        authenticated = settings.github_token.is_some(),
        chat = chat.is_some(),
        embeddings = embedder.is_some(),
        "configured analysis pipeline"
    );

    let cache = AnalysisCache::new(store).with_ttl(settings.cache_ttl);
    Ok(AnalysisOrchestrator::new(Arc::new(gateway), cache)
        .with_chat(chat)
        .with_embedder(embedder)
        .with_progress(progress)
        .with_semantic_timeout(settings.embeddings.ranking_timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use repolens_github::RepositoryIdentity;
    use repolens_intelligence::{AnalysisError, NoopProgress};
    use repolens_state::{ApiSettings, EmbeddingsSettings, MemoryStore};
    use repolens_test_utils::GitHubFixture;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(base_url: &str, api_key: Option<&str>) -> ApiSettings {
        ApiSettings {
            api_key: api_key.map(str::to_string),
            base_url: base_url.to_string(),
            model: "gpt-test".into(),
            timeout: Duration::from_secs(5),
        }
    }

    fn settings(github: &str, llm: &str, llm_key: Option<&str>) -> Settings {
        Settings {
            github_token: None,
            github_api_base: github.to_string(),
            llm: api(llm, llm_key),
            embeddings: EmbeddingsSettings {
                api: api(llm, None),
                ranking_timeout: Duration::from_secs(5),
            },
            cache_ttl: Duration::from_secs(3600),
            max_retries: 0,
        }
    }

    fn args() -> AnalyzeArgs {
        AnalyzeArgs {
            repo: "octo/demo".into(),
            force: false,
            json: false,
            no_semantic: false,
            github_token: None,
            model: None,
        }
    }

    #[test]
    fn flags_override_resolved_settings() {
        let mut s = settings("http://gh", "http://llm/v1", None);
        let args = AnalyzeArgs {
            github_token: Some("  ghp_flag ".into()),
            model: Some("gpt-flag".into()),
            ..args()
        };
        apply_overrides(&mut s, &args);
        assert_eq!(s.github_token.as_deref(), Some("ghp_flag"));
        assert_eq!(s.llm.model, "gpt-flag");
    }

    #[test]
    fn blank_flags_leave_settings_alone() {
        let mut s = settings("http://gh", "http://llm/v1", None);
        s.github_token = Some("ghp_env".into());
        let args = AnalyzeArgs {
            github_token: Some("  ".into()),
            model: Some(String::new()),
            ..args()
        };
        apply_overrides(&mut s, &args);
        assert_eq!(s.github_token.as_deref(), Some("ghp_env"));
        assert_eq!(s.llm.model, "gpt-test");
    }

    #[test]
    fn invalid_base_url_is_a_configuration_error() {
        let s = settings("http://gh", "not a url", Some("sk"));
        let result = build_orchestrator(&s, Arc::new(MemoryStore::new()), Arc::new(NoopProgress));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_llm_key_is_reported_on_analyze() {
        let s = settings("http://127.0.0.1:9", "http://127.0.0.1:9/v1", None);
        let orchestrator =
            build_orchestrator(&s, Arc::new(MemoryStore::new()), Arc::new(NoopProgress)).unwrap();
        let err = orchestrator
            .analyze(&RepositoryIdentity::new("octo", "demo"), AnalysisOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration(_)));
        assert!(err.to_string().contains("REPOLENS_LLM_API_KEY"));
    }

    #[tokio::test]
    async fn configured_pipeline_analyzes_and_caches_into_the_store() {
        let fixture = GitHubFixture::start("octo", "demo").await;
        fixture.mount_repo("2024-05-01T12:00:00Z").await;
        fixture.mount_empty_activity().await;
        fixture.mount_contents("", &[("main.py", "file")]).await;
        fixture.mount_file("main.py", "def main():\n    pass\n").await;

        let llm = MockServer::start().await;
        let content = json!({"summary": "Tiny script."}).to_string();
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"choices": [{"message": {"role": "assistant", "content": content}}]}),
            ))
            .expect(1)
            .mount(&llm)
            .await;

        let store = Arc::new(MemoryStore::new());
        let s = settings(
            &fixture.api_base(),
            &format!("{}/v1", llm.uri()),
            Some("sk-test"),
        );
        let orchestrator = build_orchestrator(&s, store.clone(), Arc::new(NoopProgress)).unwrap();
        let repo = RepositoryIdentity::new("octo", "demo");

        let outcome = orchestrator
            .analyze(&repo, AnalysisOptions::default())
            .await
            .unwrap();
        assert!(!outcome.from_cache);
        assert_eq!(outcome.analysis.summary, "Tiny script.");
        assert_eq!(outcome.analysis.metadata.model, "gpt-test");

        let cached = AnalysisCache::new(store).entry(&repo).unwrap();
        assert_eq!(cached.analysis.summary, "Tiny script.");
        assert_eq!(cached.repo_pushed_at.as_deref(), Some("2024-05-01T12:00:00Z"));
    }
}
