//! Errors surfaced by [`crate::AnalysisOrchestrator`].

use repolens_remote::RemoteError;
use thiserror::Error;

/// Top-level failure of one analysis.
///
/// Degraded fetches and cache revalidation failures are recovered inside the
/// pipeline and never appear here.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A required credential or setting is missing. The user has to act.
    #[error("{0}")]
    Configuration(String),

    /// The repository lookup or the model call failed after retries.
    #[error("analysis of {repository} failed: {source}")]
    Remote {
        repository: String,
        #[source]
        source: RemoteError,
    },

    /// The model answered with something that is not the expected JSON.
    #[error("The AI returned invalid data ({0}). Please retry the analysis.")]
    ResponseShape(String),
}

impl AnalysisError {
    pub fn missing_llm_credential() -> Self {
        AnalysisError::Configuration(
            "No LLM API key configured. Set REPOLENS_LLM_API_KEY or run `repolens credentials set --llm-api-key <KEY>`."
                .to_string(),
        )
    }

    /// The underlying remote error, if any.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            AnalysisError::Remote { source, .. } => Some(source),
            _ => None,
        }
    }

    /// True when the user should add or raise a GitHub credential.
    pub fn is_rate_limited(&self) -> bool {
        self.remote().is_some_and(RemoteError::is_rate_limited)
    }
}
