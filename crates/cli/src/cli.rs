use clap::{Parser, Subcommand};

/// Command-line interface for the `repolens` application.
#[derive(Debug, Parser)]
#[command(
    name = "repolens",
    version,
    about = "Summarize a GitHub repository's structure, key files and health"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available `repolens` commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyzes a repository (owner/name or GitHub URL).
    Analyze {
        /// Repository to analyze, e.g. `rust-lang/cargo`.
        #[arg(required = true, value_name = "REPO")]
        repo: String,
        /// Ignores any cached analysis and runs the full pipeline.
        #[arg(long, default_value_t = false)]
        force: bool,
        /// Prints the analysis as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Skips embedding-based ranking even when an embeddings key is configured.
        #[arg(long, default_value_t = false)]
        no_semantic: bool,
        /// GitHub token for this run (overrides `GITHUB_TOKEN` and stored credentials).
        #[arg(long, value_name = "TOKEN")]
        github_token: Option<String>,
        /// Chat model for this run (overrides `REPOLENS_LLM_MODEL`).
        #[arg(long, value_name = "MODEL")]
        model: Option<String>,
    },
    /// Manages stored API credentials.
    Credentials {
        #[command(subcommand)]
        action: CredentialsAction,
    },
    /// Inspects or clears cached analyses.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum CredentialsAction {
    /// Stores one or more credentials. An empty value removes the stored credential.
    Set {
        #[arg(long, value_name = "TOKEN")]
        github_token: Option<String>,
        #[arg(long, value_name = "KEY")]
        llm_api_key: Option<String>,
        #[arg(long, value_name = "KEY")]
        embeddings_api_key: Option<String>,
    },
    /// Shows which credentials are configured, masked.
    Show,
}

#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Prints the age and freshness hint of a cached analysis.
    Show {
        #[arg(required = true, value_name = "REPO")]
        repo: String,
    },
    /// Removes a cached analysis.
    Clear {
        #[arg(required = true, value_name = "REPO")]
        repo: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn analyze_flags_parse() {
        let cli = Cli::try_parse_from([
            "repolens",
            "analyze",
            "octo/demo",
            "--force",
            "--json",
            "--no-semantic",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze {
                repo,
                force,
                json,
                no_semantic,
                github_token,
                model,
            } => {
                assert_eq!(repo, "octo/demo");
                assert!(force && json && no_semantic);
                assert!(github_token.is_none());
                assert!(model.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn analyze_requires_a_repository() {
        assert!(Cli::try_parse_from(["repolens", "analyze"]).is_err());
    }

    #[test]
    fn credentials_set_accepts_each_key() {
        let cli = Cli::try_parse_from([
            "repolens",
            "credentials",
            "set",
            "--llm-api-key",
            "sk-1",
        ])
        .unwrap();
        match cli.command {
            Commands::Credentials {
                action:
                    CredentialsAction::Set {
                        github_token,
                        llm_api_key,
                        embeddings_api_key,
                    },
            } => {
                assert_eq!(llm_api_key.as_deref(), Some("sk-1"));
                assert!(github_token.is_none());
                assert!(embeddings_api_key.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cache_clear_parses() {
        let cli = Cli::try_parse_from(["repolens", "cache", "clear", "octo/demo"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cache {
                action: CacheAction::Clear { ref repo }
            } if repo == "octo/demo"
        ));
    }
}
