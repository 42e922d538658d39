use crate::cli::{CacheAction, Cli, Commands, CredentialsAction};
use crate::commands::{
    handle_analyze_command, handle_cache_clear_command, handle_cache_show_command,
    handle_credentials_set_command, handle_credentials_show_command, AnalyzeArgs,
};
use anyhow::Result;
use clap::Parser;

/// Entry point for the `repolens` binary.
///
/// Logs go to stderr, filtered by `RUST_LOG`, so that `--json` output on
/// stdout can be piped.
pub fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            repo,
            force,
            json,
            no_semantic,
            github_token,
            model,
        } => handle_analyze_command(AnalyzeArgs {
            repo,
            force,
            json,
            no_semantic,
            github_token,
            model,
        }),
        Commands::Credentials { action } => match action {
            CredentialsAction::Set {
                github_token,
                llm_api_key,
                embeddings_api_key,
            } => handle_credentials_set_command(github_token, llm_api_key, embeddings_api_key),
            CredentialsAction::Show => handle_credentials_show_command(),
        },
        Commands::Cache { action } => match action {
            CacheAction::Show { repo } => handle_cache_show_command(&repo),
            CacheAction::Clear { repo } => handle_cache_clear_command(&repo),
        },
    }
}
