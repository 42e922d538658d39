use super::{open_store_and_settings, parse_repo};
use crate::render::describe_cache_entry;
use anyhow::Result;
use repolens_intelligence::AnalysisCache;

pub(crate) fn handle_cache_show_command(repo: &str) -> Result<()> {
    let repo = parse_repo(repo)?;
    let (store, settings) = open_store_and_settings()?;
    let cache = AnalysisCache::new(store).with_ttl(settings.cache_ttl);
    match cache.entry(&repo) {
        Some(entry) => print!("{}", describe_cache_entry(&repo, &entry, cache.ttl())),
        None => println!("No cached analysis for {repo}"),
    }
    Ok(())
}

pub(crate) fn handle_cache_clear_command(repo: &str) -> Result<()> {
    let repo = parse_repo(repo)?;
    let (store, _) = open_store_and_settings()?;
    if AnalysisCache::new(store).remove(&repo)? {
        println!("Removed cached analysis for {repo}");
    } else {
        println!("No cached analysis for {repo}");
    }
    Ok(())
}
