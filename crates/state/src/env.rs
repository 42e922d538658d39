use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Analyses older than this are treated as expired.
pub const DEFAULT_CACHE_TTL_MS: u64 = 86_400_000; // 24 hours

const DEFAULT_MAX_RETRIES: u32 = 3;

/// Returns the user's home directory.
pub fn home_dir() -> Result<PathBuf> {
    #[cfg(unix)]
    if let Ok(home) = std::env::var("HOME") {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir().ok_or_else(|| anyhow::anyhow!("home directory not found"))
}

/// Returns the repolens data directory (`REPOLENS_HOME` or `~/.repolens`).
pub fn data_dir() -> Result<PathBuf> {
    if let Some(custom) = env_non_empty("REPOLENS_HOME") {
        return Ok(PathBuf::from(custom));
    }
    Ok(home_dir()?.join(".repolens"))
}

/// Returns the path to the optional configuration file.
pub fn config_file() -> Option<PathBuf> {
    data_dir().ok().map(|d| d.join("config.toml"))
}

/// Reads an environment variable, treating blank values as unset.
pub fn env_non_empty(key: &str) -> Option<String> {
    let raw = std::env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Reads a numeric environment variable; unparsable values are ignored.
pub fn env_u64(key: &str) -> Option<u64> {
    env_non_empty(key).and_then(|v| v.parse::<u64>().ok())
}

/// Returns the retry budget from `REPOLENS_MAX_RETRIES`, falling back to `fallback` or 3.
pub fn env_max_retries(fallback: Option<u32>) -> u32 {
    env_non_empty("REPOLENS_MAX_RETRIES")
        .and_then(|v| v.parse::<u32>().ok())
        .or(fallback)
        .unwrap_or(DEFAULT_MAX_RETRIES)
}

/// Computes the analysis cache TTL using env var or the config file value.
pub fn cache_ttl(config_ttl_ms: Option<u64>) -> Duration {
    let env_ttl = env_u64("REPOLENS_CACHE_TTL_MS");
    Duration::from_millis(env_ttl.or(config_ttl_ms).unwrap_or(DEFAULT_CACHE_TTL_MS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use repolens_test_utils::{env_guard, set_env_var};

    #[test]
    fn data_dir_defaults_to_home() {
        /*
        GIVEN no REPOLENS_HOME override
        WHEN resolving the data directory
        THEN it should sit under HOME
        */
        let _guard = env_guard();
        let temp = tempfile::tempdir().expect("tempdir");
        let _home = set_env_var("HOME", temp.path().to_str());
        let _custom = set_env_var("REPOLENS_HOME", None);

        assert_eq!(data_dir().unwrap(), temp.path().join(".repolens"));
        assert_eq!(
            config_file().unwrap(),
            temp.path().join(".repolens/config.toml")
        );
    }

    #[test]
    fn data_dir_respects_override() {
        let _guard = env_guard();
        let _custom = set_env_var("REPOLENS_HOME", Some("/tmp/repolens-test-home"));
        assert_eq!(
            data_dir().unwrap(),
            PathBuf::from("/tmp/repolens-test-home")
        );
    }

    #[test]
    fn blank_env_values_are_unset() {
        let _guard = env_guard();
        let _token = set_env_var("REPOLENS_TEST_BLANK", Some("   \t"));
        assert!(env_non_empty("REPOLENS_TEST_BLANK").is_none());
    }

    #[test]
    fn cache_ttl_prefers_env_then_config_then_default() {
        let _guard = env_guard();
        let _ttl = set_env_var("REPOLENS_CACHE_TTL_MS", None);
        assert_eq!(cache_ttl(None), Duration::from_millis(DEFAULT_CACHE_TTL_MS));
        assert_eq!(cache_ttl(Some(5_000)), Duration::from_millis(5_000));

        let _ttl = set_env_var("REPOLENS_CACHE_TTL_MS", Some("1000"));
        assert_eq!(cache_ttl(Some(5_000)), Duration::from_millis(1_000));
    }

    #[test]
    fn invalid_max_retries_falls_back() {
        let _guard = env_guard();
        let _retries = set_env_var("REPOLENS_MAX_RETRIES", Some("many"));
        assert_eq!(env_max_retries(None), 3);
        assert_eq!(env_max_retries(Some(5)), 5);

        let _retries = set_env_var("REPOLENS_MAX_RETRIES", Some("1"));
        assert_eq!(env_max_retries(Some(5)), 1);
    }
}
