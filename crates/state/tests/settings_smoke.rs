use repolens_state::{JsonFileStore, KeyValueStore, Settings, StoreScope, CREDENTIAL_LLM_KEY};
use repolens_test_utils::{env_guard, set_env_var};
use serde_json::json;
use serial_test::serial;
use std::time::Duration;
use tempfile::tempdir;

#[test]
#[serial]
fn data_dir_config_and_stored_credentials_resolve_together() {
    let _lock = env_guard();
    let tmp = tempdir().unwrap();
    let _home = set_env_var("REPOLENS_HOME", tmp.path().to_str());
    let _cleared: Vec<_> = [
        "GITHUB_TOKEN",
        "REPOLENS_LLM_API_KEY",
        "REPOLENS_LLM_MODEL",
        "REPOLENS_CACHE_TTL_MS",
        "REPOLENS_MAX_RETRIES",
    ]
    .into_iter()
    .map(|key| set_env_var(key, None))
    .collect();

    std::fs::write(
        tmp.path().join("config.toml"),
        "[github]\ntoken = \"ghp_file\"\n\n[llm]\nmodel = \"gpt-file\"\n\n[cache]\nttl_ms = 60000\n",
    )
    .unwrap();

    let store = JsonFileStore::open_default().unwrap();
    assert_eq!(store.root(), tmp.path());
    store
        .set(StoreScope::Sync, CREDENTIAL_LLM_KEY, json!("sk-stored"))
        .unwrap();

    let settings = Settings::load(Some(&store)).unwrap();
    assert_eq!(settings.github_token.as_deref(), Some("ghp_file"));
    assert_eq!(settings.llm.api_key.as_deref(), Some("sk-stored"));
    assert_eq!(settings.llm.model, "gpt-file");
    assert_eq!(settings.cache_ttl, Duration::from_millis(60_000));
    assert_eq!(settings.max_retries, 3);
    assert!(tmp.path().join("sync.json").exists());
}
