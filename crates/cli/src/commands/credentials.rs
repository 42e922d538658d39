use crate::render::mask_secret;
use anyhow::{bail, Result};
use repolens_state::{
    JsonFileStore, KeyValueStore, Settings, StoreScope, CREDENTIAL_EMBEDDINGS_KEY,
    CREDENTIAL_GITHUB_TOKEN, CREDENTIAL_LLM_KEY,
};
use serde_json::Value;

#[derive(Debug, PartialEq, Eq)]
enum CredentialChange {
    Stored(&'static str),
    Removed(&'static str),
}

/// Write each provided credential to the sync scope. Blank values remove the key.
fn store_credentials(
    store: &dyn KeyValueStore,
    updates: [(&'static str, Option<String>); 3],
) -> Result<Vec<CredentialChange>> {
    let mut changes = Vec::new();
    for (key, value) in updates {
        let Some(value) = value else { continue };
        let value = value.trim();
        if value.is_empty() {
            store.remove(StoreScope::Sync, key)?;
            changes.push(CredentialChange::Removed(key));
        } else {
            store.set(StoreScope::Sync, key, Value::String(value.to_string()))?;
            changes.push(CredentialChange::Stored(key));
        }
    }
    Ok(changes)
}

pub(crate) fn handle_credentials_set_command(
    github_token: Option<String>,
    llm_api_key: Option<String>,
    embeddings_api_key: Option<String>,
) -> Result<()> {
    if github_token.is_none() && llm_api_key.is_none() && embeddings_api_key.is_none() {
        bail!("nothing to store; pass at least one credential flag (see `repolens credentials set --help`)");
    }
    let store = JsonFileStore::open_default()?;
    let changes = store_credentials(
        &store,
        [
            (CREDENTIAL_GITHUB_TOKEN, github_token),
            (CREDENTIAL_LLM_KEY, llm_api_key),
            (CREDENTIAL_EMBEDDINGS_KEY, embeddings_api_key),
        ],
    )?;
    for change in changes {
        match change {
            CredentialChange::Stored(key) => println!("Stored {}", label(key)),
            CredentialChange::Removed(key) => println!("Removed {}", label(key)),
        }
    }
    println!("Credentials file: {}", store.root().join("sync.json").display());
    Ok(())
}

pub(crate) fn handle_credentials_show_command() -> Result<()> {
    let store = JsonFileStore::open_default()?;
    let settings = Settings::load(Some(&store))?;
    for line in credential_lines(&settings) {
        println!("{line}");
    }
    Ok(())
}

fn label(key: &str) -> &'static str {
    match key {
        CREDENTIAL_GITHUB_TOKEN => "GitHub token",
        CREDENTIAL_LLM_KEY => "LLM API key",
        CREDENTIAL_EMBEDDINGS_KEY => "Embeddings API key",
        _ => "credential",
    }
}

/// One masked line per credential, after resolving every settings source.
fn credential_lines(settings: &Settings) -> Vec<String> {
    [
        (CREDENTIAL_GITHUB_TOKEN, settings.github_token.as_deref()),
        (CREDENTIAL_LLM_KEY, settings.llm.api_key.as_deref()),
        (
            CREDENTIAL_EMBEDDINGS_KEY,
            settings.embeddings.api.api_key.as_deref(),
        ),
    ]
    .into_iter()
    .map(|(key, value)| {
        let shown = value.map(mask_secret).unwrap_or_else(|| "not set".to_string());
        format!("{:<20}{shown}", format!("{}:", label(key)))
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use repolens_state::{Config, MemoryStore};
    use repolens_test_utils::{env_guard, set_env_var};
    use serial_test::serial;

    #[test]
    fn provided_values_are_stored_and_blank_values_removed() {
        let store = MemoryStore::new();
        store
            .set(StoreScope::Sync, CREDENTIAL_LLM_KEY, Value::String("old".into()))
            .unwrap();

        let changes = store_credentials(
            &store,
            [
                (CREDENTIAL_GITHUB_TOKEN, Some("  ghp_abc  ".into())),
                (CREDENTIAL_LLM_KEY, Some(" ".into())),
                (CREDENTIAL_EMBEDDINGS_KEY, None),
            ],
        )
        .unwrap();

        assert_eq!(
            changes,
            vec![
                CredentialChange::Stored(CREDENTIAL_GITHUB_TOKEN),
                CredentialChange::Removed(CREDENTIAL_LLM_KEY),
            ]
        );
        assert_eq!(
            store
                .get_string(StoreScope::Sync, CREDENTIAL_GITHUB_TOKEN)
                .unwrap()
                .as_deref(),
            Some("ghp_abc")
        );
        assert!(store
            .get(StoreScope::Sync, CREDENTIAL_LLM_KEY)
            .unwrap()
            .is_none());
    }

    #[test]
    #[serial]
    fn stored_credentials_show_masked() {
        let _guard = env_guard();
        let _gh = set_env_var("GITHUB_TOKEN", None);
        let _llm = set_env_var("REPOLENS_LLM_API_KEY", None);
        let _emb = set_env_var("REPOLENS_EMBEDDINGS_API_KEY", None);

        let store = MemoryStore::new();
        store_credentials(
            &store,
            [
                (CREDENTIAL_GITHUB_TOKEN, Some("ghp_1234567890abcdef".into())),
                (CREDENTIAL_LLM_KEY, None),
                (CREDENTIAL_EMBEDDINGS_KEY, None),
            ],
        )
        .unwrap();
        let settings = Settings::resolve(Some(&Config::default()), Some(&store));
        let lines = credential_lines(&settings);

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("GitHub token:"));
        assert!(lines[0].ends_with("ghp_...cdef"));
        assert!(!lines[0].contains("567890"));
        assert!(lines[1].ends_with("not set"));
        assert!(lines[2].ends_with("not set"));
    }
}
