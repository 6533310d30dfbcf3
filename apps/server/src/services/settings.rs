//! Per-user settings updates.
//!
//! Updates are validated in full before anything is written: a batch
//! either applies completely or not at all.

use chat_store::ChatStore;
use entities::{Settings, value_kind};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{ServerError, ServerResult};

/// Keys that may never be changed through the settings endpoints.
const FORBIDDEN_KEYS: &[&str] = &["id"];

fn validate_entry(settings: &Settings, key: &str, value: &Value) -> ServerResult<()> {
    if FORBIDDEN_KEYS.contains(&key) {
        return Err(ServerError::InvalidRequest(format!(
            "'{key}' change is not allowed"
        )));
    }

    let current = settings.get(key).ok_or_else(|| {
        ServerError::InvalidRequest(format!("Unknown settings key '{key}'"))
    })?;

    let expected = value_kind(current);
    let actual = value_kind(value);
    if expected != actual {
        return Err(ServerError::InvalidRequest(format!(
            "'{key}' is {actual} but has to be {expected}"
        )));
    }

    Ok(())
}

/// Applies a batch of settings changes for a user.
///
/// Every entry must name a known, non-forbidden key and carry a value of
/// the same JSON kind as the current one. Any invalid entry rejects the
/// whole batch and no key changes. Returns the updated settings.
pub async fn update_settings<S: ChatStore>(
    store: &S,
    user_id: Uuid,
    updates: Map<String, Value>,
) -> ServerResult<Settings> {
    let mut settings = store
        .get_settings(user_id)
        .await?
        .ok_or_else(|| ServerError::InvalidRequest("User not found".to_string()))?;

    for (key, value) in &updates {
        validate_entry(&settings, key, value)?;
    }

    for (key, value) in updates {
        settings.set(&key, value);
    }

    store.put_settings(user_id, settings.clone()).await?;
    tracing::debug!(%user_id, "Settings updated");
    Ok(settings)
}

/// Applies a single-key settings change.
pub async fn update_setting<S: ChatStore>(
    store: &S,
    user_id: Uuid,
    key: &str,
    value: Value,
) -> ServerResult<Settings> {
    let mut updates = Map::new();
    updates.insert(key.to_string(), value);
    update_settings(store, user_id, updates).await
}
