//! Typed JSON documents on top of an [`ObjectStore`].

use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::error::StorageError;
use crate::objects::ObjectStore;

/// Load a JSON document.
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    key: &str,
) -> Result<T, StorageError> {
    let output = store.get(key).await?;
    Ok(serde_json::from_slice(&output.body)?)
}

/// Load a JSON document, mapping a missing key to `None`.
pub async fn load_json_opt<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match load_json(store, key).await {
        Ok(value) => Ok(Some(value)),
        Err(StorageError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Save a JSON document. Returns the new ETag.
pub async fn save_json<T: Serialize>(
    store: &dyn ObjectStore,
    key: &str,
    value: &T,
) -> Result<String, StorageError> {
    let body = serde_json::to_vec_pretty(value)?;
    store.put(key, body, Some("application/json")).await
}

/// Load every JSON document under a prefix whose key passes `filter`.
///
/// Documents that fail to deserialize are skipped with a warning so one
/// corrupt object does not hide the rest of a listing.
pub async fn load_all_json<T, F>(
    store: &dyn ObjectStore,
    prefix: &str,
    filter: F,
) -> Result<Vec<T>, StorageError>
where
    T: DeserializeOwned,
    F: Fn(&str) -> bool,
{
    let keys = store.list(prefix).await?;
    let mut values = Vec::new();
    for key in keys.iter().filter(|k| k.ends_with(".json") && filter(k.as_str())) {
        let output = match store.get(key).await {
            Ok(output) => output,
            // Deleted between list and get.
            Err(StorageError::NotFound { .. }) => continue,
            Err(e) => return Err(e),
        };
        match serde_json::from_slice::<T>(&output.body) {
            Ok(value) => values.push(value),
            Err(e) => warn!(key = %key, error = %e, "skipping unreadable document"),
        }
    }
    Ok(values)
}
