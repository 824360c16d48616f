use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::objects::{GetObjectOutput, ObjectStore};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    etag: String,
    content_type: Option<String>,
}

/// An in-process [`ObjectStore`]. Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn etag_for(body: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("\"{:016x}\"", hasher.finish())
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<GetObjectOutput, StorageError> {
        let objects = self.objects.read().await;
        let obj = objects.get(key).ok_or_else(|| StorageError::NotFound {
            key: key.to_string(),
        })?;
        Ok(GetObjectOutput {
            body: obj.body.clone(),
            etag: Some(obj.etag.clone()),
            content_type: obj.content_type.clone(),
        })
    }

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<String, StorageError> {
        let etag = etag_for(&body);
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                body,
                etag: etag.clone(),
                content_type: content_type.map(str::to_string),
            },
        );
        Ok(etag)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}
