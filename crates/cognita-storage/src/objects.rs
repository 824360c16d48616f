use async_trait::async_trait;

use crate::error::StorageError;

/// Result of a GET operation, including the body and ETag.
#[derive(Debug, Clone)]
pub struct GetObjectOutput {
    pub body: Vec<u8>,
    pub etag: Option<String>,
    pub content_type: Option<String>,
}

/// Flat key/value object storage.
///
/// Keys are `/`-separated paths; see `cognita_core::keys` for the layout.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Get an object. Missing keys are `StorageError::NotFound`.
    async fn get(&self, key: &str) -> Result<GetObjectOutput, StorageError>;

    /// Put an object, replacing any previous value. Returns the new ETag.
    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<String, StorageError>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// List keys under a prefix, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Delete all objects under a prefix. Returns the number deleted.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, StorageError> {
        let keys = self.list(prefix).await?;
        let count = keys.len();
        for key in &keys {
            self.delete(key).await?;
        }
        Ok(count)
    }
}
