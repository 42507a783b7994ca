use async_trait::async_trait;

use crate::error::VectorResult;
use crate::models::CollectionProbe;

/// The slice of the external vector database the admin surface needs.
///
/// Points are grouped by an integer `file_id` payload.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Name of the backing collection
    fn collection(&self) -> String;

    async fn probe(&self) -> VectorResult<CollectionProbe>;

    /// Whether any point carries this `file_id`
    async fn has_file(&self, file_id: i32) -> VectorResult<bool>;

    /// Distinct file ids found in point payloads, at most `limit`
    async fn file_ids(&self, limit: usize) -> VectorResult<Vec<i32>>;

    /// Remove every point of a file
    async fn delete_file(&self, file_id: i32) -> VectorResult<()>;
}
