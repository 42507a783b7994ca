use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, DeletePointsBuilder, Filter, PointId, ScrollPointsBuilder,
    value::Kind,
};

use super::QdrantConfig;
use crate::error::{VectorError, VectorResult};
use crate::models::CollectionProbe;
use crate::store::VectorStore;

const FILE_ID_FIELD: &str = "file_id";
const SCROLL_PAGE: u32 = 256;

/// Qdrant-backed implementation of VectorStore
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    timeout_secs: u64,
}

impl QdrantVectorStore {
    pub fn new(config: QdrantConfig) -> VectorResult<Self> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(api_key) = config.api_key {
            builder = builder.api_key(api_key);
        }

        builder = builder.timeout(Duration::from_secs(config.timeout_secs));

        let client = builder
            .build()
            .map_err(|e| VectorError::ExternalConnection(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            client,
            collection: config.collection,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Bound a client call by the configured timeout
    async fn bounded<T, F>(&self, call: F) -> VectorResult<T>
    where
        F: Future<Output = Result<T, qdrant_client::QdrantError>>,
    {
        match tokio::time::timeout(Duration::from_secs(self.timeout_secs), call).await {
            Ok(result) => result.map_err(VectorError::from),
            Err(_) => Err(VectorError::ExternalTimeout(self.timeout_secs)),
        }
    }

    fn file_filter(file_id: i32) -> Filter {
        Filter::must([Condition::matches(FILE_ID_FIELD, i64::from(file_id))])
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    fn collection(&self) -> String {
        self.collection.clone()
    }

    async fn probe(&self) -> VectorResult<CollectionProbe> {
        let exists = self.bounded(self.client.collection_exists(&self.collection)).await?;
        if !exists {
            return Ok(CollectionProbe::default());
        }

        let info = self.bounded(self.client.collection_info(&self.collection)).await?;
        let points_count = info.result.and_then(|r| r.points_count).unwrap_or(0);

        Ok(CollectionProbe {
            exists: true,
            points_count,
        })
    }

    async fn has_file(&self, file_id: i32) -> VectorResult<bool> {
        let response = self
            .bounded(
                self.client.count(
                    CountPointsBuilder::new(&self.collection)
                        .filter(Self::file_filter(file_id))
                        .exact(true),
                ),
            )
            .await?;

        Ok(response.result.is_some_and(|r| r.count > 0))
    }

    async fn file_ids(&self, limit: usize) -> VectorResult<Vec<i32>> {
        let mut found = BTreeSet::new();
        let mut offset: Option<PointId> = None;

        loop {
            let mut request = ScrollPointsBuilder::new(&self.collection)
                .limit(SCROLL_PAGE)
                .with_payload(true)
                .with_vectors(false);
            if let Some(point) = offset.take() {
                request = request.offset(point);
            }

            let page = self.bounded(self.client.scroll(request)).await?;

            for point in page.result {
                let file_id = point.payload.get(FILE_ID_FIELD).and_then(|v| match &v.kind {
                    Some(Kind::IntegerValue(id)) => i32::try_from(*id).ok(),
                    _ => None,
                });
                if let Some(id) = file_id {
                    found.insert(id);
                }
            }

            if found.len() >= limit {
                break;
            }
            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(found.into_iter().take(limit).collect())
    }

    async fn delete_file(&self, file_id: i32) -> VectorResult<()> {
        self.bounded(
            self.client.delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(Self::file_filter(file_id))
                    .wait(true),
            ),
        )
        .await?;

        tracing::info!(file_id, collection = %self.collection, "Deleted file vectors");
        Ok(())
    }
}
