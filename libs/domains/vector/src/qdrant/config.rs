use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse_or, env_required};

pub const DEFAULT_COLLECTION: &str = "file_embeddings";

/// Qdrant connection configuration
#[derive(Debug, Clone, PartialEq)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    /// Per-call timeout
    pub timeout_secs: u64,
}

impl QdrantConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            collection: DEFAULT_COLLECTION.to_string(),
            timeout_secs: 10,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Environment variables:
/// - `QDRANT_URL` (required; unset means no vector store is configured)
/// - `QDRANT_API_KEY` (optional)
/// - `QDRANT_COLLECTION` (default `file_embeddings`)
/// - `QDRANT_TIMEOUT_SECS` (default 10)
impl FromEnv for QdrantConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_required("QDRANT_URL")?,
            api_key: env_optional("QDRANT_API_KEY"),
            collection: env_or_default("QDRANT_COLLECTION", DEFAULT_COLLECTION),
            timeout_secs: env_parse_or("QDRANT_TIMEOUT_SECS", 10)?,
        })
    }
}
