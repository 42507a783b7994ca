use domain_settings::SettingsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Vector job not found for file {0}")]
    NotFound(i32),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Database query failed: {0}")]
    DbQuery(String),

    #[error("Database update failed: {0}")]
    DbUpdate(String),

    #[error("Database delete failed: {0}")]
    DbDelete(String),

    #[error("Vector collection missing: {0}")]
    CollectionMissing(String),

    #[error("Vector store timed out after {0}s")]
    ExternalTimeout(u64),

    #[error("Vector store connection failed: {0}")]
    ExternalConnection(String),

    #[error("Vector store authentication failed: {0}")]
    ExternalAuth(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VectorError {
    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid_parameter",
            Self::NotFound(_) => "not_found",
            Self::Settings(e) => e.kind(),
            Self::DbQuery(_) => "db_query_failed",
            Self::DbUpdate(_) => "db_update_failed",
            Self::DbDelete(_) => "db_delete_failed",
            Self::CollectionMissing(_) => "not_found",
            Self::ExternalTimeout(_) => "external_timeout",
            Self::ExternalConnection(_) => "external_connection_failed",
            Self::ExternalAuth(_) => "external_auth_failed",
            Self::Internal(_) => "internal",
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::ExternalTimeout(_) | Self::ExternalConnection(_) | Self::ExternalAuth(_)
        )
    }
}

pub type VectorResult<T> = Result<T, VectorError>;

impl From<qdrant_client::QdrantError> for VectorError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        classify_qdrant_message(err.to_string())
    }
}

/// Map a Qdrant error message onto an error kind
fn classify_qdrant_message(message: String) -> VectorError {
    let lower = message.to_ascii_lowercase();

    if lower.contains("collection") && (lower.contains("not found") || lower.contains("doesn't exist")) {
        VectorError::CollectionMissing(message)
    } else if ["unauthenticated", "permission denied", "api key", "forbidden", "401", "403"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        VectorError::ExternalAuth(message)
    } else if ["transport", "connect", "unavailable", "refused", "dns", "broken pipe"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        VectorError::ExternalConnection(message)
    } else {
        VectorError::Internal(format!("Qdrant error: {}", message))
    }
}
