//! Well-known groups and keys read by other subsystems.

pub mod groups {
    pub const WEBSITE: &str = "website";
    pub const WEBSITE_INFO: &str = "website_info";
    pub const REGISTRATION: &str = "registration";
    pub const AI: &str = "ai";
    pub const MAIL: &str = "mail";
    pub const UPLOAD: &str = "upload";
    pub const THEME: &str = "theme";
    pub const GUEST: &str = "guest";
    pub const SECURITY: &str = "security";
    pub const VECTOR: &str = "vector";
    pub const VERSION: &str = "version";
    pub const APPEARANCE: &str = "appearance";
    pub const ANNOUNCEMENT: &str = "announcement";
    pub const LEGAL: &str = "legal";

    /// Hooks registered here run for every group
    pub const WILDCARD: &str = "";
}

pub const SITE_BASE_URL: &str = "site_base_url";
pub const JWT_SECRET: &str = "jwt_secret";
pub const INTERNAL_API_TOKEN: &str = "internal_api_token";

pub const PENDING_STUCK_THRESHOLD_MINUTES: &str = "pending_stuck_threshold_minutes";

pub const VECTOR_AUTO_PROCESSING_ENABLED: &str = "vector_auto_processing_enabled";
pub const VECTOR_CONCURRENCY: &str = "vector_concurrency";
pub const VECTOR_MAX_RETRY_COUNT: &str = "vector_max_retry_count";
pub const EMBEDDING_MODEL: &str = "embedding_model";
pub const EMBEDDING_DIMENSION: &str = "embedding_dimension";
