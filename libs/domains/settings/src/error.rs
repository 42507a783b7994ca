use thiserror::Error;

/// Settings store errors.
///
/// Display strings are the user-facing messages shown by the admin UI.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SettingsError {
    #[error("参数错误: {0}")]
    InvalidParameter(String),

    #[error("验证失败: {0}")]
    ValidationFailed(String),

    #[error("设置不存在: {0}")]
    NotFound(String),

    #[error("设置键名已存在: {0}")]
    Duplicate(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("查询设置失败: {0}")]
    DbQuery(String),

    #[error("更新设置失败: {0}")]
    DbUpdate(String),

    #[error("创建设置失败: {0}")]
    DbCreate(String),

    #[error("删除设置失败: {0}")]
    DbDelete(String),

    #[error("提交事务失败: {0}")]
    DbCommit(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl SettingsError {
    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::ValidationFailed(_) => "validation_failed",
            Self::NotFound(_) => "not_found",
            Self::Duplicate(_) => "duplicate",
            Self::Forbidden(_) => "forbidden",
            Self::DbQuery(_) => "db_query_failed",
            Self::DbUpdate(_) => "db_update_failed",
            Self::DbCreate(_) => "db_create_failed",
            Self::DbDelete(_) => "db_delete_failed",
            Self::DbCommit(_) => "db_commit_failed",
            Self::Internal(_) => "internal",
        }
    }

    /// True for failures of the underlying store rather than of the input
    pub fn is_database(&self) -> bool {
        matches!(
            self,
            Self::DbQuery(_) | Self::DbUpdate(_) | Self::DbCreate(_) | Self::DbDelete(_) | Self::DbCommit(_)
        )
    }
}

pub type SettingsResult<T> = Result<T, SettingsError>;
