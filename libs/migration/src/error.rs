use domain_settings::SettingsError;
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Migration error: {0}")]
    Internal(String),
}

pub type MigrationResult<T> = Result<T, MigrationError>;
