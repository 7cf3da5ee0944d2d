use std::time::Duration;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Corrupted record: {0}")]
    CorruptRecord(#[from] serde_json::Error),

    #[error("Database operation exceeded {0:?}")]
    QueryTimeout(Duration),
}
