use sea_orm::{DbErr, SqlErr};

/// Errors raised by the hero storage gateway.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The targeted row does not exist.
    #[error("record not found: {0}")]
    NotFound(String),
    /// A unique constraint rejected the write.
    #[error("duplicate record: {0}")]
    Duplicate(String),
    #[error("database error: {0}")]
    Database(DbErr),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => Self::Duplicate(detail),
            _ => Self::Database(err),
        }
    }
}
