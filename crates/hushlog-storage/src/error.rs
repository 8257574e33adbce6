use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("query record not found: {id}")]
    NotFound { id: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid row in {table}: {reason}")]
    Decode { table: &'static str, reason: String },
}
