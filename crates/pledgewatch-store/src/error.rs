use pledgewatch_core::UnknownVariant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    /// A compare-and-set lost to a concurrent writer or hit an existing key.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("stored value is invalid: {0}")]
    Corrupt(String),

    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot format error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported column type for {column}: {data_type}")]
    UnsupportedColumn { column: String, data_type: String },

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("{0}")]
    Other(String),
}

impl From<UnknownVariant> for StoreError {
    fn from(e: UnknownVariant) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

impl From<chrono::ParseError> for StoreError {
    fn from(e: chrono::ParseError) -> Self {
        StoreError::Corrupt(format!("bad date: {e}"))
    }
}
