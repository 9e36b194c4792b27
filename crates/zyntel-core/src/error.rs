// crates/zyntel-core/src/error.rs

use thiserror::Error;

use crate::source::SourceError;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Source read failed: {0}")]
    Source(#[from] SourceError),

    #[error("{key} is not valid UTF-8")]
    Utf8 { key: String },

    #[error("CSV parsing error in {key}: {source}")]
    Csv {
        key: String,
        #[source]
        source: csv::Error,
    },

    #[error("JSON parsing error in {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{key} must contain a JSON array of objects")]
    JsonShape { key: String },
}

pub type Result<T> = std::result::Result<T, ImportError>;
