use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;
use zyntel_bucket::{BucketError, BucketStore};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} does not exist")]
    NotFound(String),
    #[error("failed to read {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("bucket error reading {location}: {source}")]
    Bucket {
        location: String,
        #[source]
        source: BucketError,
    },
}

/// Resolves a logical seed file key (`meta.csv`, `data.json`, ...) to bytes.
#[async_trait]
pub trait SourceReader: Send + Sync {
    async fn read(&self, key: &str) -> Result<Bytes, SourceError>;

    fn location(&self, key: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl SourceReader for LocalSource {
    async fn read(&self, key: &str) -> Result<Bytes, SourceError> {
        let path = self.root.join(key);
        let location = path.display().to_string();
        match std::fs::read(&path) {
            Ok(contents) => {
                info!(%location, bytes = contents.len(), "Read seed file");
                Ok(Bytes::from(contents))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(SourceError::NotFound(location))
            }
            Err(source) => Err(SourceError::Io { location, source }),
        }
    }

    fn location(&self, key: &str) -> String {
        self.root.join(key).display().to_string()
    }
}

#[derive(Clone)]
pub struct BucketSource {
    store: Arc<dyn BucketStore>,
}

impl BucketSource {
    pub fn new(store: Arc<dyn BucketStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SourceReader for BucketSource {
    async fn read(&self, key: &str) -> Result<Bytes, SourceError> {
        let location = self.store.location(key);
        match self.store.get_object(key).await {
            Ok(contents) => {
                info!(%location, bytes = contents.len(), "Downloaded seed file");
                Ok(contents)
            }
            Err(BucketError::NotFound(_)) => Err(SourceError::NotFound(location)),
            Err(source) => Err(SourceError::Bucket { location, source }),
        }
    }

    fn location(&self, key: &str) -> String {
        self.store.location(key)
    }
}
