//! Read access to the S3-compatible bucket (Cloudflare R2 in production) that
//! holds the seed files for the importer.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::Client;
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: "zyntel-patient-data".to_string(),
            // R2 ignores the region but the SDK insists on one.
            region: "auto".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum BucketError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("sdk error: {0}")]
    Sdk(String),
    #[error("object not found: {0}")]
    NotFound(String),
}

impl BucketError {
    fn from_sdk(err: impl fmt::Display) -> Self {
        Self::Sdk(err.to_string())
    }
}

#[async_trait]
pub trait BucketStore: Send + Sync {
    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError>;

    /// Human-readable location used in log lines.
    fn location(&self, key: &str) -> String;
}

#[derive(Clone)]
pub struct S3BucketStore {
    client: Client,
    bucket: String,
}

impl S3Config {
    /// Static keys must come as a pair. `None` defers to the ambient AWS
    /// credential chain.
    fn static_credentials(&self) -> Result<Option<Credentials>, BucketError> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(access_key), Some(secret_key)) => Ok(Some(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "zyntel-r2",
            ))),
            (None, None) => Ok(None),
            _ => Err(BucketError::Configuration(
                "access key id and secret access key must be set together".into(),
            )),
        }
    }
}

impl S3BucketStore {
    pub async fn new(config: S3Config) -> Result<Self, BucketError> {
        if config.bucket.trim().is_empty() {
            return Err(BucketError::Configuration(
                "bucket name cannot be empty".into(),
            ));
        }

        // R2 is always reached with explicit keys, so the environment and
        // profile lookups of the default chain are only used without them.
        let mut builder = match config.static_credentials()? {
            Some(credentials) => aws_sdk_s3::config::Builder::new()
                .behavior_version(BehaviorVersion::latest())
                .credentials_provider(credentials),
            None => {
                let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        };

        builder.set_endpoint_url(config.endpoint.clone());
        let s3_config = builder
            .region(Region::new(config.region.clone()))
            .force_path_style(config.force_path_style)
            .build();

        info!(
            bucket = %config.bucket,
            endpoint = config.endpoint.as_deref().unwrap_or("aws"),
            region = %config.region,
            "Bucket client configured"
        );
        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket,
        })
    }
}

#[async_trait]
impl BucketStore for S3BucketStore {
    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError> {
        debug!(bucket = %self.bucket, key, "fetching object");
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match err {
                SdkError::ServiceError(service_err) => {
                    if service_err.err().is_no_such_key() {
                        BucketError::NotFound(key.to_string())
                    } else {
                        BucketError::from_sdk(service_err.err())
                    }
                }
                other => BucketError::from_sdk(other),
            })?;

        let data = output.body.collect().await.map_err(BucketError::from_sdk)?;
        Ok(data.into_bytes())
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

/// Bucket backed by a map, for wiring the importer without network access.
#[derive(Debug, Clone, Default)]
pub struct MemoryBucketStore {
    name: String,
    objects: HashMap<String, Bytes>,
}

impl MemoryBucketStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, contents: impl Into<Bytes>) {
        self.objects.insert(key.into(), contents.into());
    }

    pub fn with_object(mut self, key: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        self.insert(key, contents);
        self
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError> {
        self.objects
            .get(key)
            .cloned()
            .ok_or_else(|| BucketError::NotFound(key.to_string()))
    }

    fn location(&self, key: &str) -> String {
        format!("memory://{}/{}", self.name, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_returns_inserted_object() {
        let store = MemoryBucketStore::new("seed").with_object("meta.csv", "TestName,TAT\n");

        let bytes = store.get_object("meta.csv").await.unwrap();
        assert_eq!(&bytes[..], b"TestName,TAT\n");
        assert_eq!(store.location("meta.csv"), "memory://seed/meta.csv");
    }

    #[tokio::test]
    async fn memory_store_reports_missing_keys() {
        let store = MemoryBucketStore::new("seed");

        match store.get_object("data.json").await {
            Err(BucketError::NotFound(key)) => assert_eq!(key, "data.json"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn s3_store_rejects_empty_bucket_name() {
        let config = S3Config {
            bucket: String::new(),
            ..S3Config::default()
        };

        assert!(matches!(
            S3BucketStore::new(config).await,
            Err(BucketError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn s3_store_rejects_half_configured_keys() {
        let config = S3Config {
            access_key_id: Some("key-id".into()),
            ..S3Config::default()
        };

        assert!(matches!(
            S3BucketStore::new(config).await,
            Err(BucketError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn s3_store_builds_offline_with_static_r2_keys() {
        let config = S3Config {
            endpoint: Some("https://account.r2.cloudflarestorage.com".into()),
            access_key_id: Some("key-id".into()),
            secret_access_key: Some("secret".into()),
            ..S3Config::default()
        };

        let store = S3BucketStore::new(config).await.unwrap();
        assert_eq!(
            store.location("meta.csv"),
            "s3://zyntel-patient-data/meta.csv"
        );
    }
}
