//! Environment-driven configuration for the importer.
//!
//! Values are resolved through a lookup function so tests can supply a map
//! instead of mutating the process environment.

use std::path::PathBuf;

use thiserror::Error;
use zyntel_bucket::S3Config;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const DATABASE_URL_FALLBACK: &str = "ZYNTEL_DATABASE_URL";
pub const R2_ACCESS_KEY_ID: &str = "R2_ACCESS_KEY_ID";
pub const R2_SECRET_ACCESS_KEY: &str = "R2_SECRET_ACCESS_KEY";
pub const R2_ENDPOINT_URL: &str = "R2_ENDPOINT_URL";
pub const R2_BUCKET_NAME: &str = "R2_BUCKET_NAME";
pub const R2_REGION: &str = "R2_REGION";
pub const DATA_DIR: &str = "ZYNTEL_DATA_DIR";

const DEFAULT_DATA_DIR: &str = "./data";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingVar(&'static str),
    #[error("bucket configuration is incomplete; missing {}", .0.join(", "))]
    IncompleteBucket(Vec<&'static str>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        non_empty(&lookup, DATABASE_URL)
            .or_else(|| non_empty(&lookup, DATABASE_URL_FALLBACK))
            .map(|url| Self { url })
            .ok_or(ConfigError::MissingVar(DATABASE_URL))
    }
}

/// Credentials and location of the R2 bucket holding the seed files.
#[derive(Clone, PartialEq, Eq)]
pub struct BucketConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint_url: String,
    pub bucket: String,
    pub region: String,
}

impl std::fmt::Debug for BucketConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketConfig")
            .field("endpoint_url", &self.endpoint_url)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl BucketConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = [
            R2_ACCESS_KEY_ID,
            R2_SECRET_ACCESS_KEY,
            R2_ENDPOINT_URL,
            R2_BUCKET_NAME,
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .copied()
            .filter(|name| non_empty(&lookup, name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::IncompleteBucket(missing));
        }

        let get = |name: &'static str| {
            non_empty(&lookup, name).ok_or(ConfigError::MissingVar(name))
        };
        Ok(Self {
            access_key_id: get(R2_ACCESS_KEY_ID)?,
            secret_access_key: get(R2_SECRET_ACCESS_KEY)?,
            endpoint_url: get(R2_ENDPOINT_URL)?,
            bucket: get(R2_BUCKET_NAME)?,
            region: non_empty(&lookup, R2_REGION).unwrap_or_else(|| "auto".to_string()),
        })
    }

    pub fn to_s3_config(&self) -> S3Config {
        S3Config {
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            endpoint: Some(self.endpoint_url.clone()),
            access_key_id: Some(self.access_key_id.clone()),
            secret_access_key: Some(self.secret_access_key.clone()),
            force_path_style: true,
        }
    }
}

pub fn data_dir_from_env() -> PathBuf {
    data_dir_from_lookup(env_lookup)
}

pub fn data_dir_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    non_empty(&lookup, DATA_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
