use std::path::PathBuf;

use image::ImageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrandingError {
    #[error("source image not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("target size {size} is outside {min}..={max}")]
    InvalidSize { size: u32, min: u32, max: u32 },

    #[error("invalid colour {0:?}; expected #rgb or #rrggbb")]
    InvalidColor(String),

    #[error("no source image could be processed for {}", .0.display())]
    NoFrames(PathBuf),

    #[error("invalid branding config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
