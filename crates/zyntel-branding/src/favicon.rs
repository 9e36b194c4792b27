//! Multi-resolution favicon.
//!
//! Every readable source contributes one PNG-compressed frame per size to a
//! single `.ico`. Frames keep their alpha channel and are padded onto a
//! transparent square.

use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::ico::{IcoEncoder, IcoFrame};
use image::{ExtendedColorType, Rgba, RgbaImage};
use tracing::{debug, error, info, warn};

use crate::canvas::{check_size, fit_on_canvas};
use crate::error::BrandingError;
use crate::report::BrandingReport;

pub const FAVICON_SIZES: [u32; 10] = [16, 24, 32, 48, 64, 72, 96, 128, 192, 256];

/// ICO directory entries store each side in a single byte (0 meaning 256).
const MAX_ICO_SIZE: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

#[derive(Debug, Clone)]
pub struct FaviconConfig {
    pub output: PathBuf,
    pub light: Vec<PathBuf>,
    pub dark: Vec<PathBuf>,
    pub sizes: Vec<u32>,
}

impl FaviconConfig {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            light: Vec::new(),
            dark: Vec::new(),
            sizes: FAVICON_SIZES.to_vec(),
        }
    }

    pub fn with_light(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.light.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_dark(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.dark.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Light sources first, then dark; a path listed twice is used once.
    fn sources(&self) -> Vec<(Theme, &Path)> {
        let mut seen = HashSet::new();
        self.light
            .iter()
            .map(|p| (Theme::Light, p.as_path()))
            .chain(self.dark.iter().map(|p| (Theme::Dark, p.as_path())))
            .filter(|(_, path)| seen.insert(*path))
            .collect()
    }
}

pub fn render_favicon(config: &FaviconConfig) -> BrandingReport {
    let mut report = BrandingReport::default();

    let mut sizes = Vec::with_capacity(config.sizes.len());
    for &size in &config.sizes {
        match check_size(size, 1, MAX_ICO_SIZE) {
            Ok(size) => sizes.push(size),
            Err(err) => {
                warn!(size, "Skipping favicon size outside the ICO range");
                report.fail(&config.output, err);
            }
        }
    }

    let mut frames = Vec::new();
    for (theme, path) in config.sources() {
        match load_source(path) {
            Ok(source) => {
                for &size in &sizes {
                    match encode_frame(&source, size) {
                        Ok(frame) => frames.push(frame),
                        Err(err) => {
                            error!(
                                %theme,
                                path = %path.display(),
                                size,
                                error = %err,
                                "Failed to encode favicon frame"
                            );
                            report.fail(path, err);
                        }
                    }
                }
                debug!(%theme, path = %path.display(), "Processed favicon source");
            }
            Err(err) => {
                warn!(%theme, path = %path.display(), error = %err, "Skipping favicon source");
                report.fail(path, err);
            }
        }
    }

    if frames.is_empty() {
        error!(path = %config.output.display(), "No favicon frames to write");
        report.fail(&config.output, BrandingError::NoFrames(config.output.clone()));
        return report;
    }

    match write_ico(&config.output, &frames) {
        Ok(()) => {
            info!(path = %config.output.display(), frames = frames.len(), "Wrote favicon");
            report.written.push(config.output.clone());
        }
        Err(err) => {
            error!(path = %config.output.display(), error = %err, "Failed to write favicon");
            report.fail(&config.output, err);
        }
    }

    report
}

fn load_source(path: &Path) -> Result<RgbaImage, BrandingError> {
    if !path.is_file() {
        return Err(BrandingError::SourceMissing(path.to_path_buf()));
    }
    let image = image::open(path).map_err(|source| BrandingError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgba8())
}

fn encode_frame(source: &RgbaImage, size: u32) -> Result<IcoFrame<'static>, BrandingError> {
    let canvas = fit_on_canvas(source, size, Rgba([0, 0, 0, 0]));
    IcoFrame::as_png(canvas.as_raw(), size, size, ExtendedColorType::Rgba8).map_err(|source| {
        BrandingError::Encode {
            path: PathBuf::from(format!("{size}x{size} frame")),
            source,
        }
    })
}

fn write_ico(output: &Path, frames: &[IcoFrame<'_>]) -> Result<(), BrandingError> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| BrandingError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = File::create(output).map_err(|source| BrandingError::Io {
        path: output.to_path_buf(),
        source,
    })?;

    let mut writer = BufWriter::new(file);
    IcoEncoder::new(&mut writer)
        .encode_images(frames)
        .map_err(|source| BrandingError::Encode {
            path: output.to_path_buf(),
            source,
        })?;
    // Buffered bytes only reach the file here; a drop would discard the error.
    writer.flush().map_err(|source| BrandingError::Io {
        path: output.to_path_buf(),
        source,
    })
}
