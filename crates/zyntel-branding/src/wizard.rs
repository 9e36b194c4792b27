//! Installer wizard bitmaps.
//!
//! Installers render BMP without an alpha channel, so the source is
//! flattened onto the backing colour once and each target is fitted from
//! that flattened copy.

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgb};
use tracing::{error, info};

use crate::canvas::{check_size, fit_on_canvas, flatten_alpha};
use crate::error::BrandingError;
use crate::report::BrandingReport;

const MAX_WIZARD_SIZE: u32 = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardTarget {
    pub size: u32,
    pub file_name: String,
}

impl WizardTarget {
    pub fn new(size: u32, file_name: impl Into<String>) -> Self {
        Self {
            size,
            file_name: file_name.into(),
        }
    }

    pub fn defaults() -> Vec<WizardTarget> {
        vec![
            WizardTarget::new(192, "WizardImage.bmp"),
            WizardTarget::new(96, "WizardSmallImage.bmp"),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct WizardConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub background: Rgb<u8>,
    pub targets: Vec<WizardTarget>,
}

impl WizardConfig {
    /// Default targets on a black backing.
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            background: Rgb([0, 0, 0]),
            targets: WizardTarget::defaults(),
        }
    }

    pub fn with_background(mut self, background: Rgb<u8>) -> Self {
        self.background = background;
        self
    }
}

pub fn render_wizard_images(config: &WizardConfig) -> BrandingReport {
    let mut report = BrandingReport::default();

    if !config.input.is_file() {
        error!(path = %config.input.display(), "Wizard source image not found");
        report.fail(&config.input, BrandingError::SourceMissing(config.input.clone()));
        return report;
    }

    let source = match image::open(&config.input) {
        Ok(image) => image,
        Err(source) => {
            error!(
                path = %config.input.display(),
                error = %source,
                "Failed to decode wizard source"
            );
            report.fail(
                &config.input,
                BrandingError::Decode {
                    path: config.input.clone(),
                    source,
                },
            );
            return report;
        }
    };

    if let Err(source) = fs::create_dir_all(&config.output_dir) {
        error!(
            path = %config.output_dir.display(),
            error = %source,
            "Failed to create output directory"
        );
        report.fail(
            &config.output_dir,
            BrandingError::Io {
                path: config.output_dir.clone(),
                source,
            },
        );
        return report;
    }

    let flattened = flatten_alpha(&source, config.background);

    for target in &config.targets {
        let output = config.output_dir.join(&target.file_name);
        match write_target(&flattened, target, &output, config.background) {
            Ok(()) => {
                info!(path = %output.display(), size = target.size, "Wrote wizard image");
                report.written.push(output);
            }
            Err(err) => {
                error!(path = %output.display(), error = %err, "Failed to write wizard image");
                report.fail(output, err);
            }
        }
    }

    report
}

fn write_target(
    flattened: &image::RgbImage,
    target: &WizardTarget,
    output: &Path,
    background: Rgb<u8>,
) -> Result<(), BrandingError> {
    let size = check_size(target.size, 1, MAX_WIZARD_SIZE)?;
    let canvas = fit_on_canvas(flattened, size, background);
    canvas
        .save_with_format(output, ImageFormat::Bmp)
        .map_err(|source| BrandingError::Encode {
            path: output.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use image::{ColorType, Rgba, RgbaImage};
    use tempfile::tempdir;

    use super::*;

    fn write_logo(path: &Path) {
        // Opaque white bar on a transparent 300x120 field.
        let mut logo = RgbaImage::from_pixel(300, 120, Rgba([0, 0, 0, 0]));
        for y in 40..80 {
            for x in 0..300 {
                logo.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        logo.save(path).unwrap();
    }

    #[test]
    fn writes_both_bitmaps_at_exact_sizes() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("logo.png");
        write_logo(&input);
        let output_dir = dir.path().join("installer");

        let report = render_wizard_images(&WizardConfig::new(&input, &output_dir));

        assert!(report.is_clean(), "{:?}", report.failures);
        assert_eq!(report.written.len(), 2);

        let large = image::open(output_dir.join("WizardImage.bmp")).unwrap();
        let small = image::open(output_dir.join("WizardSmallImage.bmp")).unwrap();
        assert_eq!((large.width(), large.height()), (192, 192));
        assert_eq!((small.width(), small.height()), (96, 96));
    }

    #[test]
    fn bitmaps_carry_no_transparency() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("logo.png");
        write_logo(&input);

        let config = WizardConfig::new(&input, dir.path()).with_background(Rgb([0, 0, 128]));
        let report = render_wizard_images(&config);
        assert!(report.is_clean());

        let bmp = image::open(dir.path().join("WizardImage.bmp")).unwrap();
        assert_eq!(bmp.color(), ColorType::Rgb8);
        let rgb = bmp.to_rgb8();
        assert_eq!(*rgb.get_pixel(0, 0), Rgb([0, 0, 128]));
        assert_eq!(*rgb.get_pixel(96, 96), Rgb([255, 255, 255]));
    }

    #[test]
    fn missing_source_is_reported_not_raised() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("absent.png");

        let report = render_wizard_images(&WizardConfig::new(&input, dir.path()));

        assert!(report.written.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            BrandingError::SourceMissing(_)
        ));
    }

    #[test]
    fn bad_target_does_not_block_the_others() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("logo.png");
        write_logo(&input);

        let mut config = WizardConfig::new(&input, dir.path());
        config.targets.insert(0, WizardTarget::new(0, "Broken.bmp"));
        let report = render_wizard_images(&config);

        assert_eq!(report.written.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            BrandingError::InvalidSize { size: 0, .. }
        ));
        assert!(!dir.path().join("Broken.bmp").exists());
    }
}
