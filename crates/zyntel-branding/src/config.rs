//! `branding.toml`: optional `[wizard]` and `[favicon]` tables.
//!
//! Relative paths are resolved against the directory holding the file, so a
//! config checked in next to the artwork works from any working directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::canvas::parse_hex_color;
use crate::error::BrandingError;
use crate::favicon::FaviconConfig;
use crate::wizard::{WizardConfig, WizardTarget};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrandingFile {
    pub wizard: Option<WizardSection>,
    pub favicon: Option<FaviconSection>,
    #[serde(skip)]
    base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WizardSection {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub background: Option<String>,
    #[serde(default)]
    pub targets: Vec<TargetSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSection {
    pub size: u32,
    pub file_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FaviconSection {
    pub output: PathBuf,
    #[serde(default)]
    pub light: Vec<PathBuf>,
    #[serde(default)]
    pub dark: Vec<PathBuf>,
    pub sizes: Option<Vec<u32>>,
}

impl BrandingFile {
    pub fn load(path: &Path) -> Result<Self, BrandingError> {
        let text = fs::read_to_string(path).map_err(|source| BrandingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::parse(&text, base_dir).map_err(|source| BrandingError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self, toml::de::Error> {
        let mut file: BrandingFile = toml::from_str(text)?;
        file.base_dir = base_dir.into();
        Ok(file)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn wizard_config(&self) -> Result<Option<WizardConfig>, BrandingError> {
        let Some(section) = &self.wizard else {
            return Ok(None);
        };

        let mut config = WizardConfig::new(
            self.resolve(&section.input),
            self.resolve(&section.output_dir),
        );
        if let Some(background) = &section.background {
            config.background = parse_hex_color(background)?;
        }
        if !section.targets.is_empty() {
            config.targets = section
                .targets
                .iter()
                .map(|t| WizardTarget::new(t.size, t.file_name.clone()))
                .collect();
        }
        Ok(Some(config))
    }

    pub fn favicon_config(&self) -> Option<FaviconConfig> {
        let section = self.favicon.as_ref()?;
        let mut config = FaviconConfig::new(self.resolve(&section.output))
            .with_light(section.light.iter().map(|p| self.resolve(p)))
            .with_dark(section.dark.iter().map(|p| self.resolve(p)));
        if let Some(sizes) = &section.sizes {
            config.sizes = sizes.clone();
        }
        Some(config)
    }
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;
    use crate::favicon::FAVICON_SIZES;

    const FULL: &str = r##"
[wizard]
input = "brand/logo.png"
output_dir = "/tmp/installer"
background = "#102030"

[favicon]
output = "public/favicon.ico"
light = ["brand/light.png"]
dark = ["brand/dark.png", "brand/dark-alt.png"]
"##;

    #[test]
    fn relative_paths_resolve_against_the_config_directory() {
        let file = BrandingFile::parse(FULL, "/srv/app").unwrap();

        let wizard = file.wizard_config().unwrap().unwrap();
        assert_eq!(wizard.input, PathBuf::from("/srv/app/brand/logo.png"));
        assert_eq!(wizard.output_dir, PathBuf::from("/tmp/installer"));
        assert_eq!(wizard.background, Rgb([0x10, 0x20, 0x30]));
        assert_eq!(wizard.targets, WizardTarget::defaults());

        let favicon = file.favicon_config().unwrap();
        assert_eq!(favicon.output, PathBuf::from("/srv/app/public/favicon.ico"));
        assert_eq!(favicon.light, vec![PathBuf::from("/srv/app/brand/light.png")]);
        assert_eq!(favicon.dark.len(), 2);
        assert_eq!(favicon.sizes, FAVICON_SIZES.to_vec());
    }

    #[test]
    fn sections_are_optional() {
        let file = BrandingFile::parse("", ".").unwrap();
        assert!(file.wizard_config().unwrap().is_none());
        assert!(file.favicon_config().is_none());
    }

    #[test]
    fn custom_targets_and_sizes_replace_the_defaults() {
        let text = r#"
[wizard]
input = "logo.png"
output_dir = "out"
targets = [{ size = 55, file_name = "Banner.bmp" }]

[favicon]
output = "favicon.ico"
light = ["a.png"]
sizes = [16, 32]
"#;
        let file = BrandingFile::parse(text, "").unwrap();

        let wizard = file.wizard_config().unwrap().unwrap();
        assert_eq!(wizard.targets, vec![WizardTarget::new(55, "Banner.bmp")]);
        assert_eq!(wizard.background, Rgb([0, 0, 0]));
        assert_eq!(file.favicon_config().unwrap().sizes, vec![16, 32]);
    }

    #[test]
    fn bad_background_is_rejected() {
        let text = "[wizard]\ninput = \"a.png\"\noutput_dir = \"out\"\nbackground = \"black\"\n";
        let file = BrandingFile::parse(text, "").unwrap();
        assert!(matches!(
            file.wizard_config(),
            Err(BrandingError::InvalidColor(_))
        ));
    }

    #[test]
    fn unknown_keys_fail_to_parse() {
        assert!(BrandingFile::parse("[wizard]\nsource = \"a.png\"\n", "").is_err());
    }
}
