//! Installer artwork and favicon generation from the brand PNGs.

pub mod canvas;
pub mod config;
pub mod error;
pub mod favicon;
pub mod report;
pub mod wizard;

pub use canvas::{compute_fit, fit_on_canvas, flatten_alpha, parse_hex_color};
pub use config::BrandingFile;
pub use error::BrandingError;
pub use favicon::{render_favicon, FaviconConfig, FAVICON_SIZES};
pub use report::{BrandingReport, OutputFailure};
pub use wizard::{render_wizard_images, WizardConfig, WizardTarget};
