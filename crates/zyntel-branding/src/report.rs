use std::path::PathBuf;

use crate::error::BrandingError;

#[derive(Debug)]
pub struct OutputFailure {
    /// The source or output file the failure is about.
    pub target: PathBuf,
    pub error: BrandingError,
}

/// Outcome of one branding job. Failures are collected, never raised, so a
/// broken source does not stop sibling outputs.
#[derive(Debug, Default)]
pub struct BrandingReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<OutputFailure>,
}

impl BrandingReport {
    pub fn fail(&mut self, target: impl Into<PathBuf>, error: BrandingError) {
        self.failures.push(OutputFailure {
            target: target.into(),
            error,
        });
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn merge(&mut self, other: BrandingReport) {
        self.written.extend(other.written);
        self.failures.extend(other.failures);
    }
}
