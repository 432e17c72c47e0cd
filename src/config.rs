//! Validator configuration
//!
//! Archive limits have no built-in defaults: what counts as a safe
//! compression factor or maximum size depends on the caller's trust model,
//! so they must be supplied explicitly (file, environment or CLI flags).

use serde::{Deserialize, Serialize};
use std::env;
use std::fs::File;
use std::path::Path;

use crate::error::{ProcessingError, Result};

/// Zip-bomb thresholds applied to every archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArchiveLimits {
    /// Maximum allowed `uncompressed / compressed` ratio per entry
    pub max_compression_factor: f64,
    /// Maximum allowed uncompressed size per entry in bytes
    pub max_uncompressed_size: u64,
}

impl ArchiveLimits {
    pub fn new(max_compression_factor: f64, max_uncompressed_size: u64) -> Result<Self> {
        if !(max_compression_factor.is_finite() && max_compression_factor > 0.0) {
            return Err(ProcessingError::Config(format!(
                "maximum compression factor must be a positive number, got {}",
                max_compression_factor
            )));
        }
        if max_uncompressed_size == 0 {
            return Err(ProcessingError::Config(
                "maximum uncompressed size must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            max_compression_factor,
            max_uncompressed_size,
        })
    }
}

fn default_check_pdf() -> bool {
    true
}

/// Container nesting depth accepted when no explicit limit is configured
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 8;

fn default_max_nesting_depth() -> usize {
    DEFAULT_MAX_NESTING_DEPTH
}

/// Read-only settings shared by all validation stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub limits: ArchiveLimits,
    /// Report borderline omissions as errors instead of warnings
    #[serde(default)]
    pub strict: bool,
    /// Run PDF/A detection on PDF digital files
    #[serde(default = "default_check_pdf")]
    pub check_pdf: bool,
    /// Maximum container nesting depth before a node is rejected
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
}

impl ValidatorConfig {
    pub fn new(limits: ArchiveLimits) -> Self {
        Self {
            limits,
            strict: false,
            check_pdf: default_check_pdf(),
            max_nesting_depth: default_max_nesting_depth(),
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn check_pdf(mut self, check_pdf: bool) -> Self {
        self.check_pdf = check_pdf;
        self
    }

    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let config: ValidatorConfig = serde_json::from_reader(file).map_err(|e| {
            ProcessingError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        // Re-run the limit checks, serde bypasses the constructor
        ArchiveLimits::new(
            config.limits.max_compression_factor,
            config.limits.max_uncompressed_size,
        )?;
        Ok(config)
    }

    /// Build a configuration from `VDI2770_*` environment variables.
    ///
    /// Returns `Ok(None)` when the archive limits are not set.
    pub fn from_env() -> Result<Option<Self>> {
        let factor = env::var("VDI2770_MAX_COMPRESSION_FACTOR").ok();
        let size = env::var("VDI2770_MAX_UNCOMPRESSED_SIZE").ok();

        let (factor, size) = match (factor, size) {
            (Some(f), Some(s)) => (f, s),
            _ => return Ok(None),
        };

        let factor: f64 = factor.trim().parse().map_err(|_| {
            ProcessingError::Config(format!("VDI2770_MAX_COMPRESSION_FACTOR is not a number: {}", factor))
        })?;
        let size: u64 = size.trim().parse().map_err(|_| {
            ProcessingError::Config(format!("VDI2770_MAX_UNCOMPRESSED_SIZE is not a number: {}", size))
        })?;

        let strict = env::var("VDI2770_STRICT")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Some(Self::new(ArchiveLimits::new(factor, size)?).strict(strict)))
    }
}
