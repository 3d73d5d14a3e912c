use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{NInit, ResampleFilter};

/// Pixel budget of a normalized image: 1088 x 1088.
pub const MAX_PIXELS: u64 = 1088 * 1088;
/// Both output dimensions are multiples of this.
pub const GRID_ALIGN: u32 = 32;

/// Normalization parameters suitable for config files and CLI overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeParams {
    pub max_pixels: u64,
    /// Longer side cap applied when an image exceeds `max_pixels`
    pub max_long_side: u32,
    pub align: u32,
    /// Images below `undersize_fraction * max_pixels` are quarantined and later swept
    pub undersize_fraction: f64,
    pub seed: u64,
    pub n_init: NInit,
    pub max_iter: usize,
    pub tolerance: f64,
    pub jpeg_quality: u8,
    pub target_extension: String,
    pub report_extension: String,
    pub report_name: String,
    pub quarantine_dir_name: String,
    pub high_loss_threshold: f64,
    pub high_loss_top: usize,
    /// Worker count for both pools; None means one per core
    pub threads: Option<usize>,
    pub filter: ResampleFilter,
    pub dry_run: bool,
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self {
            max_pixels: MAX_PIXELS,
            max_long_side: 1088,
            align: GRID_ALIGN,
            undersize_fraction: 0.85,
            seed: 0,
            n_init: NInit::Auto,
            max_iter: 300,
            tolerance: 1e-4,
            jpeg_quality: 100,
            target_extension: "jpg".to_string(),
            report_extension: "txt".to_string(),
            report_name: "statistics".to_string(),
            quarantine_dir_name: "small_images".to_string(),
            high_loss_threshold: 0.10,
            high_loss_top: 10,
            threads: None,
            filter: ResampleFilter::Lanczos3,
            dry_run: false,
        }
    }
}

impl NormalizeParams {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let params: NormalizeParams = serde_json::from_str(&raw)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_pixels == 0 {
            return Err(invalid("max_pixels", self.max_pixels));
        }
        if self.max_long_side == 0 {
            return Err(invalid("max_long_side", self.max_long_side));
        }
        if self.align == 0 {
            return Err(invalid("align", self.align));
        }
        if !(self.undersize_fraction > 0.0 && self.undersize_fraction <= 1.0) {
            return Err(invalid("undersize_fraction", self.undersize_fraction));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(invalid("jpeg_quality", self.jpeg_quality));
        }
        if self.target_extension.is_empty() {
            return Err(invalid("target_extension", "<empty>"));
        }
        if self.report_extension.is_empty() {
            return Err(invalid("report_extension", "<empty>"));
        }
        if self.report_name.is_empty() {
            return Err(invalid("report_name", "<empty>"));
        }
        if self.quarantine_dir_name.is_empty() {
            return Err(invalid("quarantine_dir_name", "<empty>"));
        }
        if !(0.0..1.0).contains(&self.high_loss_threshold) {
            return Err(invalid("high_loss_threshold", self.high_loss_threshold));
        }
        if self.threads == Some(0) {
            return Err(invalid("threads", 0));
        }
        Ok(())
    }

    /// Pixel count below which an image is considered undersized.
    pub fn undersize_limit(&self) -> f64 {
        self.undersize_fraction * self.max_pixels as f64
    }

    pub fn is_undersized(&self, width: u32, height: u32) -> bool {
        ((width as u64 * height as u64) as f64) < self.undersize_limit()
    }

    pub fn report_file_name(&self) -> String {
        format!("{}.{}", self.report_name, self.report_extension)
    }
}

fn invalid(arg: &'static str, value: impl std::fmt::Display) -> Error {
    Error::InvalidArgument {
        arg,
        value: value.to_string(),
    }
}
