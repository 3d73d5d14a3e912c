//! Shared types and enums used across gridnorm.
//! Includes the per-file `ImageRecord`, its `RecordStatus`, the resampling
//! filter selection (`ResampleFilter`) and the k-means restart policy (`NInit`).
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum RecordStatus {
    Pending,
    Scanned,
    Transformed,
    Failed,
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecordStatus::Pending => "Pending",
            RecordStatus::Scanned => "Scanned",
            RecordStatus::Transformed => "Transformed",
            RecordStatus::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}

/// One candidate image of the corpus. Created by the scanner, labelled by the
/// clusterer and completed by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub original_width: u32,
    pub original_height: u32,
    pub cluster_label: Option<usize>,
    /// Destination of the re-encoded image; assigned before the transform phase
    pub output_path: Option<PathBuf>,
    pub final_width: Option<u32>,
    pub final_height: Option<u32>,
    pub loss_ratio: Option<f64>,
    pub status: RecordStatus,
}

impl ImageRecord {
    pub fn scanned(path: PathBuf, width: u32, height: u32) -> Self {
        Self {
            path,
            original_width: width,
            original_height: height,
            cluster_label: None,
            output_path: None,
            final_width: None,
            final_height: None,
            loss_ratio: None,
            status: RecordStatus::Scanned,
        }
    }

    pub fn is_transformed(&self) -> bool {
        self.status == RecordStatus::Transformed
    }
}

#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    Nearest,
    Bilinear,
    CatmullRom,
    Lanczos3,
}

impl std::fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResampleFilter::Nearest => write!(f, "Nearest"),
            ResampleFilter::Bilinear => write!(f, "Bilinear"),
            ResampleFilter::CatmullRom => write!(f, "CatmullRom"),
            ResampleFilter::Lanczos3 => write!(f, "Lanczos3"),
        }
    }
}

/// How many k-means seedings to run; the lowest-inertia run wins.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NInit {
    /// A single k-means++ seeding
    Auto,
    Fixed(usize),
}

impl NInit {
    pub fn runs(self) -> usize {
        match self {
            NInit::Auto => 1,
            NInit::Fixed(n) => n.max(1),
        }
    }
}

impl std::fmt::Display for NInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NInit::Auto => write!(f, "auto"),
            NInit::Fixed(n) => write!(f, "{}", n),
        }
    }
}
