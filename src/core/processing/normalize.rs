//! Per-image normalization: decode, downscale, budget crop, grid align,
//! and re-encode as a maximum-quality YCbCr JPEG.
use std::path::{Path, PathBuf};

use image::ImageReader;
use serde::Serialize;
use tracing::debug;

use crate::core::params::NormalizeParams;
use crate::core::processing::crop::crop_rgb;
use crate::core::processing::geometry::{TransformPlan, plan_transform};
use crate::core::processing::resize::resize_rgb_image;
use crate::error::{Error, Result};
use crate::io::scan::differs_only_in_case;
use crate::io::writers::jpeg::write_rgb_jpeg;

/// Outcome of one successful transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedImage {
    pub source: PathBuf,
    pub output: PathBuf,
    pub final_width: u32,
    pub final_height: u32,
    pub loss_ratio: f64,
    pub plan: TransformPlan,
}

/// Apply the full geometric transform to an RGB8 buffer.
/// Returns the cropped RGB pixels and the plan that produced them.
pub fn transform_rgb(
    data: Vec<u8>,
    width: u32,
    height: u32,
    params: &NormalizeParams,
) -> Result<(Vec<u8>, TransformPlan)> {
    let plan = plan_transform(width, height, params)?;
    let (scaled_cols, scaled_rows) = plan.scaled;
    let scaled = resize_rgb_image(data, width, height, scaled_cols, scaled_rows, params.filter)?;
    let cropped = crop_rgb(&scaled, scaled_cols, scaled_rows, plan.crop)?;

    let loss = plan.loss_ratio();
    if !(0.0..1.0).contains(&loss) {
        return Err(Error::Consistency {
            detail: format!("loss ratio {loss} outside [0, 1) for {width}x{height}"),
        });
    }
    Ok((cropped, plan))
}

/// Normalize `source` and write the result to `output`.
///
/// Destructive: `output` is replaced, and when it differs from `source` the
/// source file is removed once the new image is safely on disk. When the two
/// differ only in case (`a.JPG` -> `a.jpg`) the source is renamed first, since
/// on a case-insensitive filesystem they are the same file.
pub fn normalize_image(
    source: &Path,
    output: &Path,
    params: &NormalizeParams,
) -> Result<NormalizedImage> {
    let decoded = ImageReader::open(source)?
        .with_guessed_format()?
        .decode()?
        .into_rgb8();
    let (width, height) = decoded.dimensions();

    let (pixels, plan) = transform_rgb(decoded.into_raw(), width, height, params)?;
    let (final_width, final_height) = plan.final_size();

    let case_rename = differs_only_in_case(source, output);
    if case_rename {
        std::fs::rename(source, output)?;
    }
    write_rgb_jpeg(output, final_width, final_height, &pixels, params.jpeg_quality)?;

    if source != output && !case_rename {
        std::fs::remove_file(source)?;
    }

    debug!(
        "{:?}: {}x{} -> {}x{} (loss {:.4})",
        source,
        width,
        height,
        final_width,
        final_height,
        plan.loss_ratio()
    );

    Ok(NormalizedImage {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        final_width,
        final_height,
        loss_ratio: plan.loss_ratio(),
        plan,
    })
}
