use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::ResampleFilter;

fn resize_alg(filter: ResampleFilter) -> ResizeAlg {
    match filter {
        ResampleFilter::Nearest => ResizeAlg::Nearest,
        ResampleFilter::Bilinear => ResizeAlg::Convolution(FilterType::Bilinear),
        ResampleFilter::CatmullRom => ResizeAlg::Convolution(FilterType::CatmullRom),
        ResampleFilter::Lanczos3 => ResizeAlg::Convolution(FilterType::Lanczos3),
    }
}

/// Resample an interleaved RGB8 buffer to `target_cols` x `target_rows`.
pub fn resize_rgb_image(
    data: Vec<u8>,
    original_cols: u32,
    original_rows: u32,
    target_cols: u32,
    target_rows: u32,
    filter: ResampleFilter,
) -> Result<Vec<u8>> {
    if original_cols == target_cols && original_rows == target_rows {
        return Ok(data);
    }
    debug!(
        "Resizing {}x{} -> {}x{} ({})",
        original_cols, original_rows, target_cols, target_rows, filter
    );

    let resize_options = ResizeOptions::new().resize_alg(resize_alg(filter));
    let mut resizer = Resizer::new();

    let src_image = Image::from_vec_u8(original_cols, original_rows, data, PixelType::U8x3)
        .map_err(Error::resize)?;
    let mut dst_image = Image::new(target_cols, target_rows, PixelType::U8x3);
    resizer
        .resize(&src_image, &mut dst_image, &resize_options)
        .map_err(Error::resize)?;

    Ok(dst_image.into_vec())
}
