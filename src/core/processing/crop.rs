use tracing::debug;

use crate::core::processing::geometry::CropRect;
use crate::error::{Error, Result};

const CHANNELS: usize = 3;

/// Copy the `rect` region out of an interleaved RGB8 buffer of `cols` x `rows`.
pub fn crop_rgb(data: &[u8], cols: u32, rows: u32, rect: CropRect) -> Result<Vec<u8>> {
    let (cols, rows) = (cols as usize, rows as usize);
    let left = rect.left as usize;
    let top = rect.top as usize;
    let width = rect.width as usize;
    let height = rect.height as usize;

    if data.len() != cols * rows * CHANNELS {
        return Err(Error::Processing(format!(
            "buffer of {} bytes does not match {}x{} RGB",
            data.len(),
            cols,
            rows
        )));
    }
    if left + width > cols || top + height > rows {
        return Err(Error::Processing(format!(
            "crop {}x{}+{}+{} exceeds {}x{}",
            width, height, left, top, cols, rows
        )));
    }
    if left == 0 && top == 0 && width == cols && height == rows {
        return Ok(data.to_vec());
    }

    debug!(
        "Cropping {}x{} to {}x{} at ({}, {})",
        cols, rows, width, height, left, top
    );

    let mut out = vec![0u8; width * height * CHANNELS];
    // Copy per row using slice copies to minimize per-pixel indexing
    for row in 0..height {
        let src_offset = ((row + top) * cols + left) * CHANNELS;
        let dst_offset = row * width * CHANNELS;
        let len = width * CHANNELS;
        out[dst_offset..dst_offset + len].copy_from_slice(&data[src_offset..src_offset + len]);
    }
    Ok(out)
}
