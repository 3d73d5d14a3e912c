use std::io::{BufWriter, Write};
use std::path::Path;

use jpeg_encoder::{ColorType, Encoder};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

fn dimension(value: u32, name: &'static str) -> Result<u16> {
    u16::try_from(value).map_err(|_| Error::InvalidArgument {
        arg: name,
        value: value.to_string(),
    })
}

/// Encode interleaved RGB pixels and atomically replace `output`.
/// The encoder stores them as full-range YCbCr (JFIF).
///
/// The JPEG is written to a temporary file next to `output` and renamed over
/// it, so an interrupted run leaves either the previous file or the new one.
pub fn write_rgb_jpeg(
    output: &Path,
    cols: u32,
    rows: u32,
    rgb_data: &[u8],
    quality: u8,
) -> Result<()> {
    let width = dimension(cols, "width")?;
    let height = dimension(rows, "height")?;
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        let encoder = Encoder::new(&mut writer, quality);
        encoder.encode(rgb_data, width, height, ColorType::Rgb)?;
        writer.flush()?;
    }
    tmp.persist(output).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_decodable_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("flat.jpg");
        let data = [128u8, 128, 128].repeat(64 * 32);
        write_rgb_jpeg(&out, 64, 32, &data, 100).unwrap();
        assert_eq!(image::image_dimensions(&out).unwrap(), (64, 32));
        // No stray temporaries left beside the output
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("img.jpg");
        std::fs::write(&out, b"not a jpeg").unwrap();
        let data = [0u8, 0, 0].repeat(32 * 32);
        write_rgb_jpeg(&out, 32, 32, &data, 90).unwrap();
        assert_eq!(image::image_dimensions(&out).unwrap(), (32, 32));
    }

    #[test]
    fn rgb_colors_survive_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("red.jpg");
        let data = [200u8, 30, 40].repeat(32 * 32);
        write_rgb_jpeg(&out, 32, 32, &data, 100).unwrap();

        let decoded = image::open(&out).unwrap().into_rgb8();
        let px = decoded.get_pixel(16, 16).0;
        for (got, want) in px.iter().zip([200u8, 30, 40]) {
            assert!(got.abs_diff(want) <= 3, "{px:?}");
        }
    }

    #[test]
    fn oversized_dimension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("big.jpg");
        assert!(matches!(
            write_rgb_jpeg(&out, 70_000, 1, &[], 100),
            Err(Error::InvalidArgument { arg: "width", .. })
        ));
        assert!(!out.exists());
    }
}
