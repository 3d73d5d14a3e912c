//! Post-run pruning of the processed tree. Both sweeps delete files
//! irrecoverably and must only run after normalization and reporting.
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::core::params::NormalizeParams;
use crate::error::Result;
use crate::io::scan::{list_files, quarantine_dir, read_dimensions};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupReport {
    /// Files removed for carrying neither the image nor the report extension
    pub removed_foreign: Vec<PathBuf>,
    /// Output images removed for falling below the undersize limit
    pub removed_undersized: Vec<PathBuf>,
    /// Target-extension files whose header could not be read; removed as well
    pub removed_unreadable: Vec<PathBuf>,
}

fn extension_lower(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

/// Delete every file whose extension is not in `keep` (case-insensitive).
pub fn remove_foreign_files(
    root: &Path,
    keep: &[&str],
    exclude: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for path in list_files(root, exclude)? {
        let keep_it = extension_lower(&path)
            .map(|ext| keep.iter().any(|k| k.eq_ignore_ascii_case(&ext)))
            .unwrap_or(false);
        if !keep_it {
            std::fs::remove_file(&path)?;
            removed.push(path);
        }
    }
    Ok(removed)
}

/// Delete target-extension images below the undersize limit. A file whose
/// header cannot be read fails the size check and is deleted too.
/// Returns `(removed_undersized, removed_unreadable)`.
pub fn remove_undersized_images(
    root: &Path,
    params: &NormalizeParams,
    exclude: Option<&Path>,
) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut removed = Vec::new();
    let mut unreadable = Vec::new();
    for path in list_files(root, exclude)? {
        let is_target = extension_lower(&path)
            .map(|ext| ext.eq_ignore_ascii_case(&params.target_extension))
            .unwrap_or(false);
        if !is_target {
            continue;
        }
        match read_dimensions(&path) {
            Ok((w, h)) if params.is_undersized(w, h) => {
                std::fs::remove_file(&path)?;
                removed.push(path);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Removing unreadable {:?}: {}", path, e);
                std::fs::remove_file(&path)?;
                unreadable.push(path);
            }
        }
    }
    Ok((removed, unreadable))
}

/// Run both sweeps over `root`, foreign files first.
pub fn sweep(root: &Path, params: &NormalizeParams) -> Result<CleanupReport> {
    let qdir = quarantine_dir(root, params);
    let exclude = qdir.starts_with(root).then_some(qdir.as_path());

    let keep = [
        params.target_extension.as_str(),
        params.report_extension.as_str(),
    ];
    let removed_foreign = remove_foreign_files(root, &keep, exclude)?;
    let (removed_undersized, removed_unreadable) =
        remove_undersized_images(root, params, exclude)?;

    info!(
        "Cleanup removed {} foreign files, {} undersized and {} unreadable images",
        removed_foreign.len(),
        removed_undersized.len(),
        removed_unreadable.len()
    );
    Ok(CleanupReport {
        removed_foreign,
        removed_undersized,
        removed_unreadable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn jpeg(path: &Path, w: u32, h: u32) {
        RgbImage::from_pixel(w, h, Rgb([1, 2, 3])).save(path).unwrap();
    }

    #[test]
    fn foreign_sweep_keeps_images_and_text() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir(root.join("sub")).unwrap();
        std::fs::write(root.join("caption.TXT"), "x").unwrap();
        std::fs::write(root.join("photo.JPG"), "x").unwrap();
        std::fs::write(root.join("sub/raw.png"), "x").unwrap();
        std::fs::write(root.join("sub/README"), "x").unwrap();

        let removed = remove_foreign_files(root, &["jpg", "txt"], None).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(root.join("caption.TXT").exists());
        assert!(root.join("photo.JPG").exists());
        assert!(!root.join("sub/raw.png").exists());
        assert!(!root.join("sub/README").exists());
    }

    #[test]
    fn undersized_sweep_removes_small_outputs_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("corpus");
        std::fs::create_dir(&root).unwrap();
        jpeg(&root.join("small.jpg"), 480, 480);
        jpeg(&root.join("large.jpg"), 1088, 960);
        std::fs::write(root.join("statistics.txt"), "report").unwrap();
        std::fs::write(root.join("corrupt.jpg"), b"\xff\xd8").unwrap();

        let report = sweep(&root, &NormalizeParams::default()).unwrap();
        assert_eq!(report.removed_undersized, vec![root.join("small.jpg")]);
        assert_eq!(report.removed_unreadable, vec![root.join("corrupt.jpg")]);
        assert!(!root.join("corrupt.jpg").exists());
        assert!(report.removed_foreign.is_empty());
        assert!(root.join("large.jpg").exists());
        assert!(root.join("statistics.txt").exists());
    }

    #[test]
    fn quarantine_inside_root_is_spared() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let q = root.join("small_images");
        std::fs::create_dir(&q).unwrap();
        std::fs::write(q.join("kept.png"), "x").unwrap();
        std::fs::write(root.join("gone.png"), "x").unwrap();

        let removed = remove_foreign_files(root, &["jpg", "txt"], Some(&q)).unwrap();
        assert_eq!(removed, vec![root.join("gone.png")]);
        assert!(q.join("kept.png").exists());
    }
}
