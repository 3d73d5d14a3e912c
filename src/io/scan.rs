//! Corpus scanning: enumerate files, read native dimensions, quarantine
//! undersized originals and assign each image its output path.
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use image::ImageReader;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::core::params::NormalizeParams;
use crate::error::{Error, Result};
use crate::types::ImageRecord;

/// Scan output keyed by source path.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub records: BTreeMap<PathBuf, ImageRecord>,
    pub files_seen: usize,
    pub skipped: usize,
    pub quarantined: Vec<PathBuf>,
}

impl ScanResult {
    /// `(width, height)` vectors in path order.
    pub fn dimensions(&self) -> Vec<(u32, u32)> {
        self.records
            .values()
            .map(|r| (r.original_width, r.original_height))
            .collect()
    }
}

#[derive(Debug)]
enum ScanOutcome {
    Image { record: ImageRecord, quarantined: Option<PathBuf> },
    Skipped,
}

/// Two sources that would have written the same output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputCollision {
    pub source: PathBuf,
    pub wanted: PathBuf,
    pub assigned: PathBuf,
}

/// Sibling directory receiving quarantine copies.
pub fn quarantine_dir(root: &Path, params: &NormalizeParams) -> PathBuf {
    match root.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(&params.quarantine_dir_name),
        _ => root.join(&params.quarantine_dir_name),
    }
}

/// All regular files under `root`, sorted, skipping anything below `exclude`.
pub fn list_files(root: &Path, exclude: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| exclude.is_none_or(|ex| !e.path().starts_with(ex)));
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Read `(width, height)` from the image header.
pub fn read_dimensions(path: &Path) -> Result<(u32, u32)> {
    let dims = ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(dims)
}

fn quarantine_copy(path: &Path, root: &Path, qdir: &Path) -> Result<PathBuf> {
    let relative = match path.strip_prefix(root) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => PathBuf::from(path.file_name().unwrap_or_default()),
    };
    let dest = qdir.join(relative);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(path, &dest)?;
    Ok(dest)
}

fn scan_file(path: &Path, root: &Path, qdir: &Path, params: &NormalizeParams) -> ScanOutcome {
    let (width, height) = match read_dimensions(path) {
        Ok(dims) => dims,
        Err(e) => {
            debug!("Skipping {:?}: {}", path, e);
            return ScanOutcome::Skipped;
        }
    };

    let mut quarantined = None;
    if !params.dry_run && params.is_undersized(width, height) {
        match quarantine_copy(path, root, qdir) {
            Ok(dest) => quarantined = Some(dest),
            Err(e) => warn!("Failed to quarantine {:?}: {}", path, e),
        }
    }

    ScanOutcome::Image {
        record: ImageRecord::scanned(path.to_path_buf(), width, height),
        quarantined,
    }
}

/// Scan every file under `root` on `pool`. Non-images are skipped silently.
pub fn scan_corpus(
    root: &Path,
    params: &NormalizeParams,
    pool: &rayon::ThreadPool,
) -> Result<ScanResult> {
    let qdir = quarantine_dir(root, params);
    let exclude = qdir.starts_with(root).then_some(qdir.as_path());
    let files = list_files(root, exclude)?;
    info!("Scanning {} files under {:?}", files.len(), root);

    let outcomes: Vec<(PathBuf, ScanOutcome)> = pool.install(|| {
        files
            .par_iter()
            .map(|path| (path.clone(), scan_file(path, root, &qdir, params)))
            .collect()
    });

    let mut result = ScanResult {
        files_seen: files.len(),
        ..Default::default()
    };
    for (path, outcome) in outcomes {
        match outcome {
            ScanOutcome::Image {
                record,
                quarantined,
            } => {
                if let Some(dest) = quarantined {
                    result.quarantined.push(dest);
                }
                result.records.insert(path, record);
            }
            ScanOutcome::Skipped => result.skipped += 1,
        }
    }

    info!(
        "Scan complete: {} images, {} skipped, {} quarantined",
        result.records.len(),
        result.skipped,
        result.quarantined.len()
    );
    Ok(result)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension() == Some(OsStr::new(ext))
}

/// True when `a` and `b` name the same path up to ASCII case, e.g.
/// `UP.JPG` and `UP.jpg`. Such a pair is one file on case-insensitive
/// filesystems.
pub fn differs_only_in_case(a: &Path, b: &Path) -> bool {
    a != b && a.to_string_lossy().eq_ignore_ascii_case(&b.to_string_lossy())
}

fn suffixed_output(source: &Path, target_ext: &str, attempt: usize) -> PathBuf {
    let stem = source.file_stem().unwrap_or_default().to_string_lossy();
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "noext".to_string());
    let name = if attempt == 0 {
        format!("{stem}_{ext}.{target_ext}")
    } else {
        format!("{stem}_{ext}_{attempt}.{target_ext}")
    };
    source.with_file_name(name)
}

/// Assign each record its output path. Files already carrying the exact target
/// extension keep their path; others (including `.JPG` for `jpg`) take
/// `<stem>.<target>` unless another source or an unrelated existing file holds
/// that name, in which case they get `<stem>_<ext>.<target>`.
pub fn assign_output_paths(
    records: &mut BTreeMap<PathBuf, ImageRecord>,
    target_ext: &str,
) -> Result<Vec<OutputCollision>> {
    let mut claimed: BTreeSet<PathBuf> = BTreeSet::new();
    // Sources already in target format win their own names first
    for (path, record) in records.iter_mut() {
        if has_extension(path, target_ext) {
            claimed.insert(path.clone());
            record.output_path = Some(path.clone());
        }
    }

    let mut collisions = Vec::new();
    for (path, record) in records.iter_mut() {
        if record.output_path.is_some() {
            continue;
        }
        let wanted = path.with_extension(target_ext);
        // A case variant of the source itself "exists" on case-insensitive
        // filesystems; it is still free for this source.
        let free = |p: &Path, claimed: &BTreeSet<PathBuf>| {
            !claimed.contains(p) && (!p.exists() || differs_only_in_case(p, path))
        };

        let assigned = if free(&wanted, &claimed) {
            wanted.clone()
        } else {
            let mut attempt = 0;
            loop {
                let candidate = suffixed_output(path, target_ext, attempt);
                if free(&candidate, &claimed) {
                    break candidate;
                }
                attempt += 1;
                if attempt > 1000 {
                    return Err(Error::Processing(format!(
                        "no free output name for {:?}",
                        path
                    )));
                }
            }
        };

        if assigned != wanted {
            warn!(
                "Output name collision: {:?} -> {:?} (wanted {:?})",
                path, assigned, wanted
            );
            collisions.push(OutputCollision {
                source: path.clone(),
                wanted,
                assigned: assigned.clone(),
            });
        }
        claimed.insert(assigned.clone());
        record.output_path = Some(assigned);
    }
    Ok(collisions)
}
