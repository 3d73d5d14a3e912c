//! High-level library API: run the whole normalization pipeline over a
//! directory, or use the individual phases (scan, cluster, transform,
//! account, report, sweep). Prefer these entrypoints over the low-level
//! processing modules when integrating gridnorm.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::core::cluster::{ClusterModel, KMeansConfig, fit};
use crate::core::params::NormalizeParams;
use crate::core::pool::build_worker_pool;
use crate::core::processing::geometry::{TransformPlan, plan_transform};
use crate::core::processing::normalize::{NormalizedImage, normalize_image};
use crate::core::stats::CorpusReport;
use crate::error::{Error, Result};
use crate::io::cleanup::{CleanupReport, sweep};
use crate::io::scan::{OutputCollision, assign_output_paths, scan_corpus};
use crate::io::writers::report::{render_report, write_report};
use crate::types::{ImageRecord, RecordStatus};

/// A file that scanned fine but could not be transformed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a run produced, suitable for logging or JSON export.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub root: PathBuf,
    pub dry_run: bool,
    pub clusters_requested: usize,
    pub model: ClusterModel,
    pub files_seen: usize,
    pub images_scanned: usize,
    pub skipped: usize,
    pub quarantined: Vec<PathBuf>,
    pub collisions: Vec<OutputCollision>,
    pub transformed: usize,
    pub failed: Vec<FailedFile>,
    pub records: Vec<ImageRecord>,
    pub report: CorpusReport,
    pub report_text: String,
    pub report_path: Option<PathBuf>,
    pub cleanup: Option<CleanupReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Compute the transform plan for an image of the given native size.
pub fn plan_image(width: u32, height: u32, params: &NormalizeParams) -> Result<TransformPlan> {
    plan_transform(width, height, params)
}

/// Normalize a single file in place, renaming it to the target extension.
pub fn normalize_file(source: &Path, params: &NormalizeParams) -> Result<NormalizedImage> {
    params.validate()?;
    let output = source.with_extension(&params.target_extension);
    normalize_image(source, &output, params)
}

/// Fit the size clusters for `dimensions` using the seed and restart policy in `params`.
pub fn cluster_sizes(
    dimensions: &[(u32, u32)],
    clusters: usize,
    params: &NormalizeParams,
) -> Result<ClusterModel> {
    let config = KMeansConfig {
        k: clusters,
        seed: params.seed,
        n_init: params.n_init,
        max_iter: params.max_iter,
        tolerance: params.tolerance,
    };
    fit(dimensions, &config)
}

/// Attach labels to records. `model.labels` is in the records' key order.
pub fn apply_labels(
    records: &mut BTreeMap<PathBuf, ImageRecord>,
    model: &ClusterModel,
) -> Result<()> {
    model.validate()?;
    if model.labels.len() != records.len() {
        return Err(Error::Consistency {
            detail: format!(
                "{} labels for {} records",
                model.labels.len(),
                records.len()
            ),
        });
    }
    for (record, label) in records.values_mut().zip(&model.labels) {
        record.cluster_label = Some(*label);
    }
    Ok(())
}

/// Transform every record on `pool`, one file per task. Results are keyed by
/// source path; a failure only affects its own entry.
pub fn transform_records(
    records: &BTreeMap<PathBuf, ImageRecord>,
    params: &NormalizeParams,
    pool: &rayon::ThreadPool,
) -> BTreeMap<PathBuf, Result<NormalizedImage>> {
    pool.install(|| {
        records
            .par_iter()
            .map(|(path, record)| {
                let output = record
                    .output_path
                    .clone()
                    .unwrap_or_else(|| path.with_extension(&params.target_extension));
                let result = if params.dry_run {
                    plan_transform(record.original_width, record.original_height, params).map(
                        |plan| NormalizedImage {
                            source: path.clone(),
                            output,
                            final_width: plan.crop.width,
                            final_height: plan.crop.height,
                            loss_ratio: plan.loss_ratio(),
                            plan,
                        },
                    )
                } else {
                    normalize_image(path, &output, params)
                };
                (path.clone(), result)
            })
            .collect()
    })
}

/// Fold transform outcomes back into the records by path.
/// Returns the failures; records without an outcome are marked failed too.
pub fn apply_outcomes(
    records: &mut BTreeMap<PathBuf, ImageRecord>,
    mut outcomes: BTreeMap<PathBuf, Result<NormalizedImage>>,
) -> Vec<FailedFile> {
    let mut failed = Vec::new();
    for (path, record) in records.iter_mut() {
        match outcomes.remove(path) {
            Some(Ok(done)) => {
                record.output_path = Some(done.output);
                record.final_width = Some(done.final_width);
                record.final_height = Some(done.final_height);
                record.loss_ratio = Some(done.loss_ratio);
                record.status = RecordStatus::Transformed;
            }
            Some(Err(e)) => {
                warn!("Failed to normalize {:?}: {}", path, e);
                record.status = RecordStatus::Failed;
                failed.push(FailedFile {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
            None => {
                record.status = RecordStatus::Failed;
                failed.push(FailedFile {
                    path: path.clone(),
                    reason: "no transform result".to_string(),
                });
            }
        }
    }
    for path in outcomes.keys() {
        warn!("Discarding transform result for unknown file {:?}", path);
    }
    failed
}

/// Run the full pipeline over `root`: scan, cluster into `clusters` groups,
/// normalize every image in place, write the statistics report, then sweep.
///
/// Destructive unless `params.dry_run`: images are overwritten in place,
/// renamed to the target extension, and the cleanup sweeps delete files.
/// There is no rollback; back up the corpus before running.
pub fn run_pipeline(root: &Path, clusters: usize, params: &NormalizeParams) -> Result<RunSummary> {
    let started_at = Utc::now();
    params.validate()?;
    if clusters == 0 {
        return Err(Error::InvalidArgument {
            arg: "clusters",
            value: "0".to_string(),
        });
    }
    let root = std::fs::canonicalize(root)?;
    if !root.is_dir() {
        return Err(Error::InvalidArgument {
            arg: "root",
            value: root.display().to_string(),
        });
    }
    info!(
        "Normalizing {:?} into {} size clusters{}",
        root,
        clusters,
        if params.dry_run { " (dry run)" } else { "" }
    );

    let scan_pool = build_worker_pool(params.threads, "scan")?;
    let mut scan = scan_corpus(&root, params, &scan_pool)?;
    drop(scan_pool);
    if scan.records.is_empty() {
        return Err(Error::insufficient(format!(
            "no decodable images under {}",
            root.display()
        )));
    }

    let model = cluster_sizes(&scan.dimensions(), clusters, params)?;
    apply_labels(&mut scan.records, &model)?;

    let collisions = assign_output_paths(&mut scan.records, &params.target_extension)?;

    let transform_pool = build_worker_pool(params.threads, "transform")?;
    let outcomes = transform_records(&scan.records, params, &transform_pool);
    drop(transform_pool);
    let failed = apply_outcomes(&mut scan.records, outcomes);
    let records: Vec<ImageRecord> = scan.records.into_values().collect();
    let transformed = records.iter().filter(|r| r.is_transformed()).count();
    info!(
        "Transform complete: {} normalized, {} failed",
        transformed,
        failed.len()
    );

    let report = CorpusReport::from_records(&records, &model, params)?;
    let report_text = render_report(&report);

    let (report_path, cleanup) = if params.dry_run {
        (None, None)
    } else {
        let path = write_report(&root, &params.report_file_name(), &report)?;
        let cleanup = sweep(&root, params)?;
        (Some(path), Some(cleanup))
    };

    Ok(RunSummary {
        root,
        dry_run: params.dry_run,
        clusters_requested: clusters,
        model,
        files_seen: scan.files_seen,
        images_scanned: records.len(),
        skipped: scan.skipped,
        quarantined: scan.quarantined,
        collisions,
        transformed,
        failed,
        records,
        report,
        report_text,
        report_path,
        cleanup,
        started_at,
        finished_at: Utc::now(),
    })
}

/// Write `summary` as pretty JSON.
pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str) -> (PathBuf, ImageRecord) {
        let p = PathBuf::from(path);
        (p.clone(), ImageRecord::scanned(p, 640, 480))
    }

    #[test]
    fn labels_applied_in_key_order() {
        let mut records: BTreeMap<_, _> = [record("b"), record("a"), record("c")].into();
        let model = ClusterModel {
            centroids: vec![(1.0, 1.0), (2.0, 2.0)],
            labels: vec![1, 0, 1],
            inertia: 0.0,
            iterations: 1,
        };
        apply_labels(&mut records, &model).unwrap();
        assert_eq!(records[&PathBuf::from("a")].cluster_label, Some(1));
        assert_eq!(records[&PathBuf::from("b")].cluster_label, Some(0));
        assert_eq!(records[&PathBuf::from("c")].cluster_label, Some(1));
    }

    #[test]
    fn mismatched_label_count_is_consistency_error() {
        let mut records: BTreeMap<_, _> = [record("a"), record("b")].into();
        let model = ClusterModel {
            centroids: vec![(1.0, 1.0)],
            labels: vec![0],
            inertia: 0.0,
            iterations: 1,
        };
        assert!(matches!(
            apply_labels(&mut records, &model),
            Err(Error::Consistency { .. })
        ));
    }

    #[test]
    fn outcomes_correlated_by_path_not_position() {
        let mut records: BTreeMap<_, _> = [record("a"), record("b")].into();
        let params = NormalizeParams::default();
        let plan = plan_transform(640, 480, &params).unwrap();
        let mut outcomes = BTreeMap::new();
        outcomes.insert(
            PathBuf::from("b"),
            Ok(NormalizedImage {
                source: PathBuf::from("b"),
                output: PathBuf::from("b.jpg"),
                final_width: 640,
                final_height: 480,
                loss_ratio: 0.0,
                plan,
            }),
        );
        outcomes.insert(
            PathBuf::from("a"),
            Err(Error::DegenerateImage {
                width: 1,
                height: 1,
            }),
        );

        let failed = apply_outcomes(&mut records, outcomes);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].path, PathBuf::from("a"));
        assert_eq!(records[&PathBuf::from("a")].status, RecordStatus::Failed);
        let b = &records[&PathBuf::from("b")];
        assert_eq!(b.status, RecordStatus::Transformed);
        assert_eq!(b.output_path.as_deref(), Some(Path::new("b.jpg")));
    }

    #[test]
    fn normalize_file_converts_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("scan.png");
        image::RgbImage::from_pixel(1100, 1000, image::Rgb([40, 90, 160]))
            .save(&src)
            .unwrap();

        let done = normalize_file(&src, &NormalizeParams::default()).unwrap();
        assert_eq!(done.output, dir.path().join("scan.jpg"));
        assert_eq!((done.final_width, done.final_height), (1088, 992));
        assert!(!src.exists());
        assert_eq!(image::image_dimensions(&done.output).unwrap(), (1088, 992));
    }

    #[test]
    fn zero_clusters_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            run_pipeline(dir.path(), 0, &NormalizeParams::default()),
            Err(Error::InvalidArgument { arg: "clusters", .. })
        ));
    }

    #[test]
    fn empty_tree_is_insufficient() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("empty");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("note.txt"), "no images here").unwrap();
        let err = run_pipeline(&root, 3, &NormalizeParams::default()).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { .. }));
        // Nothing was swept
        assert!(root.join("note.txt").exists());
    }
}
