//! Corpus-wide loss accounting: per-cluster frequencies, loss-ratio summary
//! statistics and the high-loss file list.
use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::core::cluster::ClusterModel;
use crate::core::params::NormalizeParams;
use crate::error::{Error, Result};
use crate::types::ImageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LossStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation
    pub std_dev: f64,
}

impl LossStats {
    /// Single pass: min/max plus Welford mean/variance.
    pub fn from_ratios<I: IntoIterator<Item = f64>>(ratios: I) -> Option<Self> {
        let mut count: u64 = 0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut mean = 0.0_f64;
        let mut m2 = 0.0_f64;

        for v in ratios {
            count += 1;
            min = min.min(v);
            max = max.max(v);
            let delta = v - mean;
            mean += delta / (count as f64);
            m2 += delta * (v - mean);
        }

        if count == 0 {
            return None;
        }
        Some(Self {
            count: count as usize,
            mean,
            min,
            max,
            std_dev: (m2 / count as f64).sqrt(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeBucket {
    pub label: usize,
    pub centroid: (f64, f64),
    /// Centroid rounded to pixels, e.g. `1088x816`
    pub size: String,
    pub count: usize,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighLossEntry {
    pub path: PathBuf,
    pub loss_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusReport {
    pub total: usize,
    pub most_common: SizeBucket,
    pub loss: LossStats,
    /// Non-empty buckets, highest ratio first
    pub buckets: Vec<SizeBucket>,
    pub high_loss: Vec<HighLossEntry>,
    pub high_loss_top: usize,
    pub high_loss_threshold: f64,
}

impl CorpusReport {
    /// Aggregate the transformed records; failed or pending records are ignored.
    pub fn from_records(
        records: &[ImageRecord],
        model: &ClusterModel,
        params: &NormalizeParams,
    ) -> Result<Self> {
        let transformed: Vec<&ImageRecord> =
            records.iter().filter(|r| r.is_transformed()).collect();
        if transformed.is_empty() {
            return Err(Error::insufficient("no transformed images to report on"));
        }

        let mut counts = vec![0usize; model.k()];
        let mut ratios = Vec::with_capacity(transformed.len());
        for record in &transformed {
            let label = record.cluster_label.ok_or_else(|| Error::Consistency {
                detail: format!("{:?} was transformed but never labelled", record.path),
            })?;
            let slot = counts.get_mut(label).ok_or_else(|| Error::Consistency {
                detail: format!(
                    "{:?} carries label {} but only {} centroids exist",
                    record.path,
                    label,
                    model.k()
                ),
            })?;
            *slot += 1;

            let ratio = record.loss_ratio.ok_or_else(|| Error::Consistency {
                detail: format!("{:?} was transformed without a loss ratio", record.path),
            })?;
            ratios.push((record.path.clone(), ratio));
        }

        let total = transformed.len();
        let mut buckets: Vec<SizeBucket> = counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(label, &count)| SizeBucket {
                label,
                centroid: model.centroids[label],
                size: model
                    .centroid_label(label)
                    .unwrap_or_else(|| format!("#{label}")),
                count,
                ratio: count as f64 / total as f64,
            })
            .collect();
        // Stable sort keeps lower labels first on equal counts
        buckets.sort_by(|a, b| b.count.cmp(&a.count));

        let most_common = buckets
            .first()
            .cloned()
            .ok_or_else(|| Error::insufficient("no populated size buckets"))?;

        let loss = LossStats::from_ratios(ratios.iter().map(|(_, r)| *r))
            .ok_or_else(|| Error::insufficient("no loss ratios"))?;

        let high_loss = high_loss_files(ratios, params.high_loss_top, params.high_loss_threshold);

        info!(
            "Accounted {} images: mean loss {:.4}, max {:.4}, {} high-loss files",
            total,
            loss.mean,
            loss.max,
            high_loss.len()
        );

        Ok(Self {
            total,
            most_common,
            loss,
            buckets,
            high_loss,
            high_loss_top: params.high_loss_top,
            high_loss_threshold: params.high_loss_threshold,
        })
    }
}

/// Top `top` files with a positive loss, then every other file above `threshold`.
pub fn high_loss_files(
    mut ratios: Vec<(PathBuf, f64)>,
    top: usize,
    threshold: f64,
) -> Vec<HighLossEntry> {
    ratios.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut out = Vec::new();
    let leaders = ratios.iter().filter(|(_, r)| *r > 0.0).take(top);
    let exceeders = ratios.iter().filter(|(_, r)| *r > threshold);
    for (path, ratio) in leaders.chain(exceeders) {
        if seen.insert(path.clone()) {
            out.push(HighLossEntry {
                path: path.clone(),
                loss_ratio: *ratio,
            });
        }
    }
    out
}
