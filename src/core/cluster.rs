//! K-means clustering of image size vectors.
//!
//! Points are `(width, height)` pairs in 2-D Euclidean space. Seeding uses
//! k-means++ driven by a seeded `StdRng`, so identical inputs, seed and `k`
//! always produce identical centroids and labels. Distance ties resolve to the
//! lowest centroid index.
use std::collections::BTreeSet;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::NInit;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansConfig {
    pub k: usize,
    pub seed: u64,
    pub n_init: NInit,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl KMeansConfig {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            seed,
            n_init: NInit::Auto,
            max_iter: 300,
            tolerance: 1e-4,
        }
    }
}

/// Fitted centroids plus one label per input vector, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterModel {
    pub centroids: Vec<(f64, f64)>,
    pub labels: Vec<usize>,
    pub inertia: f64,
    pub iterations: usize,
}

impl ClusterModel {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Reject any label that does not index into the centroid sequence.
    pub fn validate(&self) -> Result<()> {
        if let Some((i, label)) = self
            .labels
            .iter()
            .enumerate()
            .find(|(_, l)| **l >= self.centroids.len())
        {
            return Err(Error::Consistency {
                detail: format!(
                    "label {} at position {} has no centroid (k={})",
                    label,
                    i,
                    self.centroids.len()
                ),
            });
        }
        Ok(())
    }

    /// Centroid rounded to integer pixels, rendered as `WxH`.
    pub fn centroid_label(&self, label: usize) -> Option<String> {
        self.centroids
            .get(label)
            .map(|(w, h)| format!("{}x{}", w.round() as i64, h.round() as i64))
    }
}

/// Partition `points` into `config.k` groups.
pub fn fit(points: &[(u32, u32)], config: &KMeansConfig) -> Result<ClusterModel> {
    if points.is_empty() {
        return Err(Error::insufficient("no image dimensions to cluster"));
    }
    if config.k == 0 {
        return Err(Error::InvalidArgument {
            arg: "k",
            value: "0".to_string(),
        });
    }

    let distinct = points.iter().collect::<BTreeSet<_>>().len();
    let k = if config.k > distinct {
        warn!(
            "Requested {} clusters but only {} distinct sizes; using k={}",
            config.k, distinct, distinct
        );
        distinct
    } else {
        config.k
    };

    let data = Array2::from_shape_fn((points.len(), 2), |(i, j)| {
        if j == 0 {
            points[i].0 as f64
        } else {
            points[i].1 as f64
        }
    });
    let tol = config.tolerance * mean_variance(&data);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<ClusterModel> = None;
    for run in 0..config.n_init.runs() {
        let init = kmeans_plus_plus(&data, k, &mut rng);
        let model = lloyd(&data, init, config.max_iter, tol);
        debug!(
            "k-means run {}: inertia={:.3}, iterations={}",
            run, model.inertia, model.iterations
        );
        // Strict comparison keeps the earliest run on ties
        if best.as_ref().is_none_or(|b| model.inertia < b.inertia) {
            best = Some(model);
        }
    }

    let model = best.ok_or_else(|| Error::insufficient("k-means produced no model"))?;
    model.validate()?;
    info!(
        "Clustered {} sizes into {} groups (inertia {:.1}, {} iterations)",
        points.len(),
        model.k(),
        model.inertia,
        model.iterations
    );
    Ok(model)
}

fn mean_variance(data: &Array2<f64>) -> f64 {
    data.var_axis(Axis(0), 0.0).mean().unwrap_or(0.0)
}

fn sq_dist(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn kmeans_plus_plus(data: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = data.nrows();
    let mut centers = Array2::<f64>::zeros((k, 2));
    let first = rng.gen_range(0..n);
    centers.row_mut(0).assign(&data.row(first));

    let mut closest: Array1<f64> = data
        .rows()
        .into_iter()
        .map(|p| sq_dist(p, centers.row(0)))
        .collect();

    for c in 1..k {
        let total: f64 = closest.sum();
        let pick = if total > 0.0 {
            let target = rng.r#gen::<f64>() * total;
            let mut acc = 0.0;
            let mut chosen = None;
            for (i, d) in closest.iter().enumerate() {
                acc += d;
                if *d > 0.0 && acc > target {
                    chosen = Some(i);
                    break;
                }
            }
            // Rounding can leave the target past the last bucket
            chosen.unwrap_or_else(|| {
                closest
                    .iter()
                    .rposition(|d| *d > 0.0)
                    .unwrap_or(n - 1)
            })
        } else {
            rng.gen_range(0..n)
        };
        centers.row_mut(c).assign(&data.row(pick));
        for (i, p) in data.rows().into_iter().enumerate() {
            let d = sq_dist(p, centers.row(c));
            if d < closest[i] {
                closest[i] = d;
            }
        }
    }
    centers
}

fn assign(data: &Array2<f64>, centers: &Array2<f64>, labels: &mut [usize]) -> f64 {
    let mut inertia = 0.0;
    for (i, p) in data.rows().into_iter().enumerate() {
        let mut best = 0;
        let mut best_d = f64::INFINITY;
        for (c, center) in centers.rows().into_iter().enumerate() {
            let d = sq_dist(p, center);
            if d < best_d {
                best_d = d;
                best = c;
            }
        }
        labels[i] = best;
        inertia += best_d;
    }
    inertia
}

fn lloyd(data: &Array2<f64>, mut centers: Array2<f64>, max_iter: usize, tol: f64) -> ClusterModel {
    let n = data.nrows();
    let k = centers.nrows();
    let mut labels = vec![0usize; n];
    let mut iterations = 0;

    for _ in 0..max_iter.max(1) {
        iterations += 1;
        assign(data, &centers, &mut labels);

        let mut sums = Array2::<f64>::zeros((k, 2));
        let mut counts = vec![0usize; k];
        for (i, p) in data.rows().into_iter().enumerate() {
            let mut row = sums.row_mut(labels[i]);
            row += &p;
            counts[labels[i]] += 1;
        }

        let mut updated = centers.clone();
        for c in 0..k {
            if counts[c] > 0 {
                let mean = &sums.row(c) / counts[c] as f64;
                updated.row_mut(c).assign(&mean);
            } else {
                // Empty cluster: move it onto the point farthest from its centroid
                let far = data
                    .rows()
                    .into_iter()
                    .enumerate()
                    .map(|(i, p)| (i, sq_dist(p, centers.row(labels[i]))))
                    .fold((0usize, f64::NEG_INFINITY), |acc, (i, d)| {
                        if d > acc.1 { (i, d) } else { acc }
                    })
                    .0;
                updated.row_mut(c).assign(&data.row(far));
            }
        }

        let shift: f64 = centers
            .rows()
            .into_iter()
            .zip(updated.rows())
            .map(|(a, b)| sq_dist(a, b))
            .sum();
        centers = updated;
        if shift <= tol {
            break;
        }
    }

    // Final assignment so labels always agree with the returned centroids
    let inertia = assign(data, &centers, &mut labels);
    ClusterModel {
        centroids: centers.rows().into_iter().map(|r| (r[0], r[1])).collect(),
        labels,
        inertia,
        iterations,
    }
}
