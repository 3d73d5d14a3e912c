#![doc = r#"
gridnorm — normalize an image corpus for batch training.

Every decodable image under a directory is downscaled to a fixed pixel budget
(1088 x 1088), cropped so both sides are multiples of 32, converted to YCbCr and
re-encoded as a maximum-quality JPEG in place. Image sizes are clustered with
k-means to summarize the corpus, and the fraction of each image's area lost to
cropping is reported in a `statistics.txt` file next to the images.

Back up first
-------------
A real run is destructive: images are overwritten and renamed in place, and the
final sweeps delete non-image files and undersized outputs. Nothing can be rolled
back. Use `dry_run` to preview the outcome without touching the tree.

Quick start
-----------
```rust,no_run
use std::path::Path;
use gridnorm::{run_pipeline, NormalizeParams};

fn main() -> gridnorm::Result<()> {
    let params = NormalizeParams::default();
    let summary = run_pipeline(Path::new("/data/corpus"), 12, &params)?;
    println!(
        "normalized={} failed={} mean loss={:.2}%",
        summary.transformed,
        summary.failed.len(),
        summary.report.loss.mean * 100.0
    );
    Ok(())
}
```

Planning without I/O
--------------------
```rust
use gridnorm::{plan_image, NormalizeParams};

let plan = plan_image(4000, 3000, &NormalizeParams::default()).unwrap();
assert_eq!(plan.scaled, (1088, 816));
assert_eq!(plan.final_size(), (1088, 800));
assert!(plan.loss_ratio() < 0.002);
```

Error handling
--------------
All public functions return `gridnorm::Result<T>`. Per-file decode and
transform failures never abort a run; they are collected in
`RunSummary::failed`. Run-level conditions surface as `Error` variants:

```rust,no_run
use std::path::Path;
use gridnorm::{run_pipeline, Error, NormalizeParams};

match run_pipeline(Path::new("/data/empty"), 4, &NormalizeParams::default()) {
    Ok(summary) => println!("{}", summary.report_text),
    Err(Error::InsufficientData { context }) => eprintln!("nothing to do: {context}"),
    Err(other) => eprintln!("run failed: {other}"),
}
```

Useful modules
--------------
- [`api`] — pipeline entry points and per-phase helpers.
- [`core`] — parameters, k-means, loss accounting, transform primitives.
- [`io`] — scanning, quarantine, cleanup sweeps, JPEG and report writers.
- [`types`] — `ImageRecord` and shared enums.
- [`error`] — crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use core::cluster::{ClusterModel, KMeansConfig};
pub use core::params::{GRID_ALIGN, MAX_PIXELS, NormalizeParams};
pub use core::processing::geometry::{CropRect, TransformPlan};
pub use core::processing::normalize::NormalizedImage;
pub use core::stats::{CorpusReport, HighLossEntry, LossStats, SizeBucket};
pub use error::{Error, Result};
pub use io::{CleanupReport, OutputCollision};
pub use types::{ImageRecord, NInit, RecordStatus, ResampleFilter};

// High-level API re-exports
pub use api::{
    FailedFile, RunSummary, apply_labels, apply_outcomes, cluster_sizes, normalize_file,
    plan_image, run_pipeline, transform_records, write_summary_json,
};
