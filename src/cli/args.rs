use clap::Parser;
use std::path::PathBuf;

use gridnorm::ResampleFilter;

#[derive(Parser, Debug)]
#[command(name = "gridnorm", version, about = "Normalize an image corpus to a 32-aligned pixel budget")]
pub struct CliArgs {
    /// Root directory of the corpus (processed in place)
    pub input_dir: PathBuf,

    /// Number of size clusters used for the report
    #[arg(short = 'k', long, default_value_t = 12)]
    pub clusters: usize,

    /// JSON file with normalization parameters; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Seed for k-means initialisation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of k-means restarts (default: a single k-means++ seeding)
    #[arg(long)]
    pub n_init: Option<usize>,

    /// Worker threads for scanning and transforming (default: one per core)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Resampling filter used when downscaling
    #[arg(long, value_enum)]
    pub filter: Option<ResampleFilter>,

    /// JPEG quality (1-100)
    #[arg(long)]
    pub quality: Option<u8>,

    /// Scan, cluster and plan only; no file is written, moved or deleted
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Confirm the corpus is backed up; required for a destructive run
    #[arg(long = "i-have-a-backup", default_value_t = false)]
    pub backup_acknowledged: bool,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Enable logging
    #[arg(long, default_value_t = false)]
    pub log: bool,

    /// Debug-level logging (implies --log)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
