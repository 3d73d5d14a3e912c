use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gridnorm::{NInit, NormalizeParams, run_pipeline, write_summary_json};

use super::args::CliArgs;
use super::errors::AppError;

fn init_logging(args: &CliArgs) {
    if !(args.log || args.verbose) {
        return;
    }
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_params(args: &CliArgs) -> Result<NormalizeParams, AppError> {
    let mut params = match &args.config {
        Some(path) => NormalizeParams::from_json_file(path)?,
        None => NormalizeParams::default(),
    };
    if let Some(seed) = args.seed {
        params.seed = seed;
    }
    if let Some(n) = args.n_init {
        params.n_init = NInit::Fixed(n);
    }
    if args.threads.is_some() {
        params.threads = args.threads;
    }
    if let Some(filter) = args.filter {
        params.filter = filter;
    }
    if let Some(quality) = args.quality {
        params.jpeg_quality = quality;
    }
    if args.dry_run {
        params.dry_run = true;
    }
    params.validate()?;
    Ok(params)
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&args);

    if !args.input_dir.is_dir() {
        return Err(AppError::MissingInput {
            dir: args.input_dir.display().to_string(),
        }
        .into());
    }
    if args.clusters == 0 {
        return Err(AppError::ZeroClusters {
            clusters: args.clusters,
        }
        .into());
    }

    let params = build_params(&args)?;
    if !params.dry_run && !args.backup_acknowledged {
        return Err(AppError::BackupNotAcknowledged {
            dir: args.input_dir.display().to_string(),
        }
        .into());
    }

    let summary = run_pipeline(&args.input_dir, args.clusters, &params).map_err(AppError::from)?;

    if params.dry_run {
        println!("{}", summary.report_text);
    }
    if let Some(path) = &args.summary_json {
        write_summary_json(path, &summary).map_err(AppError::from)?;
        info!("Summary written to {:?}", path);
    }

    for failure in &summary.failed {
        warn!("Not normalized: {:?} ({})", failure.path, failure.reason);
    }
    info!("Run complete!");
    info!("Scanned: {}", summary.images_scanned);
    info!("Normalized: {}", summary.transformed);
    info!("Failed: {}", summary.failed.len());
    info!("Quarantined: {}", summary.quarantined.len());
    if let Some(cleanup) = &summary.cleanup {
        info!(
            "Removed: {} foreign, {} undersized",
            cleanup.removed_foreign.len(),
            cleanup.removed_undersized.len()
        );
    }
    if let Some(path) = &summary.report_path {
        info!("Report: {:?}", path);
    }

    Ok(())
}
