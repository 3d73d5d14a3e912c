//! Bounded worker pools for the scan and transform phases.
use tracing::debug;

use crate::error::{Error, Result};

/// Build a dedicated rayon pool. `None` sizes it to the available cores.
pub fn build_worker_pool(threads: Option<usize>, phase: &str) -> Result<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(Error::InvalidArgument {
            arg: "threads",
            value: "0".to_string(),
        });
    }

    let threads = threads.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    debug!("Building {} pool with {} workers", phase, threads);

    let phase_name = phase.to_string();
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(move |i| format!("gridnorm-{}-{}", phase_name, i))
        .build()
        .map_err(|e| Error::ThreadPool(format!("failed to build {phase} pool: {e}")))
}
