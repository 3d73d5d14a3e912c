//! Filesystem layer: corpus scanning and quarantine, cleanup sweeps, and
//! `writers` for JPEG outputs and the statistics report.
pub mod cleanup;
pub mod scan;
pub use cleanup::{CleanupReport, sweep};
pub use scan::{OutputCollision, ScanResult, assign_output_paths, scan_corpus};

pub mod writers;
