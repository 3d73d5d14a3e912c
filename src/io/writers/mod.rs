//! Output writers: the atomic JPEG encoder and the text report.
pub mod jpeg;
pub mod report;
