//! Core building blocks: parameters, worker pools, size clustering, loss
//! accounting and the image transform primitives. These are internal
//! primitives consumed by the high-level `api` module.
pub mod cluster;
pub mod params;
pub mod pool;
pub mod processing;
pub mod stats;
