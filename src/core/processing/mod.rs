//! Image transform primitives: geometry planning, resampling, cropping
//! and the per-file normalizer built from them.
pub mod crop;
pub mod geometry;
pub mod normalize;
pub mod resize;
