#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Camera intrinsics and their mapping from reconstruction records.
pub mod camera;

/// Readers for the reconstruction and capture records consumed by the pipeline.
pub mod io;

/// Raw poses and their conversion to the canonical camera-to-world convention.
pub mod pose;

/// Rotation representation conversions.
pub mod transforms;
