#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Pose normalization and dataset assembly.
pub mod assemble;

/// Capture sources, pose solvers and their raw records.
pub mod backend;

/// The dataset descriptor and its atomic write.
pub mod descriptor;

/// Error types for the dataset module.
pub mod error;

/// Blur score filtering.
pub mod filter;

/// End to end processing of every capture source.
pub mod pipeline;

/// Injected run logging.
pub mod report;

/// Evenly spaced frame subsampling.
pub mod sampler;

/// Match quality and the run summary.
pub mod summary;

pub use crate::error::DatasetError;
