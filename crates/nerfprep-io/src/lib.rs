#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the io module.
pub mod error;

/// Listing, copying and cropping of dataset images.
pub mod images;

/// Downscaled image tiers.
pub mod pyramid;

/// Blocking child process helpers.
pub mod process;

/// Structure-from-motion engine runners.
pub mod sfm;

/// Frame extraction from videos.
pub mod video;

pub use crate::error::IoError;
