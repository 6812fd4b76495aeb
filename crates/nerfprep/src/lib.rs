#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use nerfprep_3d as k3d;

#[doc(inline)]
pub use nerfprep_io as io;

#[doc(inline)]
pub use nerfprep_dataset as dataset;
