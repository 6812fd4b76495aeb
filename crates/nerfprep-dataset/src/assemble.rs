use nerfprep_3d::camera::Intrinsics;

use crate::{
    backend::RawFrame,
    descriptor::{validate_dataset, Dataset, Frame, OrientationOverride},
    error::DatasetError,
    report::Reporter,
};

/// The image folder every frame path points into.
pub const IMAGE_DIR_NAME: &str = "images";

/// Frames converted to the canonical convention.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPoses {
    /// Frames with a valid pose, in input order.
    pub frames: Vec<Frame>,
    /// Number of frames dropped for a singular or degenerate pose.
    pub num_invalid: usize,
}

/// The dataset path of an image, `./images/<name>`.
pub fn frame_file_path(image_name: &str) -> String {
    format!("./{IMAGE_DIR_NAME}/{image_name}")
}

/// Convert every raw pose to a canonical camera-to-world matrix.
///
/// Frames whose pose cannot be converted are dropped and reported as warnings.
pub fn normalize_poses(frames: &[RawFrame], reporter: &dyn Reporter) -> NormalizedPoses {
    let mut normalized = Vec::with_capacity(frames.len());
    let mut num_invalid = 0;

    for frame in frames.iter() {
        match frame.pose.to_camera_to_world() {
            Ok(transform_matrix) => normalized.push(Frame {
                file_path: frame_file_path(&frame.image_name),
                transform_matrix,
                blur_score: frame.blur_score,
            }),
            Err(e) => {
                num_invalid += 1;
                reporter.warn(&format!("Skipping {}: {e}", frame.image_name));
            }
        }
    }

    NormalizedPoses {
        frames: normalized,
        num_invalid,
    }
}

/// Build the dataset from its intrinsics and posed frames.
///
/// # Errors
///
/// [`DatasetError::EmptyDataset`] without frames and
/// [`DatasetError::DuplicateFilePath`] if two frames share an image.
pub fn assemble_dataset(
    intrinsics: Intrinsics,
    frames: Vec<Frame>,
    orientation_override: Option<OrientationOverride>,
) -> Result<Dataset, DatasetError> {
    let dataset = Dataset {
        intrinsics,
        frames,
        orientation_override,
    };
    validate_dataset(&dataset)?;
    Ok(dataset)
}
