use std::{
    collections::HashSet,
    io::Write,
    path::{Path, PathBuf},
};

use nerfprep_3d::{
    camera::{CameraModel, Intrinsics},
    pose::Matrix4,
};
use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// File name of the dataset descriptor.
pub const DESCRIPTOR_FILE_NAME: &str = "transforms.json";

/// Hint for the orientation step of downstream loaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationOverride {
    /// Keep the poses as they are, the capture is already gravity aligned.
    None,
}

/// A posed image of the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Path relative to the dataset root, `./images/frame_00001.<ext>`.
    pub file_path: String,
    /// Canonical camera-to-world matrix.
    pub transform_matrix: Matrix4,
    /// Sharpness reported by the capture app.
    pub blur_score: Option<f64>,
}

/// A posed image dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Intrinsics shared by every frame.
    pub intrinsics: Intrinsics,
    /// The frames in dataset order.
    pub frames: Vec<Frame>,
    /// Orientation hint, omitted from the descriptor when `None`.
    pub orientation_override: Option<OrientationOverride>,
}

/// A frame of the descriptor file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Path relative to the dataset root.
    pub file_path: String,
    /// Camera-to-world matrix.
    pub transform_matrix: Matrix4,
}

/// The descriptor file, `transforms.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformsFile {
    /// Focal length along x.
    pub fl_x: f64,
    /// Focal length along y.
    pub fl_y: f64,
    /// Principal point x.
    pub cx: f64,
    /// Principal point y.
    pub cy: f64,
    /// Image width.
    pub w: u32,
    /// Image height.
    pub h: u32,
    /// Camera model.
    pub camera_model: CameraModel,
    /// First radial coefficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k1: Option<f64>,
    /// Second radial coefficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k2: Option<f64>,
    /// Third radial coefficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k3: Option<f64>,
    /// Fourth radial coefficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k4: Option<f64>,
    /// First tangential coefficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p1: Option<f64>,
    /// Second tangential coefficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p2: Option<f64>,
    /// Orientation hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation_override: Option<OrientationOverride>,
    /// The frames.
    pub frames: Vec<FrameRecord>,
}

impl From<&Dataset> for TransformsFile {
    fn from(dataset: &Dataset) -> Self {
        let intrinsics = &dataset.intrinsics;
        let mut file = TransformsFile {
            fl_x: intrinsics.fl_x,
            fl_y: intrinsics.fl_y,
            cx: intrinsics.cx,
            cy: intrinsics.cy,
            w: intrinsics.width,
            h: intrinsics.height,
            camera_model: intrinsics.camera_model,
            k1: None,
            k2: None,
            k3: None,
            k4: None,
            p1: None,
            p2: None,
            orientation_override: dataset.orientation_override,
            frames: dataset
                .frames
                .iter()
                .map(|frame| FrameRecord {
                    file_path: frame.file_path.clone(),
                    transform_matrix: frame.transform_matrix,
                })
                .collect(),
        };

        for (name, value) in intrinsics.distortion.coefficients() {
            let slot = match name {
                "k1" => &mut file.k1,
                "k2" => &mut file.k2,
                "k3" => &mut file.k3,
                "k4" => &mut file.k4,
                "p1" => &mut file.p1,
                "p2" => &mut file.p2,
                _ => continue,
            };
            *slot = Some(value);
        }

        file
    }
}

/// Check the dataset before it is written: unique file paths and affine poses.
pub fn validate_dataset(dataset: &Dataset) -> Result<(), DatasetError> {
    if dataset.frames.is_empty() {
        return Err(DatasetError::EmptyDataset);
    }

    let mut seen = HashSet::new();
    for frame in dataset.frames.iter() {
        if !seen.insert(frame.file_path.as_str()) {
            return Err(DatasetError::DuplicateFilePath(frame.file_path.clone()));
        }
        if frame.transform_matrix[3] != [0.0, 0.0, 0.0, 1.0] {
            return Err(DatasetError::InvalidArgument(format!(
                "pose of {} is not affine",
                frame.file_path
            )));
        }
    }

    Ok(())
}

/// Serialize the descriptor with four space indentation.
pub fn to_json_pretty(file: &TransformsFile) -> Result<Vec<u8>, DatasetError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    file.serialize(&mut serializer)?;
    Ok(buf)
}

/// Write the dataset descriptor into `output_dir`.
///
/// The descriptor is written to a temporary file in `output_dir` and renamed
/// to [`DESCRIPTOR_FILE_NAME`], so a failed run never leaves a partial file.
///
/// # Returns
///
/// The path of the descriptor.
pub fn write_dataset(dataset: &Dataset, output_dir: impl AsRef<Path>) -> Result<PathBuf, DatasetError> {
    let output_dir = output_dir.as_ref();
    validate_dataset(dataset)?;

    let data = to_json_pretty(&TransformsFile::from(dataset))?;

    let mut tmp = tempfile::NamedTempFile::new_in(output_dir)?;
    tmp.write_all(&data)?;
    tmp.flush()?;

    let path = output_dir.join(DESCRIPTOR_FILE_NAME);
    tmp.persist(&path).map_err(|e| e.error)?;
    log::debug!("Wrote {}", path.display());

    Ok(path)
}

/// Read a dataset descriptor.
pub fn read_transforms(path: impl AsRef<Path>) -> Result<TransformsFile, DatasetError> {
    let data = std::fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}
