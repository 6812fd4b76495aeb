use nerfprep_3d::{
    camera::{CameraModel, RawIntrinsics},
    io::{
        colmap::ColmapModel, opensfm::OpenSfmReconstruction, polycam::PolycamCamera,
        record3d::Record3dMetadata,
    },
    pose::RawPose,
};
use nerfprep_io::sfm::SfmMethod;

use crate::{descriptor::OrientationOverride, error::DatasetError};

/// A supported combination of capture source and pose solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Image folder posed with COLMAP.
    ImagesColmap,
    /// Image folder posed with OpenSfM.
    ImagesOpenSfm,
    /// Video posed with COLMAP.
    VideoColmap,
    /// Video posed with OpenSfM.
    VideoOpenSfm,
    /// Insta360 video posed with OpenSfM as equirectangular frames.
    Insta360OpenSfm,
    /// Record3D capture with the app's poses.
    Record3d,
    /// Polycam capture with the app's poses.
    Polycam,
}

impl Backend {
    /// The image folder backend for `sfm_method`.
    pub fn images(sfm_method: SfmMethod) -> Self {
        match sfm_method {
            SfmMethod::Colmap => Backend::ImagesColmap,
            SfmMethod::OpenSfm => Backend::ImagesOpenSfm,
        }
    }

    /// The video backend for `sfm_method`.
    pub fn video(sfm_method: SfmMethod) -> Self {
        match sfm_method {
            SfmMethod::Colmap => Backend::VideoColmap,
            SfmMethod::OpenSfm => Backend::VideoOpenSfm,
        }
    }

    /// The pose solver, `None` when the capture app provides the poses.
    pub fn sfm_method(&self) -> Option<SfmMethod> {
        match self {
            Backend::ImagesColmap | Backend::VideoColmap => Some(SfmMethod::Colmap),
            Backend::ImagesOpenSfm | Backend::VideoOpenSfm | Backend::Insta360OpenSfm => {
                Some(SfmMethod::OpenSfm)
            }
            Backend::Record3d | Backend::Polycam => None,
        }
    }

    /// The camera model of the dataset given the one requested by the user.
    pub fn camera_model(&self, requested: CameraModel) -> CameraModel {
        match self {
            Backend::ImagesColmap
            | Backend::ImagesOpenSfm
            | Backend::VideoColmap
            | Backend::VideoOpenSfm => requested,
            Backend::Insta360OpenSfm => CameraModel::Equirectangular,
            Backend::Record3d | Backend::Polycam => CameraModel::Perspective,
        }
    }

    /// The orientation hint written to the descriptor.
    pub fn orientation_override(&self) -> Option<OrientationOverride> {
        match self {
            Backend::Polycam => Some(OrientationOverride::None),
            _ => None,
        }
    }
}

/// A frame as reported by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    /// File name of the image inside `images/`.
    pub image_name: String,
    /// The pose in the backend's convention.
    pub pose: RawPose,
    /// Sharpness reported by the capture app.
    pub blur_score: Option<f64>,
}

/// Intrinsics and frames as reported by a backend.
#[derive(Debug, Clone)]
pub struct RawCapture {
    /// Intrinsics shared by every frame.
    pub intrinsics: RawIntrinsics,
    /// Frames in dataset order.
    pub frames: Vec<RawFrame>,
}

/// Adapt a COLMAP model.
///
/// Images are ordered by name and share the camera of the first one.
pub fn colmap_capture(model: &ColmapModel) -> Result<RawCapture, DatasetError> {
    let mut images = model.images.iter().collect::<Vec<_>>();
    images.sort_by(|a, b| a.name.cmp(&b.name));

    let first = images.first().ok_or(DatasetError::EmptyDataset)?;
    let camera = model
        .camera(first.camera_id)
        .ok_or_else(|| DatasetError::MissingInput(format!("COLMAP camera {}", first.camera_id)))?;

    Ok(RawCapture {
        intrinsics: RawIntrinsics::Colmap(camera.clone()),
        frames: images
            .iter()
            .map(|image| RawFrame {
                image_name: image.name.clone(),
                pose: image.raw_pose(),
                blur_score: None,
            })
            .collect(),
    })
}

/// Adapt the first reconstruction of an OpenSfM `reconstruction.json`.
pub fn opensfm_capture(
    reconstructions: &[OpenSfmReconstruction],
) -> Result<RawCapture, DatasetError> {
    let reconstruction = reconstructions.first().ok_or(DatasetError::EmptyDataset)?;
    let camera = reconstruction
        .first_camera()
        .ok_or_else(|| DatasetError::MissingInput("OpenSfM camera".to_string()))?;

    Ok(RawCapture {
        intrinsics: RawIntrinsics::OpenSfm(camera.clone()),
        frames: reconstruction
            .shots
            .iter()
            .map(|(name, shot)| RawFrame {
                image_name: name.clone(),
                pose: shot.raw_pose(),
                blur_score: None,
            })
            .collect(),
    })
}

/// Adapt a Record3D capture.
///
/// # Arguments
///
/// * `metadata` - The capture metadata.
/// * `image_names` - Names of the copied images, one per selected frame.
/// * `indices` - Index of each selected frame in the capture.
pub fn record3d_capture(
    metadata: &Record3dMetadata,
    image_names: &[String],
    indices: &[usize],
) -> Result<RawCapture, DatasetError> {
    if image_names.len() != indices.len() {
        return Err(DatasetError::InvalidArgument(format!(
            "{} images for {} selected frames",
            image_names.len(),
            indices.len()
        )));
    }

    let frames = image_names
        .iter()
        .zip(indices.iter())
        .map(|(name, &index)| {
            Ok(RawFrame {
                image_name: name.clone(),
                pose: metadata
                    .raw_pose(index)
                    .ok_or(DatasetError::MissingPose(index))?,
                blur_score: None,
            })
        })
        .collect::<Result<Vec<_>, DatasetError>>()?;

    Ok(RawCapture {
        intrinsics: metadata.raw_intrinsics(),
        frames,
    })
}

/// Adapt Polycam cameras, given with the name of their copied image.
///
/// # Arguments
///
/// * `intrinsics` - The camera whose intrinsics the dataset uses, the first
///   sampled one even when it was later dropped.
/// * `cameras` - The kept cameras with the name of their copied image.
pub fn polycam_capture(
    intrinsics: &PolycamCamera,
    cameras: &[(String, PolycamCamera)],
) -> Result<RawCapture, DatasetError> {
    if cameras.is_empty() {
        return Err(DatasetError::EmptyDataset);
    }

    Ok(RawCapture {
        intrinsics: intrinsics.raw_intrinsics(),
        frames: cameras
            .iter()
            .map(|(name, camera)| RawFrame {
                image_name: name.clone(),
                pose: camera.raw_pose(),
                blur_score: camera.blur_score,
            })
            .collect(),
    })
}
