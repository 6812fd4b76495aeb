use crate::pose::RawPose;

/// Represents a Colmap camera model id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraModelId {
    /// Simple pinhole camera model
    SimplePinhole = 0,
    /// Pinhole camera model
    Pinhole = 1,
    /// Simplified radial camera model
    SimpleRadial = 2,
    /// Radial camera model
    Radial = 3,
    /// OpenCV camera model
    OpenCV = 4,
    /// OpenCV fisheye camera model
    OpenCVFisheye = 5,
    /// Full OpenCV camera model
    FullOpenCV = 6,
    /// Field of view camera model
    Fov = 7,
    /// Simple radial fisheye camera model
    SimpleRadialFisheye = 8,
    /// Radial fisheye camera model
    RadialFisheye = 9,
    /// Thin prism fisheye camera model
    ThinPrismFisheye = 10,
}

impl CameraModelId {
    /// Number of entries in the camera `params` array for this model.
    pub fn num_params(&self) -> usize {
        match self {
            CameraModelId::SimplePinhole => 3,
            CameraModelId::Pinhole => 4,
            CameraModelId::SimpleRadial => 4,
            CameraModelId::Radial => 5,
            CameraModelId::OpenCV => 8,
            CameraModelId::OpenCVFisheye => 8,
            CameraModelId::FullOpenCV => 12,
            CameraModelId::Fov => 5,
            CameraModelId::SimpleRadialFisheye => 4,
            CameraModelId::RadialFisheye => 5,
            CameraModelId::ThinPrismFisheye => 12,
        }
    }
}

/// Represents a camera in the Colmap system.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapCamera {
    /// Camera id
    pub camera_id: u32,
    /// Camera model id
    pub model_id: CameraModelId,
    /// Image width
    pub width: u32,
    /// Image height
    pub height: u32,
    /// Camera parameters
    pub params: Vec<f64>,
}

/// Represents a registered image in the Colmap system.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapImage {
    /// Image name
    pub name: String,
    /// Image id
    pub image_id: u32,
    /// Camera id
    pub camera_id: u32,
    /// Rotation
    pub rotation: [f64; 4], // qw, qx, qy, qz
    /// Translation
    pub translation: [f64; 3], // x, y, z
}

impl ColmapImage {
    /// The world-to-camera pose of the image.
    pub fn raw_pose(&self) -> RawPose {
        RawPose::Colmap {
            qvec: self.rotation,
            tvec: self.translation,
        }
    }
}

/// The cameras and registered images of a sparse reconstruction.
#[derive(Debug, Clone, Default)]
pub struct ColmapModel {
    /// Cameras of the reconstruction.
    pub cameras: Vec<ColmapCamera>,
    /// Registered images of the reconstruction.
    pub images: Vec<ColmapImage>,
}

impl ColmapModel {
    /// Find a camera by id.
    pub fn camera(&self, camera_id: u32) -> Option<&ColmapCamera> {
        self.cameras.iter().find(|c| c.camera_id == camera_id)
    }
}
