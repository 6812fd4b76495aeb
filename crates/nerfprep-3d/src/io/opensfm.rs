use std::{collections::BTreeMap, path::Path};

use serde::Deserialize;

use super::{read_json, JsonError};
use crate::pose::RawPose;

/// A camera entry of an OpenSfM reconstruction.
///
/// Optional fields are absent for some projection types, e.g. an
/// equirectangular camera carries neither focal length nor distortion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OpenSfmCamera {
    /// Projection type, e.g. `brown`, `fisheye_opencv` or `equirectangular`.
    pub projection_type: Option<String>,
    /// Image width.
    pub width: u32,
    /// Image height.
    pub height: u32,
    /// Focal length along x in pixels.
    pub focal_x: Option<f64>,
    /// Focal length along y in pixels.
    pub focal_y: Option<f64>,
    /// Principal point x.
    pub c_x: Option<f64>,
    /// Principal point y.
    pub c_y: Option<f64>,
    /// First radial coefficient.
    pub k1: Option<f64>,
    /// Second radial coefficient.
    pub k2: Option<f64>,
    /// Third radial coefficient.
    pub k3: Option<f64>,
    /// Fourth radial coefficient.
    pub k4: Option<f64>,
    /// First tangential coefficient.
    pub p1: Option<f64>,
    /// Second tangential coefficient.
    pub p2: Option<f64>,
}

/// A posed shot of an OpenSfM reconstruction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OpenSfmShot {
    /// World-to-camera rotation as an axis-angle vector.
    pub rotation: [f64; 3],
    /// World-to-camera translation.
    pub translation: [f64; 3],
}

impl OpenSfmShot {
    /// The world-to-camera pose of the shot.
    pub fn raw_pose(&self) -> RawPose {
        RawPose::OpenSfm {
            rotation: self.rotation,
            translation: self.translation,
        }
    }
}

/// One connected reconstruction of `reconstruction.json`.
///
/// Cameras and shots are keyed by name; `BTreeMap` keeps them sorted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OpenSfmReconstruction {
    /// Cameras by id.
    pub cameras: BTreeMap<String, OpenSfmCamera>,
    /// Shots by image name.
    pub shots: BTreeMap<String, OpenSfmShot>,
}

impl OpenSfmReconstruction {
    /// The first camera of the reconstruction, the dataset assumes a single camera.
    pub fn first_camera(&self) -> Option<&OpenSfmCamera> {
        self.cameras.values().next()
    }
}

/// Read an OpenSfM `reconstruction.json` file.
///
/// The file holds a list of reconstructions, largest first.
pub fn read_reconstruction_json(
    path: impl AsRef<Path>,
) -> Result<Vec<OpenSfmReconstruction>, JsonError> {
    read_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_reconstruction_json() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("reconstruction.json");
        std::fs::write(
            &path,
            r#"[{
                "cameras": {
                    "v2 unknown unknown 2000 1000 equirectangular 0.0": {
                        "projection_type": "equirectangular",
                        "width": 2000,
                        "height": 1000
                    }
                },
                "shots": {
                    "frame_00002.png": {"rotation": [0.0, 0.0, 0.0], "translation": [1.0, 2.0, 3.0], "camera": "x"},
                    "frame_00001.png": {"rotation": [0.1, 0.2, 0.3], "translation": [0.0, 0.0, 0.0]}
                },
                "points": {}
            }]"#,
        )?;

        let reconstructions = read_reconstruction_json(&path)?;
        assert_eq!(reconstructions.len(), 1);
        let reconstruction = &reconstructions[0];

        let camera = reconstruction.first_camera().ok_or("missing camera")?;
        assert_eq!(camera.projection_type.as_deref(), Some("equirectangular"));
        assert_eq!(camera.focal_x, None);

        let names = reconstruction.shots.keys().collect::<Vec<_>>();
        assert_eq!(names, ["frame_00001.png", "frame_00002.png"]);
        assert_eq!(
            reconstruction.shots["frame_00002.png"].raw_pose(),
            RawPose::OpenSfm {
                rotation: [0.0, 0.0, 0.0],
                translation: [1.0, 2.0, 3.0]
            }
        );
        Ok(())
    }

    #[test]
    fn test_read_reconstruction_json_missing() {
        let res = read_reconstruction_json("/nonexistent/reconstruction.json");
        assert!(matches!(res, Err(JsonError::Io { .. })));
    }
}
