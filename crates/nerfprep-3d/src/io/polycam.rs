use std::path::Path;

use serde::Deserialize;

use super::{read_json, JsonError};
use crate::{camera::RawIntrinsics, pose::RawPose};

/// A per-frame camera file of a Polycam export, `keyframes/cameras/<stem>.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[allow(missing_docs)]
pub struct PolycamCamera {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub width: u32,
    pub height: u32,
    pub t_00: f64,
    pub t_01: f64,
    pub t_02: f64,
    pub t_03: f64,
    pub t_10: f64,
    pub t_11: f64,
    pub t_12: f64,
    pub t_13: f64,
    pub t_20: f64,
    pub t_21: f64,
    pub t_22: f64,
    pub t_23: f64,
    /// Sharpness of the frame, higher is sharper.
    #[serde(default)]
    pub blur_score: Option<f64>,
}

impl PolycamCamera {
    /// The first three rows of the camera-to-world matrix.
    pub fn rows(&self) -> [[f64; 4]; 3] {
        [
            [self.t_00, self.t_01, self.t_02, self.t_03],
            [self.t_10, self.t_11, self.t_12, self.t_13],
            [self.t_20, self.t_21, self.t_22, self.t_23],
        ]
    }

    /// The pose of the frame.
    pub fn raw_pose(&self) -> RawPose {
        RawPose::Polycam { rows: self.rows() }
    }

    /// The intrinsics of the frame.
    pub fn raw_intrinsics(&self) -> RawIntrinsics {
        RawIntrinsics::Polycam {
            fx: self.fx,
            fy: self.fy,
            cx: self.cx,
            cy: self.cy,
            width: self.width,
            height: self.height,
        }
    }
}

/// Read one Polycam camera file.
pub fn read_camera_json(path: impl AsRef<Path>) -> Result<PolycamCamera, JsonError> {
    read_json(path)
}
