use std::path::Path;

use serde::Deserialize;

use super::{read_json, JsonError};
use crate::{camera::RawIntrinsics, pose::RawPose};

/// The `metadata.json` file of a Record3D export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Record3dMetadata {
    /// One `[qx, qy, qz, qw, tx, ty, tz]` camera-to-world pose per frame.
    pub poses: Vec<[f64; 7]>,
    /// The camera matrix, flattened column major.
    #[serde(rename = "K")]
    pub k: [f64; 9],
    /// Image width.
    pub w: u32,
    /// Image height.
    pub h: u32,
}

impl Record3dMetadata {
    /// The pose of frame `index`, if the capture has one.
    pub fn raw_pose(&self, index: usize) -> Option<RawPose> {
        self.poses.get(index).map(|p| RawPose::Record3d {
            quaternion: [p[0], p[1], p[2], p[3]],
            position: [p[4], p[5], p[6]],
        })
    }

    /// The intrinsics shared by every frame.
    pub fn raw_intrinsics(&self) -> RawIntrinsics {
        RawIntrinsics::Record3d {
            k: self.k,
            width: self.w,
            height: self.h,
        }
    }
}

/// Read the `metadata.json` file of a Record3D export.
pub fn read_metadata_json(path: impl AsRef<Path>) -> Result<Record3dMetadata, JsonError> {
    read_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_metadata_json() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("metadata.json");
        std::fs::write(
            &path,
            r#"{
                "w": 720, "h": 960, "fps": 60,
                "K": [700.0, 0.0, 0.0, 0.0, 700.0, 0.0, 360.0, 480.0, 1.0],
                "poses": [[0.0, 0.0, 0.0, 1.0, 0.5, 0.25, -1.0]]
            }"#,
        )?;

        let metadata = read_metadata_json(&path)?;
        assert_eq!((metadata.w, metadata.h), (720, 960));
        assert_eq!(
            metadata.raw_pose(0),
            Some(RawPose::Record3d {
                quaternion: [0.0, 0.0, 0.0, 1.0],
                position: [0.5, 0.25, -1.0]
            })
        );
        assert_eq!(metadata.raw_pose(1), None);
        Ok(())
    }
}
