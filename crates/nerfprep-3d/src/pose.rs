//! # Canonical poses
//!
//! Every pose written to a dataset is a camera-to-world matrix in the
//! canonical convention: right handed, camera looking down `-z` with `+y` up
//! and `+x` right. Reconstruction engines report world-to-camera transforms
//! with the camera looking down `+z`; capture apps report camera-to-world
//! matrices in their own axis order. [`RawPose`] holds one variant per source
//! and [`RawPose::to_camera_to_world`] is the single place where any of them
//! is turned into the canonical form.

use glam::{DMat3, DMat4, DVec3, DVec4};

use crate::transforms::{
    axis_angle_to_quaternion, quaternion_to_rotation_matrix, quaternion_xyzw_to_rotation_matrix,
};

/// A 4x4 matrix stored row by row, as written to the dataset descriptor.
pub type Matrix4 = [[f64; 4]; 4];

/// World-to-camera transforms with a smaller absolute determinant are singular.
const SINGULAR_EPS: f64 = 1e-12;

/// Store a matrix row by row.
pub fn to_row_major(m: &DMat4) -> Matrix4 {
    m.transpose().to_cols_array_2d()
}

/// Build a matrix from its rows.
pub fn from_row_major(rows: &Matrix4) -> DMat4 {
    DMat4::from_cols_array_2d(rows).transpose()
}

/// Negates the y and z camera axes.
fn flip_camera_axes() -> DMat4 {
    DMat4::from_diagonal(DVec4::new(1.0, -1.0, -1.0, 1.0))
}

/// Swaps the x and y world axes and negates z.
fn permute_world_axes() -> DMat4 {
    DMat4::from_cols(DVec4::Y, DVec4::X, -DVec4::Z, DVec4::W)
}

/// Error types for pose conversion.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PoseError {
    /// The world-to-camera transform cannot be inverted.
    #[error("world-to-camera transform is singular")]
    SingularPose,

    /// The rotation quaternion has zero length.
    #[error("rotation quaternion has zero length")]
    DegenerateQuaternion,
}

/// A pose as reported by one of the supported sources.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPose {
    /// COLMAP image record: world-to-camera rotation as a quaternion
    /// `[qw, qx, qy, qz]` and translation.
    Colmap {
        /// Rotation quaternion, scalar first.
        qvec: [f64; 4],
        /// Translation.
        tvec: [f64; 3],
    },

    /// OpenSfM shot: world-to-camera rotation as an axis-angle vector and translation.
    OpenSfm {
        /// Axis-angle rotation, the norm is the angle in radians.
        rotation: [f64; 3],
        /// Translation.
        translation: [f64; 3],
    },

    /// Record3D pose: camera-to-world rotation as a quaternion `[qx, qy, qz, qw]`
    /// and camera position, already in the canonical axes.
    Record3d {
        /// Rotation quaternion, scalar last.
        quaternion: [f64; 4],
        /// Camera position.
        position: [f64; 3],
    },

    /// Polycam camera: the first three rows of the camera-to-world matrix,
    /// `t_00..t_23`.
    Polycam {
        /// Rows 0, 1 and 2 of the matrix.
        rows: [[f64; 4]; 3],
    },
}

impl RawPose {
    /// Convert the pose to a canonical camera-to-world matrix.
    ///
    /// The bottom row of the result is exactly `[0, 0, 0, 1]`.
    ///
    /// # Errors
    ///
    /// [`PoseError::SingularPose`] if a world-to-camera transform cannot be
    /// inverted and [`PoseError::DegenerateQuaternion`] for a zero Record3D
    /// quaternion.
    pub fn to_camera_to_world(&self) -> Result<Matrix4, PoseError> {
        match self {
            RawPose::Colmap { qvec, tvec } => {
                let rotation = quaternion_to_rotation_matrix(qvec);
                world_to_camera_to_canonical(&rotation, &DVec3::from_array(*tvec))
            }
            RawPose::OpenSfm {
                rotation,
                translation,
            } => {
                let qvec = axis_angle_to_quaternion(rotation);
                let rotation = quaternion_to_rotation_matrix(&qvec);
                world_to_camera_to_canonical(&rotation, &DVec3::from_array(*translation))
            }
            RawPose::Record3d {
                quaternion,
                position,
            } => {
                let rotation = quaternion_xyzw_to_rotation_matrix(quaternion)
                    .ok_or(PoseError::DegenerateQuaternion)?;
                let mut c2w = DMat4::from_mat3(rotation);
                c2w.w_axis = DVec3::from_array(*position).extend(1.0);

                // the capture app exports single precision poses
                let mut rows = to_row_major(&c2w);
                for row in rows.iter_mut().take(3) {
                    for val in row.iter_mut() {
                        *val = *val as f32 as f64;
                    }
                }
                Ok(rows)
            }
            RawPose::Polycam { rows } => Ok([rows[2], rows[0], rows[1], [0.0, 0.0, 0.0, 1.0]]),
        }
    }
}

/// Convert a world-to-camera transform in the `+z` forward camera convention
/// into a canonical camera-to-world matrix.
///
/// The steps are:
///
/// 1. build `W2C = [[R | t], [0, 0, 0, 1]]`,
/// 2. invert it,
/// 3. negate columns 1 and 2 of the rotation block,
/// 4. swap rows 0 and 1,
/// 5. negate row 2.
///
/// # Arguments
///
/// * `rotation` - World-to-camera rotation.
/// * `translation` - World-to-camera translation.
///
/// # Returns
///
/// The canonical camera-to-world matrix.
///
/// # Errors
///
/// [`PoseError::SingularPose`] if `W2C` has a vanishing or non-finite determinant.
///
/// Example:
///
/// ```
/// use glam::{DMat3, DVec3};
/// use nerfprep_3d::pose::world_to_camera_to_canonical;
///
/// let c2w = world_to_camera_to_canonical(&DMat3::IDENTITY, &DVec3::ZERO).unwrap();
/// assert_eq!(c2w[0], [0.0, -1.0, 0.0, 0.0]);
/// assert_eq!(c2w[1], [1.0, 0.0, 0.0, 0.0]);
/// assert_eq!(c2w[2], [0.0, 0.0, 1.0, 0.0]);
/// ```
pub fn world_to_camera_to_canonical(
    rotation: &DMat3,
    translation: &DVec3,
) -> Result<Matrix4, PoseError> {
    let mut w2c = DMat4::from_mat3(*rotation);
    w2c.w_axis = translation.extend(1.0);

    let det = w2c.determinant();
    if !det.is_finite() || det.abs() < SINGULAR_EPS {
        return Err(PoseError::SingularPose);
    }

    let c2w = permute_world_axes() * w2c.inverse() * flip_camera_axes();

    let mut rows = to_row_major(&c2w);
    rows[3] = [0.0, 0.0, 0.0, 1.0];
    Ok(rows)
}

/// Undo the axis permutation and sign flips applied by
/// [`world_to_camera_to_canonical`].
///
/// The result is the camera-to-world matrix in the source convention, i.e.
/// the inverse of the original world-to-camera transform.
pub fn canonical_to_source_camera_to_world(c2w: &Matrix4) -> Matrix4 {
    let m = permute_world_axes().transpose() * from_row_major(c2w) * flip_camera_axes();
    to_row_major(&m)
}
