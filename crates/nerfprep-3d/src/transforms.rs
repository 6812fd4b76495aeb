use glam::{DMat3, DQuat, DVec3};

/// Axis-angle vectors with a norm below this value map to the identity rotation.
pub const AXIS_ANGLE_EPS: f64 = 1e-8;

/// Compute the rotation matrix from a quaternion in (w, x, y, z) order.
///
/// The quaternion is used as given, following the COLMAP convention for
/// reconstructed image records.
///
/// # Arguments
///
/// * `q` - The quaternion `[qw, qx, qy, qz]`.
///
/// # Returns
///
/// The rotation matrix.
///
/// Example:
///
/// ```
/// use nerfprep_3d::transforms::quaternion_to_rotation_matrix;
///
/// let rotation = quaternion_to_rotation_matrix(&[1.0, 0.0, 0.0, 0.0]);
/// assert_eq!(rotation, glam::DMat3::IDENTITY);
/// ```
pub fn quaternion_to_rotation_matrix(q: &[f64; 4]) -> DMat3 {
    let [w, x, y, z] = *q;
    DMat3::from_quat(DQuat::from_xyzw(x, y, z, w))
}

/// Compute the rotation matrix from a scalar-last quaternion (x, y, z, w).
///
/// Unlike [`quaternion_to_rotation_matrix`] the quaternion is normalized first.
///
/// # Arguments
///
/// * `q` - The quaternion `[qx, qy, qz, qw]`.
///
/// # Returns
///
/// The rotation matrix, or `None` for a zero quaternion.
pub fn quaternion_xyzw_to_rotation_matrix(q: &[f64; 4]) -> Option<DMat3> {
    let quat = DQuat::from_array(*q);
    let norm_squared = quat.length_squared();
    if norm_squared == 0.0 || !norm_squared.is_finite() {
        return None;
    }
    Some(DMat3::from_quat(quat.normalize()))
}

/// Convert an axis-angle vector to a quaternion in (w, x, y, z) order.
///
/// The norm of the vector is the rotation angle. Vectors with a norm of at
/// most [`AXIS_ANGLE_EPS`] yield the identity quaternion.
///
/// Example:
///
/// ```
/// use nerfprep_3d::transforms::axis_angle_to_quaternion;
///
/// assert_eq!(axis_angle_to_quaternion(&[0.0, 0.0, 0.0]), [1.0, 0.0, 0.0, 0.0]);
/// ```
pub fn axis_angle_to_quaternion(axis_angle: &[f64; 3]) -> [f64; 4] {
    let scaled_axis = DVec3::from_array(*axis_angle);
    let angle = scaled_axis.length();
    if angle <= AXIS_ANGLE_EPS {
        return [1.0, 0.0, 0.0, 0.0];
    }

    let q = DQuat::from_axis_angle(scaled_axis / angle, angle);
    [q.w, q.x, q.y, q.z]
}
