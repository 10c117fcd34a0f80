//! Rotation and intrinsics composition for rectification
//!
//! The lookup table builder consumes a single 3x3 matrix `R_on * K^-1` that
//! takes a homogeneous pixel of the new (rectified) linear camera to a ray in
//! the old (source) camera frame. This module builds that matrix and the
//! cropped target intrinsics derived from the valid region bounds.

use nalgebra::{Matrix3, Rotation3};

use crate::error::RectifyError;
use crate::range::Range;

/// Determinants below this are treated as singular
const SINGULAR_EPSILON: f64 = 1e-12;

/// Intrinsics matrix of a linear camera
pub fn intrinsics_matrix(fx: f64, fy: f64, cx: f64, cy: f64) -> Matrix3<f64> {
    Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0)
}

/// Rotation from roll (about Z), pitch (about X) and yaw (about Y) in degrees.
///
/// Axes follow the camera frame: X right, Y down, Z forward.
pub fn rotation_from_euler_deg(roll: f64, pitch: f64, yaw: f64) -> Matrix3<f64> {
    let rz = Rotation3::from_axis_angle(&nalgebra::Vector3::z_axis(), roll.to_radians());
    let rx = Rotation3::from_axis_angle(&nalgebra::Vector3::x_axis(), pitch.to_radians());
    let ry = Rotation3::from_axis_angle(&nalgebra::Vector3::y_axis(), yaw.to_radians());
    (ry * rx * rz).into_inner()
}

/// Compose the builder matrix `R_on * K^-1`.
///
/// `rotation` takes rays of the new camera into the old camera frame and `k`
/// is the new camera's intrinsics.
pub fn rotation_times_k_inverse(
    rotation: &Matrix3<f64>,
    k: &Matrix3<f64>,
) -> Result<Matrix3<f64>, RectifyError> {
    if k.determinant().abs() < SINGULAR_EPSILON {
        return Err(RectifyError::SingularIntrinsics);
    }
    let k_inv = k.try_inverse().ok_or(RectifyError::SingularIntrinsics)?;
    Ok(rotation * k_inv)
}

/// Target camera restricted to a valid pixel region
#[derive(Debug, Clone, PartialEq)]
pub struct CroppedTarget {
    /// Intrinsics with the principal point shifted into the cropped frame
    pub k: Matrix3<f64>,
    pub width: usize,
    pub height: usize,
    /// Pixel of the uncropped frame that becomes (0, 0)
    pub offset: (usize, usize),
}

/// Crop a target camera to the integer pixels inside `cols` x `rows`.
pub fn crop_to_valid_region(
    k: &Matrix3<f64>,
    cols: &Range,
    rows: &Range,
) -> Result<CroppedTarget, RectifyError> {
    let (x0, width) = integer_span(cols);
    let (y0, height) = integer_span(rows);
    if width == 0 || height == 0 {
        return Err(RectifyError::InvalidTableSize(width, height));
    }

    let mut cropped = *k;
    cropped[(0, 2)] -= x0 as f64;
    cropped[(1, 2)] -= y0 as f64;

    Ok(CroppedTarget {
        k: cropped,
        width,
        height,
        offset: (x0, y0),
    })
}

/// First pixel and pixel count of the integers inside a range, clipped at 0.
fn integer_span(range: &Range) -> (usize, usize) {
    if !range.lo.is_finite() || !range.hi.is_finite() || range.is_empty() {
        return (0, 0);
    }
    let first = range.lo.ceil().max(0.0);
    let last = range.hi.floor();
    if last < first {
        return (first as usize, 0);
    }
    (first as usize, (last - first) as usize + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_identity_composition() {
        let k = intrinsics_matrix(500.0, 500.0, 320.0, 240.0);
        let m = rotation_times_k_inverse(&Matrix3::identity(), &k).unwrap();
        let ray = m * Vector3::new(320.0, 240.0, 1.0);
        assert_relative_eq!(ray, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);

        let ray = m * Vector3::new(820.0, 240.0, 1.0);
        assert_relative_eq!(ray, Vector3::new(1.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_singular_intrinsics() {
        let k = intrinsics_matrix(0.0, 500.0, 320.0, 240.0);
        assert_eq!(
            rotation_times_k_inverse(&Matrix3::identity(), &k),
            Err(RectifyError::SingularIntrinsics)
        );
    }

    #[test]
    fn test_euler_rotation() {
        assert_relative_eq!(
            rotation_from_euler_deg(0.0, 0.0, 0.0),
            Matrix3::identity(),
            epsilon = 1e-15
        );

        // Yaw of 90 degrees turns the optical axis towards +X
        let r = rotation_from_euler_deg(0.0, 0.0, 90.0);
        assert_relative_eq!(
            r * Vector3::z(),
            Vector3::new(1.0, 0.0, 0.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_crop_to_valid_region() {
        let k = intrinsics_matrix(400.0, 400.0, 320.0, 240.0);
        let cols = Range::new(10.4, 629.0);
        let rows = Range::new(-3.0, 470.9);
        let cropped = crop_to_valid_region(&k, &cols, &rows).unwrap();

        assert_eq!(cropped.offset, (11, 0));
        assert_eq!(cropped.width, 619);
        assert_eq!(cropped.height, 471);
        assert_relative_eq!(cropped.k[(0, 2)], 309.0);
        assert_relative_eq!(cropped.k[(1, 2)], 240.0);
        assert_relative_eq!(cropped.k[(0, 0)], 400.0);
    }

    #[test]
    fn test_crop_empty_region() {
        let k = intrinsics_matrix(400.0, 400.0, 320.0, 240.0);
        let cols = Range::new(100.2, 100.8);
        let rows = Range::new(0.0, 479.0);
        assert_eq!(
            crop_to_valid_region(&k, &cols, &rows),
            Err(RectifyError::InvalidTableSize(0, 480))
        );
        assert!(crop_to_valid_region(&k, &Range::open(), &rows).is_err());
    }
}
