//! Lookup table construction
//!
//! For every output pixel of the new linear camera the builder back-projects
//! through `R_on * K^-1`, projects the resulting ray through the source camera
//! and stores the bilinear sampling descriptor for that source location.
//!
//! Off-frame locations are snapped to the nearest edge or corner pixel here,
//! once, so that `rectify` never has to test a sample against the image
//! bounds. Border pixels of the rectified image then repeat the source edge.

use std::time::Instant;

use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;
use tracing::debug;

use crate::camera::{CameraModel, LinearCamera};
use crate::error::RectifyError;
use crate::lut::{BilinearLutPoint, LookupTable};
use crate::transform::rotation_times_k_inverse;

/// Fill `lut` with the remapping from `camera` to the rotated linear camera
/// described by `r_on_k_inv` (`R_on * K^-1`).
///
/// The table must already be sized to the output resolution.
pub fn build_lookup_table<C: CameraModel + ?Sized>(
    camera: &C,
    r_on_k_inv: &Matrix3<f64>,
    lut: &mut LookupTable,
) -> Result<(), RectifyError> {
    if lut.is_empty() {
        return Err(RectifyError::EmptyTable);
    }
    let (src_w, src_h) = (camera.width(), camera.height());
    if src_w < 2 || src_h < 2 {
        return Err(RectifyError::InvalidCameraSize(src_w, src_h));
    }

    let start = Instant::now();

    lut.fill_with(src_w * src_h, |points, width| {
        points
            .par_chunks_exact_mut(width)
            .enumerate()
            .for_each(|(row, lut_row)| {
                for (col, point) in lut_row.iter_mut().enumerate() {
                    let ray = r_on_k_inv * Vector3::new(col as f64, row as f64, 1.0);
                    let p = camera.project(&ray);
                    *point = bilinear_point(p.x, p.y, src_w, src_h);
                }
            });
    });

    debug!(
        "Built {}x{} lookup table from {}x{} source in {:.2} ms",
        lut.width(),
        lut.height(),
        src_w,
        src_h,
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}

/// Build without rotation: only relinearize `camera` to the intrinsics `k`.
pub fn build_lookup_table_unrotated<C: CameraModel + ?Sized>(
    camera: &C,
    k: &Matrix3<f64>,
    lut: &mut LookupTable,
) -> Result<(), RectifyError> {
    let k_inv = rotation_times_k_inverse(&Matrix3::identity(), k)?;
    build_lookup_table(camera, &k_inv, lut)
}

/// Allocate and build a table sized to `target`.
///
/// `rotation` is `R_on`, taking rays of the target camera into the source
/// camera frame.
pub fn lookup_table_for_target<C: CameraModel + ?Sized>(
    camera: &C,
    rotation: &Matrix3<f64>,
    target: &LinearCamera,
) -> Result<LookupTable, RectifyError> {
    let mut lut = LookupTable::new(target.width, target.height)?;
    let r_on_k_inv = rotation_times_k_inverse(rotation, &target.k())?;
    build_lookup_table(camera, &r_on_k_inv, &mut lut)?;
    Ok(lut)
}

/// Descriptor for the continuous source location `(x, y)`.
///
/// The location is snapped into `[0, w-1] x [0, h-1]` and the top-left sample
/// is kept at most at `(w-2, h-2)`, so all four samples are inside the image.
/// Non-finite locations map to the top-left corner.
#[inline]
pub(crate) fn bilinear_point(x: f64, y: f64, src_w: usize, src_h: usize) -> BilinearLutPoint {
    let (x, y) = if x.is_finite() && y.is_finite() {
        (x, y)
    } else {
        (0.0, 0.0)
    };
    let x = x.clamp(0.0, (src_w - 1) as f64);
    let y = y.clamp(0.0, (src_h - 1) as f64);

    let xt = (x.floor() as usize).min(src_w - 2);
    let yt = (y.floor() as usize).min(src_h - 2);
    let ax = (x - xt as f64) as f32;
    let ay = (y - yt as f64) as f32;

    let idx0 = yt * src_w + xt;
    BilinearLutPoint {
        idx0,
        idx1: idx0 + src_w,
        w00: (1.0 - ax) * (1.0 - ay),
        w01: ax * (1.0 - ay),
        w10: (1.0 - ax) * ay,
        w11: ax * ay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::KannalaBrandtCamera;
    use crate::transform::{intrinsics_matrix, rotation_from_euler_deg};
    use approx::assert_relative_eq;

    fn identity_camera(width: usize, height: usize) -> LinearCamera {
        LinearCamera::new(width, height, 1.0, 1.0, 0.0, 0.0)
    }

    #[test]
    fn test_table_has_requested_size() {
        let cam = LinearCamera::new(64, 48, 50.0, 50.0, 32.0, 24.0);
        let target = LinearCamera::new(40, 30, 30.0, 30.0, 20.0, 15.0);
        let lut = lookup_table_for_target(&cam, &Matrix3::identity(), &target).unwrap();
        assert_eq!(lut.width(), 40);
        assert_eq!(lut.height(), 30);
        assert_eq!(lut.len(), 40 * 30);
        assert_eq!(lut.source_len(), 64 * 48);
    }

    #[test]
    fn test_identity_mapping() {
        let cam = identity_camera(4, 4);
        let mut lut = LookupTable::new(4, 4).unwrap();
        build_lookup_table(&cam, &Matrix3::identity(), &mut lut).unwrap();

        // Interior pixels sample themselves with full top-left weight
        let p = lut.point(1, 2).unwrap();
        assert_eq!(p.idx0, 6);
        assert_eq!(p.idx1, 10);
        assert_eq!(p.w00, 1.0);

        // Last column and row reach their pixel through the far weights
        let p = lut.point(3, 3).unwrap();
        assert_eq!(p.idx0, 10);
        assert_eq!(p.idx1, 14);
        assert_eq!(p.w11, 1.0);
        assert_eq!(p.w00 + p.w01 + p.w10, 0.0);
    }

    #[test]
    fn test_in_bounds_weights() {
        let cam = identity_camera(4, 4);
        // K^-1 shifts every output pixel by (+0.25, +0.5)
        let k = intrinsics_matrix(1.0, 1.0, -0.25, -0.5);
        let mut lut = LookupTable::new(3, 3).unwrap();
        build_lookup_table_unrotated(&cam, &k, &mut lut).unwrap();

        for row in 0..3 {
            for col in 0..3 {
                let p = lut.point(row, col).unwrap();
                assert_eq!(p.idx0, row * 4 + col);
                assert_eq!(p.idx1, p.idx0 + 4);
                assert_relative_eq!(p.w00, 0.375, epsilon = 1e-6);
                assert_relative_eq!(p.w01, 0.125, epsilon = 1e-6);
                assert_relative_eq!(p.w10, 0.375, epsilon = 1e-6);
                assert_relative_eq!(p.w11, 0.125, epsilon = 1e-6);
                assert_relative_eq!(p.weight_sum(), 1.0, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_indices_stay_inside_source() {
        let cam = KannalaBrandtCamera {
            width: 64,
            height: 48,
            fx: 20.0,
            fy: 20.0,
            cx: 32.0,
            cy: 24.0,
            k1: 0.01,
            k2: -0.002,
            k3: 0.0,
            k4: 0.0,
        };
        // A wide target looking well past the source field of view
        let target = LinearCamera::new(120, 90, 15.0, 15.0, 60.0, 45.0);
        let rotation = rotation_from_euler_deg(20.0, -35.0, 60.0);
        let lut = lookup_table_for_target(&cam, &rotation, &target).unwrap();

        let source_len = cam.width * cam.height;
        for p in lut.points() {
            assert_eq!(p.idx1, p.idx0 + cam.width);
            assert!(p.idx1 + 1 < source_len);
            assert_relative_eq!(p.weight_sum(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_non_finite_projection_snaps_to_corner() {
        let cam = identity_camera(8, 8);
        // Every ray lands on the z = 0 plane
        let degenerate = Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0);
        let mut lut = LookupTable::new(3, 3).unwrap();
        build_lookup_table(&cam, &degenerate, &mut lut).unwrap();
        for p in lut.points() {
            assert_eq!(*p, BilinearLutPoint::nearest(0, 8));
        }
    }

    #[test]
    fn test_off_frame_clamps_to_edge() {
        let p = bilinear_point(-12.7, 2.5, 10, 6);
        assert_eq!(p.idx0, 2 * 10);
        assert_relative_eq!(p.w00, 0.5);
        assert_relative_eq!(p.w10, 0.5);

        let p = bilinear_point(40.0, 99.0, 10, 6);
        assert_eq!(p.idx0, 4 * 10 + 8);
        assert_eq!(p.w11, 1.0);
    }

    #[test]
    fn test_preconditions() {
        let cam = identity_camera(4, 4);
        let mut empty = LookupTable::default();
        assert_eq!(
            build_lookup_table(&cam, &Matrix3::identity(), &mut empty),
            Err(RectifyError::EmptyTable)
        );

        let thin = identity_camera(1, 4);
        let mut lut = LookupTable::new(2, 2).unwrap();
        assert_eq!(
            build_lookup_table(&thin, &Matrix3::identity(), &mut lut),
            Err(RectifyError::InvalidCameraSize(1, 4))
        );

        let singular = intrinsics_matrix(1.0, 0.0, 0.0, 0.0);
        assert_eq!(
            build_lookup_table_unrotated(&cam, &singular, &mut lut),
            Err(RectifyError::SingularIntrinsics)
        );
    }
}
