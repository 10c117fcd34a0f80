//! Valid output extent of a rotated camera
//!
//! After rotating a camera's rays, image rows and columns no longer line up
//! with the sensor edges. These routines trace the sensor border through the
//! rotation and return the column and row intervals that every row (or
//! column) still covers, i.e. the region a rectified image can use without
//! sampling outside the source field of view.

use nalgebra::{Matrix3, Vector2};
use tracing::debug;

use crate::camera::CameraModel;
use crate::range::Range;

/// Column interval covered by every row after applying `rotation`.
///
/// `rotation` takes rays of the camera into the rotated frame.
pub fn min_max_rotated_col<C: CameraModel + ?Sized>(camera: &C, rotation: &Matrix3<f64>) -> Range {
    let mut range = Range::open();
    let right = (camera.width() - 1) as f64;

    for row in 0..camera.height() {
        let row = row as f64;
        let lray = rotation * camera.unproject(&Vector2::new(0.0, row));
        let rray = rotation * camera.unproject(&Vector2::new(right, row));
        range.exclude_less_than(camera.project(&lray).x);
        range.exclude_greater_than(camera.project(&rray).x);
    }

    range
}

/// Row interval covered by every column after applying `rotation`.
pub fn min_max_rotated_row<C: CameraModel + ?Sized>(camera: &C, rotation: &Matrix3<f64>) -> Range {
    let mut range = Range::open();
    let bottom = (camera.height() - 1) as f64;

    for col in 0..camera.width() {
        let col = col as f64;
        let tray = rotation * camera.unproject(&Vector2::new(col, 0.0));
        let bray = rotation * camera.unproject(&Vector2::new(col, bottom));
        range.exclude_less_than(camera.project(&tray).y);
        range.exclude_greater_than(camera.project(&bray).y);
    }

    range
}

/// Column and row intervals together.
pub fn valid_region<C: CameraModel + ?Sized>(camera: &C, rotation: &Matrix3<f64>) -> (Range, Range) {
    let cols = min_max_rotated_col(camera, rotation);
    let rows = min_max_rotated_row(camera, rotation);
    debug!("Valid region after rotation: cols {}, rows {}", cols, rows);
    (cols, rows)
}
