//! rectilut - lookup-table image rectification
//!
//! Rectifying an image through a distorted camera model is expensive per
//! pixel: every output pixel needs a back-projection, a rotation and a
//! forward projection. For a fixed rig those results never change, so they
//! are computed once into a [`LookupTable`] of bilinear sampling descriptors
//! and every subsequent frame is remapped with four gathers per pixel.
//!
//! ```no_run
//! use nalgebra::Matrix3;
//! use rectilut::{lookup_table_for_target, rectify_to_vec, FovCamera, LinearCamera};
//!
//! let camera = FovCamera { width: 640, height: 480, fx: 300.0, fy: 300.0, cx: 320.0, cy: 240.0, w: 0.9 };
//! let target = LinearCamera::new(640, 480, 250.0, 250.0, 320.0, 240.0);
//! let lut = lookup_table_for_target(&camera, &Matrix3::identity(), &target)?;
//!
//! let frame = vec![0u8; 640 * 480];
//! let rectified = rectify_to_vec(&lut, &frame)?;
//! # Ok::<(), rectilut::RectifyError>(())
//! ```

pub mod bounds;
pub mod builder;
pub mod camera;
pub mod config;
pub mod error;
pub mod lut;
pub mod range;
pub mod rectify;
pub mod transform;

pub use bounds::{min_max_rotated_col, min_max_rotated_row, valid_region};
pub use builder::{build_lookup_table, build_lookup_table_unrotated, lookup_table_for_target};
pub use camera::{CameraModel, FovCamera, KannalaBrandtCamera, LinearCamera, Poly3Camera};
pub use error::RectifyError;
pub use lut::{BilinearLutPoint, LookupTable};
pub use range::Range;
pub use rectify::{rectify, rectify_to_vec};
