//! Error types for lookup table construction and rectification

use thiserror::Error;

/// Precondition violations reported by the rectification core.
///
/// None of these are recoverable at runtime: they signal that the caller
/// handed in a table, camera or buffer that does not fit the operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RectifyError {
    /// The lookup table was never allocated.
    #[error("lookup table has not been allocated")]
    EmptyTable,

    /// A lookup table or output region would have a zero dimension.
    #[error("invalid lookup table size {0}x{1}")]
    InvalidTableSize(usize, usize),

    /// A point was addressed outside the table.
    #[error("point (row {row}, col {col}) is outside the {width}x{height} lookup table")]
    PointOutOfBounds {
        row: usize,
        col: usize,
        width: usize,
        height: usize,
    },

    /// The source camera cannot host a 2x2 interpolation neighborhood.
    #[error("source camera {0}x{1} is too small for bilinear sampling")]
    InvalidCameraSize(usize, usize),

    /// The target intrinsics matrix has no inverse.
    #[error("target intrinsics matrix is singular")]
    SingularIntrinsics,

    /// Table and image dimensions disagree.
    #[error("lookup table is {lut_width}x{lut_height} but the image is {width}x{height}")]
    SizeMismatch {
        lut_width: usize,
        lut_height: usize,
        width: usize,
        height: usize,
    },

    /// The output buffer does not hold exactly one byte per table entry.
    #[error("output buffer holds {0} bytes, expected {1}")]
    OutputLength(usize, usize),

    /// The input buffer is shorter than the samples the table reads.
    #[error("input buffer holds {0} bytes, lookup table reads up to {1}")]
    InputLength(usize, usize),
}
