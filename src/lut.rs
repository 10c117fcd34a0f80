//! Per-pixel bilinear resampling lookup table
//!
//! Each output pixel stores the flat index of the top-left source sample, the
//! index one source row below it, and the four bilinear weights. Applying the
//! table then needs no coordinate math and no bounds branching:
//!
//! ```text
//! out = w00 * src[idx0] + w01 * src[idx0 + 1]
//!     + w10 * src[idx1] + w11 * src[idx1 + 1]
//! ```

use crate::error::RectifyError;

/// Resampling descriptor for one output pixel
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BilinearLutPoint {
    /// Index of the top-left sample in the source image
    pub idx0: usize,
    /// Index of the sample one row below `idx0`
    pub idx1: usize,
    /// Top-left weight
    pub w00: f32,
    /// Top-right weight
    pub w01: f32,
    /// Bottom-left weight
    pub w10: f32,
    /// Bottom-right weight
    pub w11: f32,
}

impl BilinearLutPoint {
    /// Descriptor that copies source pixel `idx` unchanged.
    pub fn nearest(idx: usize, source_width: usize) -> Self {
        Self {
            idx0: idx,
            idx1: idx + source_width,
            w00: 1.0,
            w01: 0.0,
            w10: 0.0,
            w11: 0.0,
        }
    }

    /// Smallest source buffer length this descriptor can be applied to
    #[inline]
    pub fn required_source_len(&self) -> usize {
        self.idx0.max(self.idx1) + 2
    }

    pub fn weight_sum(&self) -> f32 {
        self.w00 + self.w01 + self.w10 + self.w11
    }
}

/// Dense row-major table of `BilinearLutPoint`, one per output pixel.
///
/// The height is implied by the number of points and the stored width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupTable {
    points: Vec<BilinearLutPoint>,
    width: usize,
    /// Minimum input buffer length the stored descriptors read from
    source_len: usize,
}

impl LookupTable {
    /// Allocate a `width` x `height` table of default descriptors.
    pub fn new(width: usize, height: usize) -> Result<Self, RectifyError> {
        if width == 0 || height == 0 {
            return Err(RectifyError::InvalidTableSize(width, height));
        }
        Ok(Self {
            points: vec![BilinearLutPoint::default(); width * height],
            width,
            source_len: BilinearLutPoint::default().required_source_len(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.points.len() / self.width
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Minimum length of an input buffer this table can be applied to
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    pub fn points(&self) -> &[BilinearLutPoint] {
        &self.points
    }

    pub fn point(&self, row: usize, col: usize) -> Option<&BilinearLutPoint> {
        if col >= self.width {
            return None;
        }
        self.points.get(row * self.width + col)
    }

    /// Overwrite the descriptor at `(row, col)`.
    pub fn set_point(
        &mut self,
        row: usize,
        col: usize,
        point: BilinearLutPoint,
    ) -> Result<(), RectifyError> {
        if self.points.is_empty() {
            return Err(RectifyError::EmptyTable);
        }
        if col >= self.width || row >= self.height() {
            return Err(RectifyError::PointOutOfBounds {
                row,
                col,
                width: self.width,
                height: self.height(),
            });
        }
        self.points[row * self.width + col] = point;
        self.source_len = self.source_len.max(point.required_source_len());
        Ok(())
    }

    /// Mutable access for bulk fills; the caller states the source length
    /// every written descriptor stays within.
    pub(crate) fn fill_with(
        &mut self,
        source_len: usize,
        fill: impl FnOnce(&mut [BilinearLutPoint], usize),
    ) {
        let width = self.width;
        fill(&mut self.points, width);
        self.source_len = source_len;
    }
}
