//! Apply a lookup table to 8-bit grayscale buffers
//!
//! Every output pixel costs four gathers and four multiply-adds. Index safety
//! is established once per call from the table's recorded source length, so
//! the per-pixel loop carries no conditionals.

use rayon::prelude::*;

use crate::error::RectifyError;
use crate::lut::{BilinearLutPoint, LookupTable};

/// Rectify `input` into `output` (`width` x `height`, one byte per pixel).
pub fn rectify(
    lut: &LookupTable,
    input: &[u8],
    output: &mut [u8],
    width: usize,
    height: usize,
) -> Result<(), RectifyError> {
    if lut.is_empty() {
        return Err(RectifyError::EmptyTable);
    }
    if lut.width() != width || lut.height() != height {
        return Err(RectifyError::SizeMismatch {
            lut_width: lut.width(),
            lut_height: lut.height(),
            width,
            height,
        });
    }
    if output.len() != width * height {
        return Err(RectifyError::OutputLength(output.len(), width * height));
    }
    if input.len() < lut.source_len() {
        return Err(RectifyError::InputLength(input.len(), lut.source_len()));
    }

    // parallelize the resampling by rows
    output
        .par_chunks_exact_mut(width)
        .zip(lut.points().par_chunks_exact(width))
        .for_each(|(out_row, lut_row)| {
            out_row
                .iter_mut()
                .zip(lut_row.iter())
                .for_each(|(dst, p)| *dst = sample(input, p));
        });

    Ok(())
}

/// Rectify into a newly allocated buffer sized to the table.
pub fn rectify_to_vec(lut: &LookupTable, input: &[u8]) -> Result<Vec<u8>, RectifyError> {
    let mut output = vec![0u8; lut.len()];
    rectify(lut, input, &mut output, lut.width(), lut.height())?;
    Ok(output)
}

#[inline(always)]
fn sample(input: &[u8], p: &BilinearLutPoint) -> u8 {
    let value = p.w00 * input[p.idx0] as f32
        + p.w01 * input[p.idx0 + 1] as f32
        + p.w10 * input[p.idx1] as f32
        + p.w11 * input[p.idx1 + 1] as f32;
    // float to int casts saturate, so this also clamps to 0..=255
    (value + 0.5) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_lookup_table, lookup_table_for_target};
    use crate::camera::{FovCamera, LinearCamera};
    use nalgebra::Matrix3;

    /// Diagonal gradient 0, 17, 34, ..., 255 on a 4x4 grid
    fn diagonal_gradient() -> Vec<u8> {
        (0..16u8).map(|i| i * 17).collect()
    }

    fn identity_table(width: usize, height: usize) -> LookupTable {
        let mut lut = LookupTable::new(width, height).unwrap();
        for row in 0..height {
            for col in 0..width {
                let p = BilinearLutPoint::nearest(row * width + col, width);
                lut.set_point(row, col, p).unwrap();
            }
        }
        lut
    }

    #[test]
    fn test_identity_table_reproduces_input() {
        // A spare row plus one pixel keeps idx1 + 1 inside the buffer
        let input: Vec<u8> = (0..7 * 6 + 1).map(|i| (i * 37 % 256) as u8).collect();
        let lut = identity_table(7, 5);
        let mut output = vec![0u8; 7 * 5];
        rectify(&lut, &input, &mut output, 7, 5).unwrap();
        assert_eq!(output, input[..7 * 5]);
    }

    #[test]
    fn test_identity_camera_round_trip() {
        let cam = LinearCamera::new(4, 4, 1.0, 1.0, 0.0, 0.0);
        let mut lut = LookupTable::new(4, 4).unwrap();
        build_lookup_table(&cam, &Matrix3::identity(), &mut lut).unwrap();

        let input = diagonal_gradient();
        let output = rectify_to_vec(&lut, &input).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_rectify_is_deterministic() {
        let cam = FovCamera {
            width: 32,
            height: 24,
            fx: 20.0,
            fy: 20.0,
            cx: 16.0,
            cy: 12.0,
            w: 0.9,
        };
        let target = LinearCamera::new(32, 24, 14.0, 14.0, 16.0, 12.0);
        let lut = lookup_table_for_target(&cam, &Matrix3::identity(), &target).unwrap();

        let input: Vec<u8> = (0..32 * 24).map(|i| (i * 7 % 251) as u8).collect();
        let first = rectify_to_vec(&lut, &input).unwrap();
        let second = rectify_to_vec(&lut, &input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_interpolates_between_samples() {
        let mut lut = LookupTable::new(1, 1).unwrap();
        let p = BilinearLutPoint {
            idx0: 0,
            idx1: 2,
            w00: 0.25,
            w01: 0.25,
            w10: 0.25,
            w11: 0.25,
        };
        lut.set_point(0, 0, p).unwrap();
        let output = rectify_to_vec(&lut, &[10, 20, 30, 41]).unwrap();
        // (10 + 20 + 30 + 41) / 4 = 25.25
        assert_eq!(output, vec![25]);
    }

    #[test]
    fn test_size_checks() {
        let lut = identity_table(4, 4);
        let input = vec![0u8; 20];

        let mut output = vec![0u8; 16];
        assert!(matches!(
            rectify(&lut, &input, &mut output, 4, 3),
            Err(RectifyError::SizeMismatch { .. })
        ));

        let mut short = vec![0u8; 15];
        assert_eq!(
            rectify(&lut, &input, &mut short, 4, 4),
            Err(RectifyError::OutputLength(15, 16))
        );

        // The last descriptor reads index 15 + 4 + 1
        assert_eq!(
            rectify(&lut, &input[..16], &mut output, 4, 4),
            Err(RectifyError::InputLength(16, 21))
        );

        assert_eq!(
            rectify(&LookupTable::default(), &input, &mut output, 4, 4),
            Err(RectifyError::EmptyTable)
        );
    }
}
