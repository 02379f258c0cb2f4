//! Utility functions for pixel access on single-channel frames.

pub mod safe_cast;

use crate::{Error, Result};
use opencv::core::{self, Mat, Point, CV_8UC1};
use opencv::prelude::*;

/// Check that a frame is a non-empty single-channel 8-bit image
///
/// # Errors
///
/// Returns `Error::InvalidInput` for any other layout
pub fn ensure_gray_u8(frame: &Mat) -> Result<()> {
    if frame.empty() {
        return Err(Error::InvalidInput("Empty frame".to_string()));
    }
    if frame.typ() != CV_8UC1 {
        return Err(Error::InvalidInput(format!(
            "Expected a single-channel 8-bit frame, got type {}",
            frame.typ()
        )));
    }
    Ok(())
}

/// Intensity at `(row, col)`, or `None` outside the frame
///
/// # Errors
///
/// Returns an error if the pixel cannot be read
pub fn pixel_value(frame: &Mat, row: i32, col: i32) -> Result<Option<u8>> {
    if row < 0 || col < 0 || row >= frame.rows() || col >= frame.cols() {
        return Ok(None);
    }
    Ok(Some(*frame.at_2d::<u8>(row, col)?))
}

/// Brightest pixel of a single-channel frame as `(row, col, value)`.
/// The first occurrence in row-major order wins.
///
/// # Errors
///
/// Returns an error if the frame is not single-channel 8-bit
pub fn brightest_pixel(frame: &Mat) -> Result<(i32, i32, u8)> {
    ensure_gray_u8(frame)?;
    let mut max_loc = Point::default();
    core::min_max_loc(frame, None, None, None, Some(&mut max_loc), &core::no_array())?;
    let value = *frame.at_2d::<u8>(max_loc.y, max_loc.x)?;
    Ok((max_loc.y, max_loc.x, value))
}
