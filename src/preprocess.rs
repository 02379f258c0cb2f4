//! Foreground isolation: grayscale conversion, background subtraction and
//! denoising of raw frames.

use crate::{constants::MEDIAN_BLUR_KSIZE, utils::ensure_gray_u8, Error, Result};
use opencv::{
    core::{self, Mat, CV_8UC1, CV_8UC3, CV_8UC4},
    imgproc,
    prelude::*,
};

/// Convert a frame to single-channel 8-bit
///
/// # Errors
///
/// Returns `Error::InvalidInput` for empty frames or unsupported layouts
pub fn to_grayscale(frame: &Mat) -> Result<Mat> {
    if frame.empty() {
        return Err(Error::InvalidInput("Empty frame".to_string()));
    }
    let code = match frame.typ() {
        CV_8UC1 => return Ok(frame.try_clone()?),
        CV_8UC3 => imgproc::COLOR_BGR2GRAY,
        CV_8UC4 => imgproc::COLOR_BGRA2GRAY,
        other => {
            return Err(Error::InvalidInput(format!("Unsupported frame type {other}")));
        }
    };
    let mut gray = Mat::default();
    imgproc::cvt_color(frame, &mut gray, code, 0)?;
    Ok(gray)
}

/// Absolute difference between a frame and the background.
///
/// Also used on its own to preview the isolated fish.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the sizes differ or the background is not
/// single-channel 8-bit
pub fn subtract_background(frame: &Mat, background: &Mat) -> Result<Mat> {
    ensure_gray_u8(background)?;
    let gray = to_grayscale(frame)?;
    if gray.size()? != background.size()? {
        let (f, b) = (gray.size()?, background.size()?);
        return Err(Error::InvalidInput(format!(
            "Frame size {}x{} does not match background size {}x{}",
            f.width, f.height, b.width, b.height
        )));
    }
    let mut diff = Mat::default();
    core::absdiff(&gray, background, &mut diff)?;
    Ok(diff)
}

/// Background subtraction followed by a 3x3 median blur
///
/// # Errors
///
/// See [`subtract_background`]
pub fn preprocess_frame(frame: &Mat, background: &Mat) -> Result<Mat> {
    let diff = subtract_background(frame, background)?;
    let mut blurred = Mat::default();
    imgproc::median_blur(&diff, &mut blurred, MEDIAN_BLUR_KSIZE)?;
    Ok(blurred)
}
