//! Frame change detection between a reference frame and the current frame.
//!
//! A frame counts as changed when at least one pixel differs from the
//! reference by more than the change threshold.

use crate::{utils::ensure_gray_u8, Error, Result};
use log::debug;
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
};

/// Movement detector comparing preprocessed frames against a reference
pub struct MovementDetector {
    threshold: u8,
    reference: Option<Mat>,
}

impl MovementDetector {
    /// Create a new movement detector
    #[must_use]
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold,
            reference: None,
        }
    }

    /// Whether a reference frame has been set
    #[must_use]
    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Number of pixels whose absolute change exceeds the threshold
    ///
    /// # Errors
    ///
    /// Returns an error if there is no reference or the sizes differ
    pub fn changed_pixels(&self, frame: &Mat) -> Result<i32> {
        let reference = self
            .reference
            .as_ref()
            .ok_or_else(|| Error::InvalidInput("No reference frame set".to_string()))?;
        ensure_gray_u8(frame)?;
        if frame.size()? != reference.size()? {
            return Err(Error::InvalidInput(
                "Frame size does not match the reference frame".to_string(),
            ));
        }

        let mut diff = Mat::default();
        core::absdiff(frame, reference, &mut diff)?;
        let mut mask = Mat::default();
        imgproc::threshold(
            &diff,
            &mut mask,
            f64::from(self.threshold),
            255.0,
            imgproc::THRESH_BINARY,
        )?;
        Ok(core::count_non_zero(&mask)?)
    }

    /// Whether the frame differs from the reference. Always true without a
    /// reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be compared
    pub fn has_moved(&self, frame: &Mat) -> Result<bool> {
        if self.reference.is_none() {
            return Ok(true);
        }
        let changed = self.changed_pixels(frame)?;
        debug!("{changed} pixels changed by more than {}", self.threshold);
        Ok(changed > 0)
    }

    /// Replace the reference frame
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be copied
    pub fn set_reference(&mut self, frame: &Mat) -> Result<()> {
        ensure_gray_u8(frame)?;
        self.reference = Some(frame.try_clone()?);
        Ok(())
    }

    /// Reset the detector
    pub fn reset(&mut self) {
        self.reference = None;
    }
}
