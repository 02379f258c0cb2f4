//! Drawing tracked poses onto frames and writing the annotated video.

use crate::{
    constants::HEADING_ARROW_TIP,
    geometry::Point,
    pose::PoseRecord,
    Error, Result,
};
use log::info;
use opencv::{
    core::{Mat, Scalar, Size, CV_8UC1, CV_8UC3},
    imgproc,
    prelude::*,
    videoio::{VideoWriter, VideoWriterTrait},
};
use std::path::Path;

fn colour(bgr: [u8; 3]) -> Scalar {
    Scalar::new(f64::from(bgr[0]), f64::from(bgr[1]), f64::from(bgr[2]), 0.0)
}

/// Copy a frame into a 3-channel image suitable for colour annotation
///
/// # Errors
///
/// Returns an error for unsupported frame types
pub fn to_bgr(frame: &Mat) -> Result<Mat> {
    match frame.typ() {
        CV_8UC3 => Ok(frame.try_clone()?),
        CV_8UC1 => {
            let mut bgr = Mat::default();
            imgproc::cvt_color(frame, &mut bgr, imgproc::COLOR_GRAY2BGR, 0)?;
            Ok(bgr)
        }
        other => Err(Error::InvalidInput(format!("Cannot annotate frame type {other}"))),
    }
}

/// Draw a pose: eye markers with orientation lines, one dot per tail
/// segment and the heading arrow. Invalid records draw nothing.
///
/// Tail segments use the leading colours, the first and second eye the
/// third and second last, and the heading the last.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if there are too few colours
pub fn draw_pose(frame: &mut Mat, record: &PoseRecord, line_length: i32, colours: &[[u8; 3]]) -> Result<()> {
    if !record.is_valid() {
        return Ok(());
    }
    let n_tail = record.n_tail_points();
    if colours.len() < n_tail + 3 {
        return Err(Error::InvalidInput(format!(
            "Need {} colours to annotate {} tail points, got {}",
            n_tail + 3,
            n_tail,
            colours.len()
        )));
    }
    let len = f64::from(line_length);
    let last = colours.len() - 1;

    for (eye, angle, bgr) in [
        (record.first_eye, record.first_eye_angle, colours[last - 2]),
        (record.second_eye, record.second_eye_angle, colours[last - 1]),
    ] {
        let centre = eye.to_cv()?;
        imgproc::circle(frame, centre, 1, colour(bgr), -1, imgproc::LINE_8, 0)?;
        if angle.is_finite() {
            let tip = eye.project(angle, len).to_cv()?;
            imgproc::line(frame, centre, tip, colour(bgr), 1, imgproc::LINE_8, 0)?;
        }
    }

    for (m, segment) in record.tail.windows(2).enumerate() {
        if !segment[0].is_valid() || !segment[1].is_valid() {
            break;
        }
        let mid = segment[0].midpoint(&segment[1]).to_cv()?;
        imgproc::circle(frame, mid, 1, colour(colours[m]), -1, imgproc::LINE_8, 0)?;
    }

    if record.heading_angle.is_finite() {
        let heading: Point = record.heading_point();
        let start = heading.project(record.heading_angle, -len / 2.0).to_cv()?;
        let end = heading.project(record.heading_angle, len).to_cv()?;
        imgproc::arrowed_line(
            frame,
            start,
            end,
            colour(colours[last]),
            1,
            imgproc::LINE_8,
            0,
            HEADING_ARROW_TIP,
        )?;
    }
    Ok(())
}

/// Motion-JPEG AVI writer for annotated frames
pub struct AnnotatedVideoWriter {
    writer: VideoWriter,
    frames_written: usize,
}

impl AnnotatedVideoWriter {
    /// Create the output video
    ///
    /// # Errors
    ///
    /// Returns `Error::VideoOpen` if the writer cannot be opened
    pub fn create<P: AsRef<Path>>(path: P, fps: f64, size: Size) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::InvalidInput(format!("Non UTF-8 path: {}", path.display())))?;
        let fourcc = VideoWriter::fourcc('M', 'J', 'P', 'G')?;
        let writer = VideoWriter::new(path_str, fourcc, fps, size, true)?;
        if !writer.is_opened()? {
            return Err(Error::VideoOpen(format!("Cannot write {}", path.display())));
        }
        info!(
            "Writing annotated video to {} ({}x{} @ {:.2} fps)",
            path.display(),
            size.width,
            size.height,
            fps
        );
        Ok(Self {
            writer,
            frames_written: 0,
        })
    }

    /// Append a frame
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be encoded
    pub fn write(&mut self, frame: &Mat) -> Result<()> {
        self.writer.write(&to_bgr(frame)?)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Number of frames written so far
    #[must_use]
    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Flush and close the file
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails to close
    pub fn finish(mut self) -> Result<usize> {
        self.writer.release()?;
        Ok(self.frames_written)
    }
}
