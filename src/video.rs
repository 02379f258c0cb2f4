//! Frame sources: OpenCV-decoded video files and in-memory frame sequences.

use crate::{constants::DEFAULT_FPS, utils::safe_cast::usize_to_i32, Error, Result};
use log::{debug, info};
use opencv::{
    core::{Mat, Size},
    prelude::*,
    videoio::{self, VideoCapture},
};
use std::path::Path;

/// Sequential frame decoder with random seek
pub trait FrameSource {
    /// Total number of frames reported by the source
    fn frame_count(&self) -> usize;

    /// Frames per second reported by the source
    fn fps(&self) -> f64;

    /// Frame size (width, height)
    fn frame_size(&self) -> Size;

    /// Position the decoder so the next read returns frame `index`
    fn seek(&mut self, index: usize) -> Result<()>;

    /// Decode the next frame. `Ok(None)` means this index could not be
    /// decoded; the position still advances.
    fn read_frame(&mut self) -> Result<Option<Mat>>;
}

/// Video file decoded with OpenCV
pub struct VideoFile {
    capture: VideoCapture,
    frame_count: usize,
    fps: f64,
    size: Size,
}

impl VideoFile {
    /// Open a video file
    ///
    /// # Errors
    ///
    /// Returns `Error::VideoOpen` if the file cannot be opened
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::InvalidInput(format!("Non UTF-8 video path: {}", path.display())))?;

        info!("Opening video file: {}", path.display());
        let capture = VideoCapture::from_file(path_str, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(Error::VideoOpen(path.display().to_string()));
        }

        let frame_count = capture.get(videoio::CAP_PROP_FRAME_COUNT)?.max(0.0) as usize;
        let reported_fps = capture.get(videoio::CAP_PROP_FPS)?;
        let fps = if reported_fps > 0.0 { reported_fps } else { DEFAULT_FPS };
        let size = Size::new(
            capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32,
            capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32,
        );
        debug!(
            "Video {}: {} frames, {:.2} fps, {}x{}",
            path.display(),
            frame_count,
            fps,
            size.width,
            size.height
        );

        Ok(Self {
            capture,
            frame_count,
            fps,
            size,
        })
    }
}

impl FrameSource for VideoFile {
    fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_size(&self) -> Size {
        self.size
    }

    fn seek(&mut self, index: usize) -> Result<()> {
        self.capture
            .set(videoio::CAP_PROP_POS_FRAMES, f64::from(usize_to_i32(index)?))?;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

/// In-memory frame sequence. `None` slots behave as undecodable frames.
pub struct FrameSequence {
    frames: Vec<Option<Mat>>,
    fps: f64,
    position: usize,
}

impl FrameSequence {
    /// Build a sequence where every frame decodes
    #[must_use]
    pub fn new(frames: Vec<Mat>, fps: f64) -> Self {
        Self::with_gaps(frames.into_iter().map(Some).collect(), fps)
    }

    /// Build a sequence that may contain undecodable frames
    #[must_use]
    pub fn with_gaps(frames: Vec<Option<Mat>>, fps: f64) -> Self {
        Self {
            frames,
            fps,
            position: 0,
        }
    }
}

impl FrameSource for FrameSequence {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_size(&self) -> Size {
        self.frames
            .iter()
            .flatten()
            .next()
            .map_or_else(Size::default, |frame| Size::new(frame.cols(), frame.rows()))
    }

    fn seek(&mut self, index: usize) -> Result<()> {
        if index > self.frames.len() {
            return Err(Error::InvalidInput(format!(
                "Cannot seek to frame {index} of {}",
                self.frames.len()
            )));
        }
        self.position = index;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<Mat>> {
        let Some(slot) = self.frames.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;
        match slot {
            Some(frame) => Ok(Some(frame.try_clone()?)),
            None => Ok(None),
        }
    }
}

/// Load a single frame, e.g. for previewing tracking parameters
///
/// # Errors
///
/// Returns an error if the video cannot be opened or the frame cannot be decoded
pub fn load_frame<P: AsRef<Path>>(path: P, index: usize) -> Result<Mat> {
    let mut video = VideoFile::open(path)?;
    if index >= video.frame_count() {
        return Err(Error::InvalidInput(format!(
            "Frame {index} out of range ({} frames)",
            video.frame_count()
        )));
    }
    video.seek(index)?;
    video
        .read_frame()?
        .ok_or_else(|| Error::InvalidInput(format!("Frame {index} could not be decoded")))
}
