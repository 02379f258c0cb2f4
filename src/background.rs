//! Background model: the per-pixel maximum over the frames of a video.
//!
//! The fish is darker than its surroundings, so the brightest value each
//! pixel takes over a recording is the empty arena. Long recordings can be
//! split into consecutive chunks with one background each, which follows
//! slow illumination drift.

use crate::{
    constants::{BACKGROUND_SUFFIX, PROGRESS_LOG_INTERVAL},
    preprocess::to_grayscale,
    video::{FrameSource, VideoFile},
    Error, Result,
};
use log::{debug, info, warn};
use opencv::{
    core::{self, Mat, Vector, CV_32F, CV_8U},
    imgcodecs,
    prelude::*,
};
use std::path::{Path, PathBuf};

/// Compute `count` brightest-pixel backgrounds over consecutive chunks of
/// the source. The last chunk absorbs the remainder frames.
///
/// # Errors
///
/// Returns `Error::InvalidInput` for a bad `count` and `Error::Background`
/// if a chunk contains no decodable frame
pub fn compute_brightest_backgrounds(source: &mut dyn FrameSource, count: usize) -> Result<Vec<Mat>> {
    let total = source.frame_count();
    if total == 0 {
        return Err(Error::Background("Video has no frames".to_string()));
    }
    if count == 0 || count > total {
        return Err(Error::InvalidInput(format!(
            "Cannot compute {count} backgrounds from {total} frames"
        )));
    }

    source.seek(0)?;
    let chunk_len = total / count;
    let mut backgrounds: Vec<Mat> = Vec::with_capacity(count);
    let mut accumulator: Option<Mat> = None;

    for index in 0..total {
        let chunk = (index / chunk_len).min(count - 1);
        if chunk > backgrounds.len() {
            backgrounds.push(finish_chunk(accumulator.take(), backgrounds.len())?);
        }
        if index % PROGRESS_LOG_INTERVAL == 0 {
            debug!("Background: frame {}/{}", index + 1, total);
        }

        let Some(frame) = source.read_frame()? else {
            warn!("Skipping undecodable frame {index} in background computation");
            continue;
        };
        let mut sample = Mat::default();
        to_grayscale(&frame)?.convert_to(&mut sample, CV_32F, 1.0, 0.0)?;

        accumulator = Some(match accumulator {
            None => sample,
            Some(current) => {
                let mut brightest = Mat::default();
                core::max(&current, &sample, &mut brightest)?;
                brightest
            }
        });
    }
    backgrounds.push(finish_chunk(accumulator, backgrounds.len())?);

    info!("Computed {} background(s) from {} frames", backgrounds.len(), total);
    Ok(backgrounds)
}

fn finish_chunk(accumulator: Option<Mat>, chunk: usize) -> Result<Mat> {
    let accumulator = accumulator
        .ok_or_else(|| Error::Background(format!("No decodable frame in background chunk {}", chunk + 1)))?;
    let mut background = Mat::default();
    accumulator.convert_to(&mut background, CV_8U, 1.0, 0.0)?;
    Ok(background)
}

/// Where background `index` of `count` for a video is stored:
/// `<stem>_brightest_background.tif` for a single background, otherwise
/// numbered from 1.
#[must_use]
pub fn background_path(video: &Path, index: usize, count: usize) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = if count == 1 {
        format!("{stem}{BACKGROUND_SUFFIX}.tif")
    } else {
        format!("{stem}{BACKGROUND_SUFFIX}{}.tif", index + 1)
    };
    video.with_file_name(name)
}

/// Write a background image
///
/// # Errors
///
/// Returns `Error::Background` if the image cannot be encoded
pub fn save_background(path: &Path, background: &Mat) -> Result<()> {
    let path_str = path
        .to_str()
        .ok_or_else(|| Error::InvalidInput(format!("Non UTF-8 path: {}", path.display())))?;
    if !imgcodecs::imwrite(path_str, background, &Vector::new())? {
        return Err(Error::Background(format!("Failed to write {}", path.display())));
    }
    info!("Saved background to {}", path.display());
    Ok(())
}

/// Read a background image as single-channel 8-bit
///
/// # Errors
///
/// Returns `Error::Background` if the file is missing or unreadable
pub fn load_background(path: &Path) -> Result<Mat> {
    let path_str = path
        .to_str()
        .ok_or_else(|| Error::InvalidInput(format!("Non UTF-8 path: {}", path.display())))?;
    let background = imgcodecs::imread(path_str, imgcodecs::IMREAD_GRAYSCALE)?;
    if background.empty() {
        return Err(Error::Background(format!("Cannot read background {}", path.display())));
    }
    Ok(background)
}

/// Compute the backgrounds of a video file and optionally save them next to it
///
/// # Errors
///
/// Returns an error if the video cannot be read or an image cannot be written
pub fn compute_and_save(video: &Path, count: usize, save: bool) -> Result<Vec<Mat>> {
    let backgrounds = {
        let mut source = VideoFile::open(video)?;
        compute_brightest_backgrounds(&mut source, count)?
    };
    if save {
        for (index, background) in backgrounds.iter().enumerate() {
            save_background(&background_path(video, index, count), background)?;
        }
    }
    Ok(backgrounds)
}
