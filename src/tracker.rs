//! Video-level tracking: runs a [`TrackingSession`] over a frame source,
//! collects one record per frame and writes the outputs.

use crate::{
    annotate::{draw_pose, to_bgr, AnnotatedVideoWriter},
    background::{compute_and_save, load_background},
    config::{Config, TrackingParameters},
    constants::{PROGRESS_LOG_INTERVAL, RESULTS_SUFFIX, TRACKED_VIDEO_SUFFIX},
    pose::{FailureKind, FrameStatus, PoseTimeSeries},
    preprocess::preprocess_frame,
    session::TrackingSession,
    video::{FrameSource, VideoFile},
    Error, Result,
};
use log::{debug, info, warn};
use opencv::{core::Mat, prelude::*};
use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

/// Result of a tracking run
#[derive(Debug)]
pub struct TrackingReport {
    /// Poses of the tracked frames, one per frame index
    pub series: PoseTimeSeries,
    /// Whether the run stopped early on request
    pub cancelled: bool,
}

/// Tracks the fish across the frames of one video
pub struct VideoTracker {
    params: TrackingParameters,
    colours: Vec<[u8; 3]>,
}

impl VideoTracker {
    /// Create a tracker
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the parameters are invalid
    pub fn new(params: TrackingParameters, colours: Vec<[u8; 3]>) -> Result<Self> {
        params.validate()?;
        Ok(Self { params, colours })
    }

    /// Tracking parameters
    #[must_use]
    pub fn params(&self) -> &TrackingParameters {
        &self.params
    }

    /// Track `n_frames` frames from `starting_frame`.
    ///
    /// With several backgrounds the source is split into equal chunks (the
    /// last absorbing the remainder) and each frame is compared against the
    /// background of its chunk. The cancel flag is checked before each
    /// frame; a cancelled run returns the frames tracked so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the backgrounds do not match the source, the
    /// source cannot be read, or the annotated video cannot be written
    pub fn track(
        &self,
        source: &mut dyn FrameSource,
        backgrounds: &[Mat],
        mut writer: Option<&mut AnnotatedVideoWriter>,
        cancel: Option<&AtomicBool>,
    ) -> Result<TrackingReport> {
        let total = source.frame_count();
        let start = self.params.starting_frame;
        if start > total {
            return Err(Error::InvalidInput(format!(
                "Starting frame {start} is past the end of the video ({total} frames)"
            )));
        }
        if backgrounds.is_empty() {
            return Err(Error::InvalidInput("No background supplied".to_string()));
        }
        let size = source.frame_size();
        if size.area() > 0 {
            for background in backgrounds {
                if background.size()? != size {
                    let b = background.size()?;
                    return Err(Error::InvalidInput(format!(
                        "Background size {}x{} does not match frame size {}x{}",
                        b.width, b.height, size.width, size.height
                    )));
                }
            }
        }

        let remaining = total - start;
        let n_frames = self.params.n_frames.map_or(remaining, |n| n.min(remaining));
        let fps = self.params.fps.unwrap_or_else(|| source.fps());
        let chunk_len = (total / backgrounds.len()).max(1);

        info!("Tracking {n_frames} frames starting at frame {start}");
        source.seek(start)?;

        let mut series = PoseTimeSeries::new(fps, n_frames, self.params.clone(), self.colours.clone());
        let mut session = TrackingSession::new(self.params.clone());
        let mut cancelled = false;

        for offset in 0..n_frames {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                warn!("Tracking cancelled after {offset} frames");
                cancelled = true;
                break;
            }
            let index = start + offset;
            if offset % PROGRESS_LOG_INTERVAL == 0 {
                info!("Tracking frame {}/{}", offset + 1, n_frames);
            }

            let Some(frame) = source.read_frame()? else {
                warn!("Frame {index} could not be decoded");
                let outcome = session.record_decode_failure();
                series.push(outcome.record, outcome.status);
                continue;
            };

            let background = &backgrounds[(index / chunk_len).min(backgrounds.len() - 1)];
            let preprocessed = preprocess_frame(&frame, background)?;
            let outcome = session.process(&preprocessed);
            debug!("Frame {index}: {:?}", outcome.status);

            if let Some(writer) = writer.as_deref_mut() {
                let mut annotated = to_bgr(&frame)?;
                draw_pose(&mut annotated, &outcome.record, self.params.line_length, &self.colours)?;
                writer.write(&annotated)?;
            }
            series.push(outcome.record, outcome.status);
        }

        info!(
            "Tracked {} frames: {} normal, {} still, {} failed",
            series.len(),
            series.count_status(FrameStatus::Normal),
            series.count_status(FrameStatus::Still),
            series.len()
                - series.count_status(FrameStatus::Normal)
                - series.count_status(FrameStatus::Still)
        );
        let decode_failures = series.count_status(FrameStatus::Failed(FailureKind::Decode));
        if decode_failures > 0 {
            warn!("{decode_failures} frames could not be decoded");
        }

        Ok(TrackingReport { series, cancelled })
    }
}

/// Output file for a video: `<directory>/<stem><suffix>`, next to the video
/// unless a directory is given
#[must_use]
pub fn output_path(video: &Path, directory: Option<&Path>, suffix: &str) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = format!("{stem}{suffix}");
    match directory {
        Some(dir) => dir.join(name),
        None => video.with_file_name(name),
    }
}

/// Paths written by [`track_video_file`]
#[derive(Debug, Clone)]
pub struct TrackingOutputs {
    /// JSON results archive
    pub results: PathBuf,
    /// Annotated video, if requested
    pub annotated_video: Option<PathBuf>,
}

/// Track a video file end to end: background, tracking, annotated video
/// and results archive.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or an input or output
/// cannot be opened
pub fn track_video_file(video: &Path, config: &Config) -> Result<(TrackingReport, TrackingOutputs)> {
    config.validate()?;

    let backgrounds = match &config.background.path {
        Some(path) => {
            info!("Loading background from {}", path.display());
            vec![load_background(path)?]
        }
        None => compute_and_save(video, config.background.num_backgrounds, config.background.save)?,
    };

    let mut source = VideoFile::open(video)?;
    let tracker = VideoTracker::new(config.tracking.clone(), config.output.colours.clone())?;
    let directory = config.output.directory.as_deref();
    if let Some(dir) = directory {
        std::fs::create_dir_all(dir)?;
    }

    let annotated_path = config
        .output
        .annotate
        .then(|| output_path(video, directory, TRACKED_VIDEO_SUFFIX));
    let mut writer = match &annotated_path {
        Some(path) => {
            let fps = config.tracking.fps.unwrap_or_else(|| source.fps());
            Some(AnnotatedVideoWriter::create(path, fps, source.frame_size())?)
        }
        None => None,
    };

    let report = tracker.track(&mut source, &backgrounds, writer.as_mut(), None)?;
    if let Some(writer) = writer {
        let written = writer.finish()?;
        debug!("Annotated video has {written} frames");
    }

    let results = output_path(video, directory, RESULTS_SUFFIX);
    report.series.save(&results)?;

    Ok((
        report,
        TrackingOutputs {
            results,
            annotated_video: annotated_path,
        },
    ))
}
