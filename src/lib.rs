//! Pose tracking of freely swimming larval fish.
//!
//! Each frame of a recording is reduced to the positions and orientations of
//! both eyes, the body centroid, the heading and a chain of tail points
//! starting at the swim bladder.
//!
//! The pipeline consists of:
//! 1. A brightest-pixel background model of the recording
//! 2. Background subtraction and median filtering of every frame
//! 3. Eye and swim bladder localisation with radial searches and contour
//!    refinement
//! 4. Sequential tail tracing away from the heading
//! 5. Per-video state that keeps eye labels stable and reuses the previous
//!    pose when nothing moved
//!
//! # Examples
//!
//! ## Tracking a video file
//!
//! ```no_run
//! use free_swimming_tracker::{config::Config, tracker::track_video_file};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::default();
//! config.tracking.n_tail_points = 7;
//! config.tracking.pixel_threshold = 40;
//!
//! let (report, outputs) = track_video_file(Path::new("fish.avi"), &config)?;
//! println!(
//!     "Tracked {} frames, results in {}",
//!     report.series.len(),
//!     outputs.results.display()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Tracking frames step by step
//!
//! ```no_run
//! use free_swimming_tracker::{
//!     background::compute_brightest_backgrounds,
//!     config::TrackingParameters,
//!     preprocess::preprocess_frame,
//!     session::TrackingSession,
//!     video::{FrameSource, VideoFile},
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut video = VideoFile::open("fish.avi")?;
//! let background = compute_brightest_backgrounds(&mut video, 1)?.remove(0);
//!
//! let mut session = TrackingSession::new(TrackingParameters::default());
//! video.seek(0)?;
//! while let Some(frame) = video.read_frame()? {
//!     let outcome = session.process(&preprocess_frame(&frame, &background)?);
//!     println!("{:?} heading {:.2}", outcome.status, outcome.record.heading_angle);
//! }
//! # Ok(())
//! # }
//! ```

/// Brightest-pixel background model
pub mod background;

/// Frame preprocessing: grayscale, background subtraction, denoising
pub mod preprocess;

/// Radial search for the brightest pixel on an arc
pub mod search;

/// Eye, swim bladder and body localisation
pub mod localizer;

/// Tail tracing
pub mod tail;

/// Per-video tracking state
pub mod session;

/// Frame change detection against a reference frame
pub mod movement_detector;

/// Video-level tracking and output files
pub mod tracker;

/// Pose annotation and annotated video output
pub mod annotate;

/// Frame sources
pub mod video;

/// Pixel-space points and angles
pub mod geometry;

/// Pose records and time series
pub mod pose;

/// Angle traces derived from tracked poses
pub mod kinematics;

/// Utility functions for pixel access and numeric conversions
pub mod utils;

/// Error types and result handling
pub mod error;

/// Constants used throughout the tracker
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
