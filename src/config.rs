//! Configuration management for the free-swimming tracker

use crate::{constants::*, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-frame tracking parameters
    pub tracking: TrackingParameters,

    /// Background model configuration
    pub background: BackgroundConfig,

    /// Output configuration
    pub output: OutputConfig,
}

/// Parameters of one tracking run. Supplied once, never changed during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingParameters {
    /// Number of tail points traced after the swim bladder
    pub n_tail_points: usize,

    /// Distance between consecutive tail points (pixels)
    pub dist_tail_points: f64,

    /// Distance between the eyes (pixels)
    pub dist_eyes: f64,

    /// Distance between the eye midpoint and the swim bladder (pixels)
    pub dist_swim_bladder: f64,

    /// A frame is tracked only if its brightest pixel exceeds this value
    pub pixel_threshold: u8,

    /// Binarisation threshold for eye contours
    pub eye_threshold: u8,

    /// Per-pixel absolute change above which a frame counts as changed
    pub frame_change_threshold: u8,

    /// Length of annotation lines (pixels)
    pub line_length: i32,

    /// First frame index to track
    pub starting_frame: usize,

    /// Number of frames to track; `None` tracks to the end of the video
    pub n_frames: Option<usize>,

    /// Frame rate override for the output video and archive
    pub fps: Option<f64>,

    /// Angular window of each tail step (radians)
    pub tail_search_window: f64,

    /// Number of candidate angles per tail step
    pub tail_search_angles: usize,

    /// Number of candidate angles for the eye and swim bladder searches
    pub head_search_angles: usize,
}

/// Background model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Load the background from this image instead of computing it
    pub path: Option<PathBuf>,

    /// Number of backgrounds to compute over consecutive chunks of the video
    pub num_backgrounds: usize,

    /// Save computed backgrounds next to the video
    pub save: bool,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write an annotated copy of the video
    pub annotate: bool,

    /// Directory for outputs; defaults to the video's directory
    pub directory: Option<PathBuf>,

    /// Annotation colours in BGR order
    pub colours: Vec<[u8; 3]>,
}

impl Default for TrackingParameters {
    fn default() -> Self {
        Self {
            n_tail_points: DEFAULT_N_TAIL_POINTS,
            dist_tail_points: DEFAULT_DIST_TAIL_POINTS,
            dist_eyes: DEFAULT_DIST_EYES,
            dist_swim_bladder: DEFAULT_DIST_SWIM_BLADDER,
            pixel_threshold: DEFAULT_PIXEL_THRESHOLD,
            eye_threshold: DEFAULT_EYE_THRESHOLD,
            frame_change_threshold: DEFAULT_FRAME_CHANGE_THRESHOLD,
            line_length: DEFAULT_LINE_LENGTH,
            starting_frame: 0,
            n_frames: None,
            fps: None,
            tail_search_window: TAIL_SEARCH_WINDOW,
            tail_search_angles: TAIL_SEARCH_ANGLES,
            head_search_angles: HEAD_SEARCH_ANGLES,
        }
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            path: None,
            num_backgrounds: 1,
            save: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            annotate: true,
            directory: None,
            colours: ANNOTATION_COLOURS.to_vec(),
        }
    }
}

impl TrackingParameters {
    /// Validate parameter ranges
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        if self.n_tail_points == 0 {
            return Err(Error::ConfigError("n_tail_points must be greater than 0".to_string()));
        }
        for (name, value) in [
            ("dist_tail_points", self.dist_tail_points),
            ("dist_eyes", self.dist_eyes),
            ("dist_swim_bladder", self.dist_swim_bladder),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::ConfigError(format!("{name} must be a positive distance")));
            }
        }
        if self.line_length < 0 {
            return Err(Error::ConfigError("line_length must not be negative".to_string()));
        }
        if self.n_frames == Some(0) {
            return Err(Error::ConfigError("n_frames must be greater than 0".to_string()));
        }
        if let Some(fps) = self.fps {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(Error::ConfigError("fps must be positive".to_string()));
            }
        }
        if !self.tail_search_window.is_finite() || self.tail_search_window <= 0.0 {
            return Err(Error::ConfigError("tail_search_window must be positive".to_string()));
        }
        if self.tail_search_angles == 0 || self.head_search_angles == 0 {
            return Err(Error::ConfigError(
                "search angle counts must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns `Error::IoError` if the file cannot be read and
    /// `Error::ConfigError` if it is not valid configuration YAML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if serialization fails and
    /// `Error::IoError` if the file cannot be written
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| Error::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` for invalid tracking parameters, a zero
    /// background count, a missing background image or too few annotation
    /// colours
    pub fn validate(&self) -> Result<()> {
        self.tracking.validate()?;

        if self.background.num_backgrounds == 0 {
            return Err(Error::ConfigError(
                "num_backgrounds must be greater than 0".to_string(),
            ));
        }
        if let Some(path) = &self.background.path {
            if !path.exists() {
                return Err(Error::ConfigError(format!(
                    "Background image not found: {}",
                    path.display()
                )));
            }
        }
        if self.output.annotate && self.output.colours.len() < self.tracking.n_tail_points + 3 {
            return Err(Error::ConfigError(format!(
                "Annotation needs {} colours ({} tail segments, two eyes, heading), got {}",
                self.tracking.n_tail_points + 3,
                self.tracking.n_tail_points,
                self.output.colours.len()
            )));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Free-swimming tracker configuration

# Per-frame tracking parameters
tracking:
  n_tail_points: 7
  dist_tail_points: 5.0
  dist_eyes: 4.0
  dist_swim_bladder: 12.0
  pixel_threshold: 40
  eye_threshold: 100
  frame_change_threshold: 10
  line_length: 4
  starting_frame: 0
  n_frames: null
  fps: null
  tail_search_window: 2.0943951023931953
  tail_search_angles: 20
  head_search_angles: 100

# Background model
background:
  path: null
  num_backgrounds: 1
  save: true

# Outputs
output:
  annotate: true
  directory: null
"#;
