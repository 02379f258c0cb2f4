//! Command-line tracker for free-swimming larval fish videos.

use anyhow::{bail, Context, Result};
use clap::Parser;
use free_swimming_tracker::{
    background::{load_background, save_background},
    config::{Config, EXAMPLE_CONFIG},
    constants::BACKGROUND_SUFFIX,
    preprocess::subtract_background,
    tracker::{output_path, track_video_file},
    video::load_frame,
};
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Video file to track
    video: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Background image to use instead of computing one
    #[arg(short, long)]
    background: Option<PathBuf>,

    /// Number of backgrounds computed over consecutive chunks of the video
    #[arg(long)]
    num_backgrounds: Option<usize>,

    /// Do not save computed backgrounds next to the video
    #[arg(long)]
    no_save_background: bool,

    /// Do not write the annotated video
    #[arg(long)]
    no_annotate: bool,

    /// Directory for the results and annotated video
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// First frame to track
    #[arg(long)]
    starting_frame: Option<usize>,

    /// Number of frames to track
    #[arg(long)]
    n_frames: Option<usize>,

    /// Frame rate of the outputs
    #[arg(long)]
    fps: Option<f64>,

    /// Number of tail points
    #[arg(long)]
    n_tail_points: Option<usize>,

    /// Distance between tail points (pixels)
    #[arg(long)]
    dist_tail_points: Option<f64>,

    /// Distance between the eyes (pixels)
    #[arg(long)]
    dist_eyes: Option<f64>,

    /// Distance from the eyes to the swim bladder (pixels)
    #[arg(long)]
    dist_swim_bladder: Option<f64>,

    /// Minimum brightness a frame must exceed to be tracked
    #[arg(long)]
    pixel_threshold: Option<u8>,

    /// Threshold used to segment the eyes
    #[arg(long)]
    eye_threshold: Option<u8>,

    /// Per-pixel change that counts as movement between frames
    #[arg(long)]
    frame_change_threshold: Option<u8>,

    /// Length of annotation lines (pixels)
    #[arg(long)]
    line_length: Option<i32>,

    /// Save the background-subtracted version of this frame and exit
    #[arg(long)]
    preview: Option<usize>,

    /// Write an example configuration file and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        let tracking = &mut config.tracking;
        if let Some(v) = self.starting_frame {
            tracking.starting_frame = v;
        }
        if self.n_frames.is_some() {
            tracking.n_frames = self.n_frames;
        }
        if self.fps.is_some() {
            tracking.fps = self.fps;
        }
        if let Some(v) = self.n_tail_points {
            tracking.n_tail_points = v;
        }
        if let Some(v) = self.dist_tail_points {
            tracking.dist_tail_points = v;
        }
        if let Some(v) = self.dist_eyes {
            tracking.dist_eyes = v;
        }
        if let Some(v) = self.dist_swim_bladder {
            tracking.dist_swim_bladder = v;
        }
        if let Some(v) = self.pixel_threshold {
            tracking.pixel_threshold = v;
        }
        if let Some(v) = self.eye_threshold {
            tracking.eye_threshold = v;
        }
        if let Some(v) = self.frame_change_threshold {
            tracking.frame_change_threshold = v;
        }
        if let Some(v) = self.line_length {
            tracking.line_length = v;
        }

        if self.background.is_some() {
            config.background.path = self.background.clone();
        }
        if let Some(v) = self.num_backgrounds {
            config.background.num_backgrounds = v;
        }
        if self.no_save_background {
            config.background.save = false;
        }
        if self.no_annotate {
            config.output.annotate = false;
        }
        if self.output_dir.is_some() {
            config.output.directory = self.output_dir.clone();
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if let Some(path) = &args.write_config {
        std::fs::write(path, EXAMPLE_CONFIG)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote example configuration to {}", path.display());
        return Ok(());
    }

    let Some(video) = args.video.clone() else {
        bail!("No video given. Pass a video path or --write-config <PATH>");
    };

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("Failed to load {}", path.display()))?
        }
        None => Config::default(),
    };
    args.apply(&mut config);

    if let Some(index) = args.preview {
        let background_file = config.background.path.clone().with_context(|| {
            format!("--preview needs a background image (e.g. {}{BACKGROUND_SUFFIX}.tif)", video.display())
        })?;
        let background = load_background(&background_file)?;
        let frame = load_frame(&video, index)?;
        let preview = subtract_background(&frame, &background)?;
        let path = output_path(&video, config.output.directory.as_deref(), &format!("_preview{index}.png"));
        save_background(&path, &preview)?;
        info!("Saved preview of frame {index} to {}", path.display());
        return Ok(());
    }

    info!("Free-swimming tracker: {}", video.display());
    let (report, outputs) = track_video_file(&video, &config)?;
    if report.cancelled {
        warn!("Tracking stopped early");
    }
    info!("Results written to {}", outputs.results.display());
    if let Some(path) = outputs.annotated_video {
        info!("Annotated video written to {}", path.display());
    }

    Ok(())
}
