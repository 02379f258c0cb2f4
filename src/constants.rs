//! Constants used throughout the tracker

use std::f64::consts::PI;

/// Default number of traced tail points (excluding the swim bladder)
pub const DEFAULT_N_TAIL_POINTS: usize = 7;

/// Default distance in pixels between consecutive tail points
pub const DEFAULT_DIST_TAIL_POINTS: f64 = 5.0;

/// Default distance in pixels between the two eyes
pub const DEFAULT_DIST_EYES: f64 = 4.0;

/// Default distance in pixels between the eye midpoint and the swim bladder
pub const DEFAULT_DIST_SWIM_BLADDER: f64 = 12.0;

/// Default minimum brightness a frame must exceed to be tracked
pub const DEFAULT_PIXEL_THRESHOLD: u8 = 40;

/// Default binarisation threshold for eye contours
pub const DEFAULT_EYE_THRESHOLD: u8 = 100;

/// Default per-pixel change that counts as movement between frames
pub const DEFAULT_FRAME_CHANGE_THRESHOLD: u8 = 10;

/// Default length of annotation lines in pixels
pub const DEFAULT_LINE_LENGTH: i32 = 4;

/// Candidate angles used for the full-circle eye and swim bladder searches
pub const HEAD_SEARCH_ANGLES: usize = 100;

/// Candidate angles used for each tail step
pub const TAIL_SEARCH_ANGLES: usize = 20;

/// Angular window of each tail step (±60° around the seed direction)
pub const TAIL_SEARCH_WINDOW: f64 = 2.0 * PI / 3.0;

/// Full turn, used as the window of a full-circle search
pub const FULL_CIRCLE: f64 = 2.0 * PI;

/// Median blur aperture applied after background subtraction
pub const MEDIAN_BLUR_KSIZE: i32 = 3;

/// Log a progress line every this many frames
pub const PROGRESS_LOG_INTERVAL: usize = 100;

/// Default frames per second assumption when the container reports none
pub const DEFAULT_FPS: f64 = 30.0;

/// Minimum number of contour points `fitEllipse` accepts
pub const MIN_ELLIPSE_POINTS: usize = 5;

/// Tip length of the heading arrow, relative to the arrow length
pub const HEADING_ARROW_TIP: f64 = 0.2;

/// Annotation palette in BGR order. Tail segments take the leading entries,
/// the first and second eye the third and second last, the heading the last.
pub const ANNOTATION_COLOURS: [[u8; 3]; 11] = [
    [0, 0, 255],
    [0, 127, 255],
    [0, 255, 255],
    [0, 255, 127],
    [0, 255, 0],
    [255, 255, 0],
    [255, 0, 0],
    [255, 0, 127],
    [147, 20, 255],
    [139, 139, 0],
    [49, 191, 114],
];

/// Suffix of the annotated output video
pub const TRACKED_VIDEO_SUFFIX: &str = "_tracked.avi";

/// Suffix of the results archive
pub const RESULTS_SUFFIX: &str = "_results.json";

/// Stem suffix of saved background images
pub const BACKGROUND_SUFFIX: &str = "_brightest_background";
