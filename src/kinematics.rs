//! Angle time series derived from a tracked [`PoseTimeSeries`], ready for
//! plotting or further analysis.
//!
//! Undetected frames stay NaN throughout. Heading and eye angles are held
//! at their last value while the tail is frozen, i.e. on runs of frames
//! whose summed tail bend is exactly equal for three frames in a row.

use crate::{geometry::Point, pose::PoseTimeSeries, Error, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1};
use std::f64::consts::PI;

/// Jumps larger than this fraction of π are treated as wrap-around
const WRAP_FRACTION: f64 = 0.9;

/// Default moving-average window for smoothing angle traces
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Tail segment angles relative to the body axis, shape `(frames, segments)`.
///
/// Segment `i` runs from tail point `i` to `i + 1` (point 0 being the swim
/// bladder); the body axis runs from the body centroid to the swim bladder.
#[must_use]
pub fn tail_angles(series: &PoseTimeSeries) -> Array2<f64> {
    let n_segments = series.parameters.n_tail_points;
    let mut angles = Array2::from_elem((series.len(), n_segments), f64::NAN);

    for (frame, record) in series.records().iter().enumerate() {
        let axis = record.body.angle_to(&record.swim_bladder);
        for (segment, pair) in record.tail.windows(2).take(n_segments).enumerate() {
            let mut angle = pair[0].angle_to(&pair[1]) - axis;
            if angle >= WRAP_FRACTION * PI {
                angle -= 2.0 * PI;
            } else if angle <= -WRAP_FRACTION * PI {
                angle += 2.0 * PI;
            }
            angles[[frame, segment]] = angle;
        }
    }
    angles
}

/// Frames starting a run of three with identical summed tail bend.
///
/// Reused poses produce such runs, and the heading and eye traces are held
/// constant over them.
#[must_use]
pub fn still_tail_frames(tail_angles: &Array2<f64>) -> Vec<bool> {
    let sums = tail_curvature(tail_angles);
    let mut held = vec![false; sums.len()];
    for i in 0..sums.len().saturating_sub(2) {
        held[i] = sums[i] == sums[i + 1] && sums[i + 1] == sums[i + 2];
    }
    held
}

/// Replace every held value with the value of the last frame that is not
/// held
pub fn hold_values(mut values: ArrayViewMut1<f64>, held: &[bool]) {
    let mut source = 0;
    for (j, &is_held) in held.iter().enumerate().take(values.len()) {
        if is_held {
            values[j] = values[source];
        } else {
            source = j;
        }
    }
}

/// Heading relative to the first detected heading, held over still-tail
/// frames and unwrapped so that turns accumulate instead of jumping by 2π
#[must_use]
pub fn heading_angles(series: &PoseTimeSeries) -> Array1<f64> {
    let raw = series.heading_angles();
    let reference = raw.iter().copied().find(|a| a.is_finite()).unwrap_or(f64::NAN);
    let mut headings: Array1<f64> = raw.iter().map(|a| a - reference).collect();
    hold_values(headings.view_mut(), &still_tail_frames(&tail_angles(series)));

    let mut offset = 0.0;
    let mut last: Option<f64> = None;
    for value in headings.iter_mut() {
        if !value.is_finite() {
            continue;
        }
        *value += offset;
        if let Some(previous) = last {
            if *value - previous > PI {
                offset -= 2.0 * PI;
                *value -= 2.0 * PI;
            } else if *value - previous < -PI {
                offset += 2.0 * PI;
                *value += 2.0 * PI;
            }
        }
        last = Some(*value);
    }
    headings
}

/// Eye angles relative to the heading, shape `(frames, 2)`, in [−π, π],
/// held over still-tail frames
#[must_use]
pub fn eye_angles(series: &PoseTimeSeries) -> Array2<f64> {
    let mut angles = Array2::from_elem((series.len(), 2), f64::NAN);
    for (frame, record) in series.records().iter().enumerate() {
        for (eye, angle) in [record.first_eye_angle, record.second_eye_angle].into_iter().enumerate() {
            angles[[frame, eye]] = angle - record.heading_angle;
        }
    }

    let held = still_tail_frames(&tail_angles(series));
    for mut column in angles.columns_mut() {
        hold_values(column.view_mut(), &held);
        for i in 1..column.len() {
            let step = column[i] - column[i - 1];
            if step > WRAP_FRACTION * PI {
                column[i] -= 2.0 * PI;
            } else if step < -WRAP_FRACTION * PI {
                column[i] += 2.0 * PI;
            }
            if column[i] > PI {
                column[i] -= 2.0 * PI;
            } else if column[i] < -PI {
                column[i] += 2.0 * PI;
            }
        }
    }
    angles
}

/// Centred moving average with zero padding at the ends, the same length as
/// the input
///
/// # Errors
///
/// Returns `Error::InvalidInput` for a zero window
pub fn moving_average(data: ArrayView1<f64>, window: usize) -> Result<Array1<f64>> {
    if window == 0 {
        return Err(Error::InvalidInput("Smoothing window must be positive".to_string()));
    }
    let n = data.len();
    let half = (window - 1) / 2;
    let scale = 1.0 / window as f64;
    let smoothed = (0..n)
        .map(|i| {
            let hi = (i + half).min(n.saturating_sub(1));
            let lo = (i + half + 1).saturating_sub(window);
            data.slice(ndarray::s![lo..=hi]).sum() * scale
        })
        .collect();
    Ok(smoothed)
}

/// Smooth each column of a `(frames, traces)` array
///
/// # Errors
///
/// Returns `Error::InvalidInput` for a zero window
pub fn smooth_columns(traces: &Array2<f64>, window: usize) -> Result<Array2<f64>> {
    let mut smoothed = Array2::from_elem(traces.dim(), f64::NAN);
    for (column, mut out) in traces.columns().into_iter().zip(smoothed.columns_mut()) {
        out.assign(&moving_average(column, window)?);
    }
    Ok(smoothed)
}

/// Time of each frame in seconds
#[must_use]
pub fn time_points(n_frames: usize, fps: f64) -> Array1<f64> {
    if n_frames == 0 || fps <= 0.0 {
        return Array1::zeros(n_frames);
    }
    Array1::linspace(0.0, n_frames as f64 / fps, n_frames)
}

/// Total tail bend per frame, the sum of absolute segment angles
#[must_use]
pub fn tail_curvature(angles: &Array2<f64>) -> Array1<f64> {
    angles.rows().into_iter().map(|row| row.iter().map(|a| a.abs()).sum()).collect()
}

/// Swim bladder displacement between consecutive frames (pixels)
#[must_use]
pub fn swim_bladder_speed(series: &PoseTimeSeries) -> Array1<f64> {
    let points: Vec<Point> = series.records().iter().map(|r| r.swim_bladder).collect();
    let mut speed = Array1::from_elem(points.len(), f64::NAN);
    for i in 1..points.len() {
        speed[i] = points[i - 1].distance_to(&points[i]);
    }
    speed
}
