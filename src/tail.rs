//! Sequential tail tracing from the swim bladder.

use crate::{
    config::TrackingParameters,
    geometry::{flip_angle, Point},
    search::{find_next_point, ArcSearch},
    Error, Result,
};
use opencv::core::Mat;

/// Trace `n_tail_points` points along the tail.
///
/// The first step searches opposite to the heading, each following step
/// continues the direction of the previous segment.
///
/// # Errors
///
/// Fails on the first step whose search fails; partial tails are never
/// returned.
pub fn trace_tail(
    frame: &Mat,
    swim_bladder: &Point,
    heading_angle: f64,
    params: &TrackingParameters,
) -> Result<Vec<Point>> {
    if !swim_bladder.is_valid() || !heading_angle.is_finite() {
        return Err(Error::InvalidInput(
            "Tail tracing needs a valid swim bladder and heading".to_string(),
        ));
    }

    let mut points: Vec<Point> = Vec::with_capacity(params.n_tail_points);
    let mut previous = *swim_bladder;
    let mut angle = flip_angle(heading_angle);
    for k in 0..params.n_tail_points {
        if k > 0 {
            let from = if k == 1 { *swim_bladder } else { points[k - 2] };
            angle = from.angle_to(&points[k - 1]);
        }
        let search = ArcSearch::tail(
            params.dist_tail_points,
            angle,
            params.tail_search_window,
            params.tail_search_angles,
        );
        let next = find_next_point(frame, &previous, &search)?;
        points.push(next);
        previous = next;
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::{core::CV_8UC1, prelude::*};
    use std::f64::consts::PI;

    fn params(n: usize) -> TrackingParameters {
        TrackingParameters {
            n_tail_points: n,
            dist_tail_points: 5.0,
            ..TrackingParameters::default()
        }
    }

    #[test]
    fn test_straight_tail() {
        let mut frame = Mat::zeros(100, 100, CV_8UC1).unwrap().to_mat().unwrap();
        for r in 55..=80 {
            for c in 49..=51 {
                *frame.at_2d_mut::<u8>(r, c).unwrap() = 160;
            }
        }
        let tail = trace_tail(&frame, &Point::new(52.0, 50.0), -PI / 2.0, &params(4)).unwrap();
        let coords: Vec<(f64, f64)> = tail.iter().map(|p| (p.row, p.col)).collect();
        assert_eq!(coords, vec![(57.0, 50.0), (62.0, 50.0), (67.0, 50.0), (72.0, 50.0)]);
    }

    #[test]
    fn test_tail_follows_bend_within_window() {
        // Straight down for two segments, then a diagonal bend
        let mut frame = Mat::zeros(100, 100, CV_8UC1).unwrap().to_mat().unwrap();
        for (r, c) in [(57, 50), (62, 50), (66, 53)] {
            *frame.at_2d_mut::<u8>(r, c).unwrap() = 200;
        }
        let tail = trace_tail(&frame, &Point::new(52.0, 50.0), -PI / 2.0, &params(3)).unwrap();
        assert_eq!((tail[2].row, tail[2].col), (66.0, 53.0));
    }

    #[test]
    fn test_invalid_start_fails() {
        let frame = Mat::zeros(10, 10, CV_8UC1).unwrap().to_mat().unwrap();
        assert!(trace_tail(&frame, &Point::NAN, 0.0, &params(2)).is_err());
        assert!(trace_tail(&frame, &Point::new(5.0, 5.0), f64::NAN, &params(2)).is_err());
    }

    #[test]
    fn test_tail_leaving_the_frame_fails() {
        let frame = Mat::zeros(20, 20, CV_8UC1).unwrap().to_mat().unwrap();
        // Heading up: the tail is traced downwards and leaves the frame
        let result = trace_tail(&frame, &Point::new(15.0, 10.0), -PI / 2.0, &params(3));
        assert!(matches!(result, Err(Error::Degenerate(_))));
    }
}
