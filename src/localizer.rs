//! Eye, swim bladder and body localisation on a preprocessed frame.
//!
//! The brightest pixel seeds the first eye and a radial search finds the
//! second. Both seeds are then refined to the centroid of the binary eye
//! region containing them, which also yields each eye's orientation from an
//! ellipse fit. The swim bladder is the brightest pixel at a fixed distance
//! from the eye midpoint, and the body sits at the centroid of the triangle
//! formed by the eyes and the swim bladder.

use crate::{
    config::TrackingParameters,
    constants::MIN_ELLIPSE_POINTS,
    geometry::{flip_angle, triangle_centroid, Point},
    search::{find_next_point, ArcSearch},
    utils::{brightest_pixel, ensure_gray_u8},
    Error, Result,
};
use log::debug;
use opencv::{
    core::{Mat, Point as CvPoint, Point2f, Vector},
    imgproc,
    prelude::*,
};
use std::f64::consts::PI;

/// Refined eye position and orientation
#[derive(Debug, Clone, Copy)]
pub struct Eye {
    /// Centroid of the eye region
    pub point: Point,
    /// Orientation of the fitted ellipse, pointing away from the body (radians)
    pub angle: f64,
}

/// Landmarks of the head found in one frame
#[derive(Debug, Clone, Copy)]
pub struct HeadPose {
    /// First eye, kept on the same side of the fish across frames
    pub first_eye: Eye,
    /// Second eye
    pub second_eye: Eye,
    /// Direction from the first to the second eye seed, after any swap
    pub eye_axis_angle: f64,
    /// Midpoint of the refined eyes
    pub heading_point: Point,
    /// Centroid of the eyes and swim bladder
    pub body: Point,
    /// Direction from the body to the heading point
    pub heading_angle: f64,
    /// Swim bladder position
    pub swim_bladder: Point,
}

/// Whether the eye labels flipped relative to the previous frame.
///
/// A change of the eye axis direction by more than a quarter turn (but less
/// than three quarters) means the two seeds were found the other way round.
#[must_use]
pub fn should_swap_eyes(previous: f64, current: f64) -> bool {
    let d = current - previous;
    (d > PI / 2.0 || d < -PI / 2.0) && d < 3.0 * PI / 2.0 && d > -3.0 * PI / 2.0
}

/// Fail with `Error::NoSignal` unless the frame maximum exceeds the pixel
/// threshold
///
/// # Errors
///
/// Returns `Error::NoSignal` for `max <= pixel_threshold`
pub fn check_signal(max: u8, params: &TrackingParameters) -> Result<()> {
    if max <= params.pixel_threshold {
        return Err(Error::NoSignal {
            max,
            threshold: params.pixel_threshold,
        });
    }
    Ok(())
}

/// Locate the eyes, swim bladder, body and heading
///
/// # Errors
///
/// Returns `Error::NoSignal` if the frame is too dark and
/// `Error::Degenerate` if a landmark cannot be resolved
pub fn locate_head(
    frame: &Mat,
    params: &TrackingParameters,
    previous_eye_angle: Option<f64>,
) -> Result<HeadPose> {
    let brightest = brightest_pixel(frame)?;
    locate_head_at(frame, brightest, params, previous_eye_angle)
}

/// [`locate_head`] with the frame's brightest pixel `(row, col, value)`
/// already known
///
/// # Errors
///
/// Same as [`locate_head`]
pub fn locate_head_at(
    frame: &Mat,
    (row, col, max): (i32, i32, u8),
    params: &TrackingParameters,
    previous_eye_angle: Option<f64>,
) -> Result<HeadPose> {
    ensure_gray_u8(frame)?;
    check_signal(max, params)?;

    let mut first_seed = Point::from_pixel(row, col);
    let mut second_seed = find_next_point(
        frame,
        &first_seed,
        &ArcSearch::full_circle(params.dist_eyes, params.head_search_angles),
    )?;
    let mut eye_axis_angle = first_seed.angle_to(&second_seed);

    if let Some(previous) = previous_eye_angle.filter(|a| a.is_finite()) {
        if should_swap_eyes(previous, eye_axis_angle) {
            debug!(
                "Swapping eyes: axis angle {eye_axis_angle:.3} against previous {previous:.3}"
            );
            std::mem::swap(&mut first_seed, &mut second_seed);
            eye_axis_angle = first_seed.angle_to(&second_seed);
        }
    }

    let contours = eye_contours(frame, params.eye_threshold)?;
    let first_eye = refine_eye(&contours, &first_seed)?;
    let second_eye = refine_eye(&contours, &second_seed)?;

    let heading_point = first_eye.point.midpoint(&second_eye.point);
    let swim_bladder = find_next_point(
        frame,
        &heading_point,
        &ArcSearch::full_circle(params.dist_swim_bladder, params.head_search_angles),
    )?;
    let body = triangle_centroid(&swim_bladder, &first_eye.point, &second_eye.point)?;
    let heading_angle = body.angle_to(&heading_point);

    let triangle: Vector<Point2f> = [swim_bladder, first_eye.point, second_eye.point]
        .iter()
        .map(Point::to_cv_f32)
        .collect();
    let reach = params.dist_eyes / 2.0;
    let first_eye = orient_away_from_body(first_eye, &triangle, reach)?;
    let second_eye = orient_away_from_body(second_eye, &triangle, reach)?;

    Ok(HeadPose {
        first_eye,
        second_eye,
        eye_axis_angle,
        heading_point,
        body,
        heading_angle,
        swim_bladder,
    })
}

fn eye_contours(frame: &Mat, eye_threshold: u8) -> Result<Vector<Vector<CvPoint>>> {
    let mut binary = Mat::default();
    imgproc::threshold(
        frame,
        &mut binary,
        f64::from(eye_threshold),
        255.0,
        imgproc::THRESH_BINARY,
    )?;
    let mut contours: Vector<Vector<CvPoint>> = Vector::new();
    imgproc::find_contours(
        &binary,
        &mut contours,
        imgproc::RETR_EXTERNAL,
        imgproc::CHAIN_APPROX_NONE,
        CvPoint::new(0, 0),
    )?;
    Ok(contours)
}

/// Replace a seed with the centroid and ellipse orientation of the region
/// strictly containing it
fn refine_eye(contours: &Vector<Vector<CvPoint>>, seed: &Point) -> Result<Eye> {
    let target = seed.to_cv_f32();
    for contour in contours {
        if imgproc::point_polygon_test(&contour, target, false)? != 1.0 {
            continue;
        }
        if contour.len() < MIN_ELLIPSE_POINTS {
            return Err(Error::Degenerate(format!(
                "Eye contour at ({}, {}) has only {} points",
                seed.row,
                seed.col,
                contour.len()
            )));
        }
        let m = imgproc::moments(&contour, false)?;
        if m.m00 == 0.0 {
            return Err(Error::Degenerate(format!(
                "Eye contour at ({}, {}) has zero area",
                seed.row, seed.col
            )));
        }
        let point = Point::new(m.m01 / m.m00, m.m10 / m.m00).rounded()?;
        let ellipse = imgproc::fit_ellipse(&contour)?;
        return Ok(Eye {
            point,
            angle: f64::from(ellipse.angle).to_radians(),
        });
    }
    Err(Error::Degenerate(format!(
        "No eye region contains ({}, {})",
        seed.row, seed.col
    )))
}

/// Flip an eye angle that points into the body triangle
fn orient_away_from_body(eye: Eye, triangle: &Vector<Point2f>, reach: f64) -> Result<Eye> {
    let probe = eye.point.project(eye.angle, reach);
    if imgproc::point_polygon_test(triangle, probe.to_cv_f32(), false)? == 1.0 {
        return Ok(Eye {
            angle: flip_angle(eye.angle),
            ..eye
        });
    }
    Ok(eye)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::CV_8UC1;

    fn fill(frame: &mut Mat, rows: std::ops::RangeInclusive<i32>, cols: std::ops::RangeInclusive<i32>, value: u8) {
        for r in rows {
            for c in cols.clone() {
                *frame.at_2d_mut::<u8>(r, c).unwrap() = value;
            }
        }
    }

    /// Eyes at (40, 46) and (40, 54), swim bladder at (52, 50)
    fn head_frame(left_core: u8, right_core: u8) -> Mat {
        let mut frame = Mat::zeros(100, 100, CV_8UC1).unwrap().to_mat().unwrap();
        fill(&mut frame, 37..=43, 44..=48, 150);
        fill(&mut frame, 39..=41, 45..=47, left_core);
        fill(&mut frame, 37..=43, 52..=56, 150);
        fill(&mut frame, 39..=41, 53..=55, right_core);
        fill(&mut frame, 51..=53, 49..=51, 180);
        frame
    }

    fn params() -> TrackingParameters {
        TrackingParameters {
            dist_eyes: 8.0,
            dist_swim_bladder: 12.0,
            pixel_threshold: 100,
            eye_threshold: 100,
            ..TrackingParameters::default()
        }
    }

    #[test]
    fn test_should_swap_eyes() {
        assert!(should_swap_eyes(0.1, 0.1 + 3.05));
        assert!(should_swap_eyes(0.0, -PI));
        assert!(!should_swap_eyes(0.1, 0.2));
        assert!(!should_swap_eyes(0.0, PI / 2.0));
        assert!(!should_swap_eyes(0.0, 3.0 * PI / 2.0));
        assert!(!should_swap_eyes(-PI + 0.05, PI - 0.05));
    }

    #[test]
    fn test_locate_head() {
        let pose = locate_head(&head_frame(250, 245), &params(), None).unwrap();
        assert_eq!((pose.first_eye.point.row, pose.first_eye.point.col), (40.0, 46.0));
        assert_eq!((pose.second_eye.point.row, pose.second_eye.point.col), (40.0, 54.0));
        assert_eq!((pose.swim_bladder.row, pose.swim_bladder.col), (52.0, 50.0));
        assert_eq!((pose.body.row, pose.body.col), (44.0, 50.0));
        assert_eq!((pose.heading_point.row, pose.heading_point.col), (40.0, 50.0));
        assert!((pose.heading_angle + PI / 2.0).abs() < 1e-12);
        assert_eq!(pose.eye_axis_angle, 0.0);
        assert!(pose.first_eye.angle.is_finite());
        assert!(pose.second_eye.angle.is_finite());
    }

    #[test]
    fn test_eye_angles_point_away_from_body() {
        let p = params();
        let pose = locate_head(&head_frame(250, 245), &p, None).unwrap();
        let triangle: Vector<Point2f> = [pose.swim_bladder, pose.first_eye.point, pose.second_eye.point]
            .iter()
            .map(Point::to_cv_f32)
            .collect();
        for eye in [pose.first_eye, pose.second_eye] {
            let probe = eye.point.project(eye.angle, p.dist_eyes / 2.0);
            let inside = imgproc::point_polygon_test(&triangle, probe.to_cv_f32(), false).unwrap();
            assert!(inside < 1.0);
        }
    }

    #[test]
    fn test_eye_labels_follow_previous_axis() {
        // Right eye brightest: seeds come out reversed
        let frame = head_frame(245, 250);
        let unswapped = locate_head(&frame, &params(), None).unwrap();
        assert_eq!(unswapped.first_eye.point.col, 54.0);
        assert!((unswapped.eye_axis_angle - PI).abs() < 1e-12);

        let swapped = locate_head(&frame, &params(), Some(0.0)).unwrap();
        assert_eq!(swapped.first_eye.point.col, 46.0);
        assert_eq!(swapped.second_eye.point.col, 54.0);
        assert_eq!(swapped.eye_axis_angle, 0.0);
    }

    #[test]
    fn test_pixel_threshold_is_strict() {
        let frame = head_frame(250, 245);
        let mut p = params();
        p.pixel_threshold = 250;
        assert!(matches!(
            locate_head(&frame, &p, None),
            Err(Error::NoSignal { max: 250, threshold: 250 })
        ));
        p.pixel_threshold = 249;
        assert!(locate_head(&frame, &p, None).is_ok());
    }

    #[test]
    fn test_missing_eye_region_is_degenerate() {
        let frame = head_frame(250, 245);
        let mut p = params();
        p.eye_threshold = 250;
        assert!(matches!(locate_head(&frame, &p, None), Err(Error::Degenerate(_))));
    }
}
