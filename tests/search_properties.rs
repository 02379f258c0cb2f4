//! Property tests for the radial search and tail tracing


use free_swimming_tracker::{
    config::TrackingParameters,
    geometry::{flip_angle, Point},
    search::{candidate_points, find_next_point, ArcSearch},
    tail::trace_tail,
};
use opencv::{core::Mat, prelude::*};
use proptest::prelude::*;
use std::f64::consts::PI;
use test_helpers::{create_test_image, test_params};

/// Mark a tail that bends by `turn` radians per segment. Each pixel is the
/// candidate closest to the ideal arc among those searched from the
/// previous pixel, so an exact trace reproduces every one of them.
fn draw_curved_tail(
    frame: &mut Mat,
    start: Point,
    heading: f64,
    turn: f64,
    params: &TrackingParameters,
) -> Vec<Point> {
    let mut points: Vec<Point> = Vec::with_capacity(params.n_tail_points);
    let mut centre = flip_angle(heading);
    for k in 0..params.n_tail_points {
        let previous = if k == 0 { start } else { points[k - 1] };
        if k > 0 {
            let from = if k == 1 { start } else { points[k - 2] };
            centre = from.angle_to(&previous);
        }
        let ideal = previous.project(flip_angle(heading) + turn * k as f64, params.dist_tail_points);
        let search = ArcSearch::tail(
            params.dist_tail_points,
            centre,
            params.tail_search_window,
            params.tail_search_angles,
        );
        let (row, col) = candidate_points(&previous, &search)
            .unwrap()
            .into_iter()
            .min_by(|a, b| {
                let da = ideal.distance_to(&Point::from_pixel(a.0, a.1));
                let db = ideal.distance_to(&Point::from_pixel(b.0, b.1));
                da.total_cmp(&db)
            })
            .unwrap();
        *frame.at_2d_mut::<u8>(row, col).unwrap() = 200;
        points.push(Point::from_pixel(row, col));
    }
    points
}

proptest! {
    #[test]
    fn prop_curved_tail_is_fully_reconstructed(
        heading in -PI..PI,
        turn in -0.3f64..0.3,
        n in 1usize..7,
    ) {
        let mut frame = create_test_image(120, 120).unwrap();
        let params = TrackingParameters {
            n_tail_points: n,
            dist_tail_points: 6.0,
            ..test_params()
        };
        let start = Point::new(60.0, 60.0);
        let drawn = draw_curved_tail(&mut frame, start, heading, turn, &params);

        let traced = trace_tail(&frame, &start, heading, &params).unwrap();
        prop_assert_eq!(traced.len(), n);
        for (k, (t, d)) in traced.iter().zip(&drawn).enumerate() {
            prop_assert!(t.bit_eq(d), "point {} traced at ({}, {}), drawn at ({}, {})", k, t.row, t.col, d.row, d.col);
        }
    }

    #[test]
    fn prop_candidates_lie_on_the_arc(
        row in 10.0f64..90.0,
        col in 10.0f64..90.0,
        radius in 2.0f64..8.0,
        n in 1usize..120,
    ) {
        let seed = Point::new(row, col);
        let candidates = candidate_points(&seed, &ArcSearch::full_circle(radius, n)).unwrap();
        prop_assert!(!candidates.is_empty());
        prop_assert!(candidates.windows(2).all(|w| w[0] != w[1]));
        for &(r, c) in &candidates {
            let d = seed.distance_to(&Point::from_pixel(r, c));
            // Rounding moves a point by at most half a pixel on each axis
            prop_assert!((d - radius).abs() <= 0.5f64.hypot(0.5) + 1e-9);
        }
    }

    #[test]
    fn prop_search_returns_brightest_candidate(
        angle in -PI..PI,
        bright in 0usize..20,
        value in 1u8..=255,
    ) {
        let mut frame = create_test_image(60, 60).unwrap();
        let seed = Point::new(30.0, 30.0);
        let search = ArcSearch::tail(6.0, angle, 2.0 * PI / 3.0, 20);
        let candidates = candidate_points(&seed, &search).unwrap();
        let target = candidates[bright % candidates.len()];
        *frame.at_2d_mut::<u8>(target.0, target.1).unwrap() = value;

        let found = find_next_point(&frame, &seed, &search).unwrap();
        prop_assert_eq!((found.row as i32, found.col as i32), target);
    }

    #[test]
    fn prop_tail_points_are_evenly_spaced(heading in -PI..PI, n in 1usize..6) {
        // A blank frame makes every step a tie, resolved towards the search direction
        let frame = create_test_image(100, 100).unwrap();
        let params = TrackingParameters { n_tail_points: n, ..test_params() };
        let start = Point::new(50.0, 50.0);
        let tail = trace_tail(&frame, &start, heading, &params).unwrap();
        prop_assert_eq!(tail.len(), n);

        let mut previous = start;
        for point in &tail {
            let step = previous.distance_to(point);
            prop_assert!((step - params.dist_tail_points).abs() <= 0.5f64.hypot(0.5) + 1e-9);
            previous = *point;
        }
    }
}
