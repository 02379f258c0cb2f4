//! Radial point search: sample pixels on an arc around a seed and pick the
//! brightest one.
//!
//! Candidate directions are evenly spaced across the arc, both ends
//! included. Candidates that round to the same pixel as their predecessor
//! are dropped, and candidates falling outside the frame are ignored.
//! When several candidates share the maximum intensity the [`SearchMode`]
//! decides; any tie left after that goes to the candidate with the smallest
//! (row, col), so the result does not depend on generation order.

use crate::{
    constants::FULL_CIRCLE,
    geometry::Point,
    utils::{pixel_value, safe_cast::round_to_i32},
    Error, Result,
};
use opencv::core::Mat;

/// Tie-break rule between equally bright candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Prefer the candidate whose direction is closest to the arc centre
    Tail,
    /// Prefer the candidate closest to the seed
    Nearest,
}

/// Arc of candidate pixels around a seed point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSearch {
    /// Distance from the seed (pixels)
    pub radius: f64,
    /// Direction of the arc centre (radians)
    pub center_angle: f64,
    /// Angular width of the arc (radians)
    pub window: f64,
    /// Number of sampled directions
    pub n_angles: usize,
    /// Tie-break rule
    pub mode: SearchMode,
}

impl ArcSearch {
    /// Full-circle search from −π to π, ties go to the nearest pixel
    #[must_use]
    pub fn full_circle(radius: f64, n_angles: usize) -> Self {
        Self {
            radius,
            center_angle: 0.0,
            window: FULL_CIRCLE,
            n_angles,
            mode: SearchMode::Nearest,
        }
    }

    /// Windowed search around `angle`, ties go to the most aligned pixel
    #[must_use]
    pub fn tail(radius: f64, angle: f64, window: f64, n_angles: usize) -> Self {
        Self {
            radius,
            center_angle: angle,
            window,
            n_angles,
            mode: SearchMode::Tail,
        }
    }
}

/// Candidate pixels `(row, col)` in generation order
///
/// # Errors
///
/// Returns `Error::InvalidInput` for an empty search or a non-finite seed
pub fn candidate_points(seed: &Point, search: &ArcSearch) -> Result<Vec<(i32, i32)>> {
    if search.n_angles == 0 {
        return Err(Error::InvalidInput("Search needs at least one angle".to_string()));
    }
    if !seed.is_valid() {
        return Err(Error::InvalidInput("Search seed is not a valid point".to_string()));
    }

    let start = search.center_angle - search.window / 2.0;
    let step = if search.n_angles > 1 {
        search.window / (search.n_angles - 1) as f64
    } else {
        0.0
    };

    let mut candidates: Vec<(i32, i32)> = Vec::with_capacity(search.n_angles);
    for i in 0..search.n_angles {
        let theta = start + step * i as f64;
        let p = seed.project(theta, search.radius);
        let pixel = (round_to_i32(p.row)?, round_to_i32(p.col)?);
        if candidates.last() != Some(&pixel) {
            candidates.push(pixel);
        }
    }
    Ok(candidates)
}

/// Brightest candidate on the arc
///
/// # Errors
///
/// Returns `Error::Degenerate` if no candidate lies inside the frame
pub fn find_next_point(frame: &Mat, seed: &Point, search: &ArcSearch) -> Result<Point> {
    let mut best_value: Option<u8> = None;
    let mut tied: Vec<Point> = Vec::new();

    for (row, col) in candidate_points(seed, search)? {
        let Some(value) = pixel_value(frame, row, col)? else {
            continue;
        };
        match best_value {
            Some(best) if value < best => {}
            Some(best) if value == best => tied.push(Point::from_pixel(row, col)),
            _ => {
                best_value = Some(value);
                tied.clear();
                tied.push(Point::from_pixel(row, col));
            }
        }
    }

    if tied.len() <= 1 {
        return tied.pop().ok_or_else(|| {
            Error::Degenerate(format!(
                "No search candidate inside the frame around ({:.1}, {:.1})",
                seed.row, seed.col
            ))
        });
    }

    let cost = |p: &Point| match search.mode {
        // Not wrapped: a candidate just across the ±π seam counts as far away
        SearchMode::Tail => (search.center_angle - seed.angle_to(p)).abs(),
        SearchMode::Nearest => seed.distance_to(p),
    };
    let mut winner = tied[0];
    let mut winner_cost = cost(&winner);
    for candidate in &tied[1..] {
        let c = cost(candidate);
        let row_major_first = (candidate.row, candidate.col) < (winner.row, winner.col);
        if c < winner_cost || (c == winner_cost && row_major_first) {
            winner = *candidate;
            winner_cost = c;
        }
    }
    Ok(winner)
}
