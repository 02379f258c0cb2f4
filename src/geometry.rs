//! Pixel-space geometry: points in `(row, col)` order and angle helpers.
//!
//! All angles follow the image convention used by the tracker:
//! `atan2(Δrow, Δcol)`, so positive angles turn towards increasing rows
//! (downwards on screen).

use crate::{utils::safe_cast::round_to_i32, Result};
use opencv::core::{Point as CvPoint, Point2f};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A pixel coordinate in `(row, col)` order. NaN components mark a point
/// that could not be detected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Point {
    /// Row (y) coordinate
    #[serde(with = "nan_as_null")]
    pub row: f64,
    /// Column (x) coordinate
    #[serde(with = "nan_as_null")]
    pub col: f64,
}

impl Point {
    /// The invalid point
    pub const NAN: Self = Self { row: f64::NAN, col: f64::NAN };

    /// Create a new point
    #[must_use]
    pub const fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }

    /// Create a point from integer pixel indices
    #[must_use]
    pub fn from_pixel(row: i32, col: i32) -> Self {
        Self::new(f64::from(row), f64::from(col))
    }

    /// Whether both coordinates are finite
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.row.is_finite() && self.col.is_finite()
    }

    /// Direction from `self` to `other`, `atan2(Δrow, Δcol)`
    #[must_use]
    pub fn angle_to(&self, other: &Self) -> f64 {
        (other.row - self.row).atan2(other.col - self.col)
    }

    /// Euclidean distance
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        (other.row - self.row).hypot(other.col - self.col)
    }

    /// Midpoint between two points (not rounded)
    #[must_use]
    pub fn midpoint(&self, other: &Self) -> Self {
        Self::new((self.row + other.row) / 2.0, (self.col + other.col) / 2.0)
    }

    /// Point at `distance` from `self` along `angle`
    #[must_use]
    pub fn project(&self, angle: f64, distance: f64) -> Self {
        Self::new(self.row + distance * angle.sin(), self.col + distance * angle.cos())
    }

    /// Snap to the nearest pixel
    ///
    /// # Errors
    ///
    /// Returns an error if a coordinate is NaN or out of `i32` range
    pub fn rounded(&self) -> Result<Self> {
        Ok(Self::from_pixel(round_to_i32(self.row)?, round_to_i32(self.col)?))
    }

    /// OpenCV integer point (`x = col`, `y = row`)
    ///
    /// # Errors
    ///
    /// Returns an error if a coordinate is NaN or out of `i32` range
    pub fn to_cv(&self) -> Result<CvPoint> {
        Ok(CvPoint::new(round_to_i32(self.col)?, round_to_i32(self.row)?))
    }

    /// OpenCV floating point (`x = col`, `y = row`)
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_cv_f32(&self) -> Point2f {
        Point2f::new(self.col as f32, self.row as f32)
    }

    /// Bitwise equality, treating identical NaN payloads as equal
    #[must_use]
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.row.to_bits() == other.row.to_bits() && self.col.to_bits() == other.col.to_bits()
    }
}

/// Centroid of three points, snapped to the nearest pixel
///
/// # Errors
///
/// Returns an error if any point is invalid
pub fn triangle_centroid(a: &Point, b: &Point, c: &Point) -> Result<Point> {
    Point::new((a.row + b.row + c.row) / 3.0, (a.col + b.col + c.col) / 3.0).rounded()
}

/// Reverse an angle by π, keeping the result in (−π, π] for inputs in that range
#[must_use]
pub fn flip_angle(angle: f64) -> f64 {
    if angle > 0.0 {
        angle - PI
    } else {
        angle + PI
    }
}

/// Serialize NaN as `null` so archives stay valid JSON
pub(crate) mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_angle_to_uses_row_col_order() {
        let origin = Point::new(10.0, 10.0);
        assert_eq!(origin.angle_to(&Point::new(10.0, 15.0)), 0.0);
        assert!((origin.angle_to(&Point::new(15.0, 10.0)) - PI / 2.0).abs() < 1e-12);
        assert!((origin.angle_to(&Point::new(10.0, 5.0)) - PI).abs() < 1e-12);
    }

    #[test]
    fn test_project_and_round() {
        let p = Point::new(20.0, 20.0).project(PI / 2.0, 5.0).rounded().unwrap();
        assert_eq!((p.row, p.col), (25.0, 20.0));
    }

    #[test]
    fn test_rounded_rejects_nan() {
        assert!(Point::NAN.rounded().is_err());
        assert!(!Point::NAN.is_valid());
    }

    #[test]
    fn test_triangle_centroid() {
        let c = triangle_centroid(
            &Point::new(52.0, 50.0),
            &Point::new(40.0, 46.0),
            &Point::new(40.0, 54.0),
        )
        .unwrap();
        assert_eq!((c.row, c.col), (44.0, 50.0));
    }

    #[test]
    fn test_flip_angle() {
        assert!((flip_angle(PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((flip_angle(-PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert_eq!(flip_angle(0.0), PI);
        assert_eq!(flip_angle(PI), 0.0);
    }

    #[test]
    fn test_bit_eq_nan() {
        assert!(Point::NAN.bit_eq(&Point::NAN));
        assert!(!Point::NAN.bit_eq(&Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_nan_serializes_as_null() {
        let json = serde_json::to_string(&Point::NAN).unwrap();
        assert_eq!(json, r#"{"row":null,"col":null}"#);
        let back: Point = serde_json::from_str(&json).unwrap();
        assert!(back.row.is_nan() && back.col.is_nan());
    }

    proptest! {
        #[test]
        fn prop_flip_stays_in_range(angle in -PI..=PI) {
            let flipped = flip_angle(angle);
            prop_assert!(flipped > -PI - 1e-12 && flipped <= PI + 1e-12);
            prop_assert!(((flipped - angle).abs() - PI).abs() < 1e-9);
        }
    }
}
