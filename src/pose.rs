//! Per-frame pose records and the time series accumulated over a video.

use crate::{
    config::TrackingParameters,
    geometry::{nan_as_null, Point},
    localizer::HeadPose,
    Error, Result,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, io::BufWriter, path::Path};

/// Pose of the fish in one frame. An undetected frame is all NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseRecord {
    /// First eye centroid
    pub first_eye: Point,
    /// Second eye centroid
    pub second_eye: Point,
    /// First eye orientation (radians)
    #[serde(with = "nan_as_null")]
    pub first_eye_angle: f64,
    /// Second eye orientation (radians)
    #[serde(with = "nan_as_null")]
    pub second_eye_angle: f64,
    /// Body centroid
    pub body: Point,
    /// Heading (radians)
    #[serde(with = "nan_as_null")]
    pub heading_angle: f64,
    /// Swim bladder
    pub swim_bladder: Point,
    /// Swim bladder followed by the traced tail points
    pub tail: Vec<Point>,
}

impl PoseRecord {
    /// All-NaN record for a frame with `n_tail_points` tail points
    #[must_use]
    pub fn invalid(n_tail_points: usize) -> Self {
        Self {
            first_eye: Point::NAN,
            second_eye: Point::NAN,
            first_eye_angle: f64::NAN,
            second_eye_angle: f64::NAN,
            body: Point::NAN,
            heading_angle: f64::NAN,
            swim_bladder: Point::NAN,
            tail: vec![Point::NAN; n_tail_points + 1],
        }
    }

    /// Assemble a record from detected landmarks
    #[must_use]
    pub fn from_detection(head: &HeadPose, tail_points: &[Point]) -> Self {
        let mut tail = Vec::with_capacity(tail_points.len() + 1);
        tail.push(head.swim_bladder);
        tail.extend_from_slice(tail_points);
        Self {
            first_eye: head.first_eye.point,
            second_eye: head.second_eye.point,
            first_eye_angle: head.first_eye.angle,
            second_eye_angle: head.second_eye.angle,
            body: head.body,
            heading_angle: head.heading_angle,
            swim_bladder: head.swim_bladder,
            tail,
        }
    }

    /// Whether the record holds a detection
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.first_eye.is_valid() && self.second_eye.is_valid() && self.body.is_valid()
    }

    /// Number of traced tail points, excluding the swim bladder
    #[must_use]
    pub fn n_tail_points(&self) -> usize {
        self.tail.len().saturating_sub(1)
    }

    /// Midpoint of the eyes, origin of the heading arrow
    #[must_use]
    pub fn heading_point(&self) -> Point {
        self.first_eye.midpoint(&self.second_eye)
    }

    /// Bit-for-bit equality, NaN included
    #[must_use]
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.first_eye.bit_eq(&other.first_eye)
            && self.second_eye.bit_eq(&other.second_eye)
            && self.first_eye_angle.to_bits() == other.first_eye_angle.to_bits()
            && self.second_eye_angle.to_bits() == other.second_eye_angle.to_bits()
            && self.body.bit_eq(&other.body)
            && self.heading_angle.to_bits() == other.heading_angle.to_bits()
            && self.swim_bladder.bit_eq(&other.swim_bladder)
            && self.tail.len() == other.tail.len()
            && self.tail.iter().zip(&other.tail).all(|(a, b)| a.bit_eq(b))
    }
}

/// Reason a frame produced no detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Frame maximum did not exceed the pixel threshold
    NoSignal,
    /// A landmark could not be resolved
    Degenerate,
    /// The frame could not be decoded
    Decode,
}

/// How a frame's record was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    /// Full detection
    Normal,
    /// Unchanged frame, previous record repeated
    Still,
    /// No detection
    Failed(FailureKind),
}

/// Time-ordered poses of one tracking run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseTimeSeries {
    /// Frame rate of the tracked video
    pub video_fps: f64,
    /// Number of frames in the tracked video
    pub video_n_frames: usize,
    /// Index of the first tracked frame
    pub starting_frame: usize,
    /// Parameters the run used
    pub parameters: TrackingParameters,
    /// Annotation colours (BGR)
    pub colours: Vec<[u8; 3]>,
    records: Vec<PoseRecord>,
    statuses: Vec<FrameStatus>,
}

impl PoseTimeSeries {
    /// Create an empty series
    #[must_use]
    pub fn new(
        video_fps: f64,
        video_n_frames: usize,
        parameters: TrackingParameters,
        colours: Vec<[u8; 3]>,
    ) -> Self {
        Self {
            video_fps,
            video_n_frames,
            starting_frame: parameters.starting_frame,
            parameters,
            colours,
            records: Vec::new(),
            statuses: Vec::new(),
        }
    }

    /// Append the record of the next frame
    pub fn push(&mut self, record: PoseRecord, status: FrameStatus) {
        self.records.push(record);
        self.statuses.push(status);
    }

    /// Number of frames recorded
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no frame has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in frame order
    #[must_use]
    pub fn records(&self) -> &[PoseRecord] {
        &self.records
    }

    /// Statuses in frame order
    #[must_use]
    pub fn statuses(&self) -> &[FrameStatus] {
        &self.statuses
    }

    /// Number of frames with the given status
    #[must_use]
    pub fn count_status(&self, status: FrameStatus) -> usize {
        self.statuses.iter().filter(|s| **s == status).count()
    }

    /// Eye centroids per frame
    #[must_use]
    pub fn eye_coords(&self) -> Vec<[Point; 2]> {
        self.records.iter().map(|r| [r.first_eye, r.second_eye]).collect()
    }

    /// Eye angles per frame
    #[must_use]
    pub fn eye_angles(&self) -> Vec<[f64; 2]> {
        self.records
            .iter()
            .map(|r| [r.first_eye_angle, r.second_eye_angle])
            .collect()
    }

    /// Swim bladder and tail points per frame
    #[must_use]
    pub fn tail_coords(&self) -> Vec<Vec<Point>> {
        self.records.iter().map(|r| r.tail.clone()).collect()
    }

    /// Body centroid per frame
    #[must_use]
    pub fn body_coords(&self) -> Vec<Point> {
        self.records.iter().map(|r| r.body).collect()
    }

    /// Heading per frame
    #[must_use]
    pub fn heading_angles(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.heading_angle).collect()
    }

    /// Write the series as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        info!("Saved {} tracked frames to {}", self.len(), path.display());
        Ok(())
    }

    /// Read a series written by [`PoseTimeSeries::save`]
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is inconsistent
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let series: Self = serde_json::from_reader(reader)?;
        if series.records.len() != series.statuses.len() {
            return Err(Error::InvalidInput(format!(
                "Archive has {} records but {} statuses",
                series.records.len(),
                series.statuses.len()
            )));
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detected() -> PoseRecord {
        PoseRecord {
            first_eye: Point::new(40.0, 46.0),
            second_eye: Point::new(40.0, 54.0),
            first_eye_angle: 0.5,
            second_eye_angle: -0.5,
            body: Point::new(44.0, 50.0),
            heading_angle: -std::f64::consts::FRAC_PI_2,
            swim_bladder: Point::new(52.0, 50.0),
            tail: vec![Point::new(52.0, 50.0), Point::new(57.0, 50.0)],
        }
    }

    #[test]
    fn test_invalid_record_shape() {
        let record = PoseRecord::invalid(7);
        assert_eq!(record.tail.len(), 8);
        assert_eq!(record.n_tail_points(), 7);
        assert!(!record.is_valid());
        assert!(record.tail.iter().all(|p| !p.is_valid()));
        assert!(record.bit_eq(&PoseRecord::invalid(7)));
        assert!(!record.bit_eq(&PoseRecord::invalid(6)));
    }

    #[test]
    fn test_heading_point_is_eye_midpoint() {
        let p = detected().heading_point();
        assert_eq!((p.row, p.col), (40.0, 50.0));
    }

    #[test]
    fn test_columns_and_counts() {
        let mut series = PoseTimeSeries::new(30.0, 3, TrackingParameters::default(), vec![]);
        series.push(detected(), FrameStatus::Normal);
        series.push(detected(), FrameStatus::Still);
        series.push(PoseRecord::invalid(1), FrameStatus::Failed(FailureKind::NoSignal));

        assert_eq!(series.len(), 3);
        assert_eq!(series.count_status(FrameStatus::Still), 1);
        assert_eq!(series.eye_coords()[0][1].col, 54.0);
        assert_eq!(series.eye_angles()[1], [0.5, -0.5]);
        assert_eq!(series.tail_coords()[0].len(), 2);
        assert!(series.body_coords()[2].row.is_nan());
        assert!(series.heading_angles()[2].is_nan());
    }

    #[test]
    fn test_save_and_load_keeps_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fish_results.json");

        let mut series = PoseTimeSeries::new(25.0, 2, TrackingParameters::default(), vec![[0, 0, 255]]);
        series.push(detected(), FrameStatus::Normal);
        series.push(PoseRecord::invalid(1), FrameStatus::Failed(FailureKind::Decode));
        series.save(&path).unwrap();

        let loaded = PoseTimeSeries::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.statuses(), series.statuses());
        assert_eq!(loaded.parameters, series.parameters);
        assert_eq!(loaded.colours, vec![[0, 0, 255]]);
        assert!(loaded.records()[0].bit_eq(&series.records()[0]));
        assert!(!loaded.records()[1].is_valid());
        assert!(loaded.records()[1].first_eye_angle.is_nan());
    }
}
