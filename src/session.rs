//! Per-video tracking state and the per-frame decision between full
//! detection, reuse of the previous pose and failure.

use crate::{
    config::TrackingParameters,
    localizer::{check_signal, locate_head_at},
    movement_detector::MovementDetector,
    pose::{FailureKind, FrameStatus, PoseRecord},
    tail::trace_tail,
    utils::brightest_pixel,
    Error, Result,
};
use log::{debug, warn};
use opencv::core::Mat;

/// Record and status produced for one frame
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    /// How the record was produced
    pub status: FrameStatus,
    /// Pose of the frame
    pub record: PoseRecord,
}

impl FrameOutcome {
    fn failed(kind: FailureKind, n_tail_points: usize) -> Self {
        Self {
            status: FrameStatus::Failed(kind),
            record: PoseRecord::invalid(n_tail_points),
        }
    }
}

/// Mutable state carried between the frames of one video
pub struct TrackingSession {
    params: TrackingParameters,
    movement: MovementDetector,
    previous_eye_angle: Option<f64>,
    last_record: Option<PoseRecord>,
}

impl TrackingSession {
    /// Start a session with no history
    #[must_use]
    pub fn new(params: TrackingParameters) -> Self {
        Self {
            movement: MovementDetector::new(params.frame_change_threshold),
            params,
            previous_eye_angle: None,
            last_record: None,
        }
    }

    /// Parameters of this session
    #[must_use]
    pub fn params(&self) -> &TrackingParameters {
        &self.params
    }

    /// Eye axis angle of the last full detection
    #[must_use]
    pub fn previous_eye_angle(&self) -> Option<f64> {
        self.previous_eye_angle
    }

    /// Process one preprocessed frame. Never fails: problems with the frame
    /// are reported through the status.
    ///
    /// A frame that did not change since the last full detection repeats
    /// the record emitted for the frame just before it, whatever its status.
    pub fn process(&mut self, frame: &Mat) -> FrameOutcome {
        let outcome = match self.try_process(frame) {
            Ok(outcome) => outcome,
            Err(Error::NoSignal { max, threshold }) => {
                debug!("No signal: max {max} <= threshold {threshold}");
                FrameOutcome::failed(FailureKind::NoSignal, self.params.n_tail_points)
            }
            Err(e) => {
                warn!("Pose detection failed: {e}");
                FrameOutcome::failed(FailureKind::Degenerate, self.params.n_tail_points)
            }
        };
        self.last_record = Some(outcome.record.clone());
        outcome
    }

    /// Outcome for a frame that could not be decoded. State is unchanged, so
    /// a later still frame repeats the record from before the gap.
    #[must_use]
    pub fn record_decode_failure(&self) -> FrameOutcome {
        FrameOutcome::failed(FailureKind::Decode, self.params.n_tail_points)
    }

    /// Forget all history
    pub fn reset(&mut self) {
        self.movement.reset();
        self.previous_eye_angle = None;
        self.last_record = None;
    }

    fn try_process(&mut self, frame: &Mat) -> Result<FrameOutcome> {
        let brightest = brightest_pixel(frame)?;
        check_signal(brightest.2, &self.params)?;

        if self.movement.has_reference() && !self.movement.has_moved(frame)? {
            if let Some(previous) = &self.last_record {
                debug!("Frame unchanged, repeating previous record");
                return Ok(FrameOutcome {
                    status: FrameStatus::Still,
                    record: previous.clone(),
                });
            }
        }

        let head = locate_head_at(frame, brightest, &self.params, self.previous_eye_angle)?;
        let tail = trace_tail(frame, &head.swim_bladder, head.heading_angle, &self.params)?;
        let record = PoseRecord::from_detection(&head, &tail);

        self.movement.set_reference(frame)?;
        self.previous_eye_angle = Some(head.eye_axis_angle);

        Ok(FrameOutcome {
            status: FrameStatus::Normal,
            record,
        })
    }
}
