//! Real-time single-exercise recording
//!
//! - Every accepted frame is persisted under the exercise layout
//! - Joints are predicted remotely and stored next to the frame
//! - Follow-ups are scored against the gold-standard prediction and the
//!   ceiling of the MPJPE goes to the metric sink
//!
//! Prediction and scoring failures are logged and skip the metric; the
//! recording itself only ends on an operator abort.

use crate::domain::capture::{Capture, FrameError};
use crate::domain::joints::JointSet;
use crate::domain::types::{CaptureType, Centroid, HandSide};
use crate::io::frame_source::FrameSource;
use crate::io::metric_sink::MetricSink;
use crate::io::persister::Persister;
use crate::io::predictor::Predictor;
use crate::io::terminal::OperatorPrompt;
use crate::services::capture_gate::Persistence;
use crate::services::capture_session::{persist_capture, SessionError};
use crate::services::centroid::calculate_centroid;
use crate::services::metric::{ceil_metric, MetricCalculator};
use crate::services::path_resolver::{ExercisePaths, PREDICTION_FILE};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

/// What to record
#[derive(Debug, Clone)]
pub struct ExerciseRequest {
    /// Id the metric sink files results under
    pub subject_id: String,
    pub exercise: String,
    pub capture_type: CaptureType,
    pub hand_side: HandSide,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingSummary {
    pub captures: usize,
    pub predictions: usize,
    pub metrics_submitted: usize,
    pub last_metric: Option<i64>,
}

pub struct ExerciseRecorder<S, P, O> {
    source: S,
    persister: P,
    prompt: O,
    predictor: Box<dyn Predictor>,
    sink: Option<Box<dyn MetricSink>>,
    paths: ExercisePaths,
    calculator: MetricCalculator,
    clipping_distance_m: f64,
}

impl<S, P, O> ExerciseRecorder<S, P, O>
where
    S: FrameSource,
    P: Persister,
    O: OperatorPrompt,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: S,
        persister: P,
        prompt: O,
        predictor: Box<dyn Predictor>,
        sink: Option<Box<dyn MetricSink>>,
        paths: ExercisePaths,
        calculator: MetricCalculator,
        clipping_distance_m: f64,
    ) -> Self {
        Self { source, persister, prompt, predictor, sink, paths, calculator, clipping_distance_m }
    }

    pub fn paths(&self) -> &ExercisePaths {
        &self.paths
    }

    /// Record until the operator aborts
    pub async fn run(&mut self, request: &ExerciseRequest) -> Result<RecordingSummary, SessionError> {
        let mut summary = RecordingSummary::default();

        info!(
            subject = %request.subject_id,
            exercise = %request.exercise,
            capture_type = %request.capture_type,
            hand_side = %request.hand_side,
            "recording_started"
        );

        loop {
            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    if self.source.abort_signal() {
                        break;
                    }
                    continue;
                }
                Err(FrameError::Closed) => return Err(SessionError::SourceClosed),
                Err(e) => {
                    error!(error = %e, "frame_processing_failed");
                    if !self.prompt.confirm_continue(&e) {
                        break;
                    }
                    continue;
                }
            };

            if self.source.abort_signal() {
                info!("abort_requested");
                break;
            }
            if !self.source.capture_signal() {
                continue;
            }

            let centroid = calculate_centroid(&frame.depth, self.clipping_distance_m).unwrap_or_default();
            let at = Utc::now();
            let dir = self.paths.capture_dir(request.capture_type, &request.exercise, at);
            let capture = Capture::new(frame, centroid, dir.clone());

            match persist_capture(&mut self.persister, &mut self.prompt, &dir, &capture) {
                Ok(Persistence::Saved) => summary.captures += 1,
                Ok(Persistence::Retry) => continue,
                Err(_) => break,
            }

            let Some(joints) = self.predict(&capture, &centroid, request.hand_side).await else {
                continue;
            };
            if let Err(e) = self.persister.save_joints(&dir, &joints) {
                error!(path = %dir.display(), error = %e, "prediction_save_failed");
                if !self.prompt.confirm_continue(&e) {
                    break;
                }
                continue;
            }
            summary.predictions += 1;

            if request.capture_type.is_follow_up() {
                if let Some(metric) = self.score(request, &joints, at).await {
                    summary.metrics_submitted += 1;
                    summary.last_metric = Some(metric);
                }
            }
        }

        info!(
            captures = %summary.captures,
            predictions = %summary.predictions,
            metrics = %summary.metrics_submitted,
            "recording_finished"
        );
        Ok(summary)
    }

    async fn predict(&self, capture: &Capture, centroid: &Centroid, hand_side: HandSide) -> Option<JointSet> {
        match self.predictor.predict_joints(&capture.frame.depth, centroid, hand_side).await {
            Ok(joints) => Some(joints),
            Err(e) => {
                warn!(id = %capture.id, error = %e, "prediction_failed");
                None
            }
        }
    }

    /// Compare against the gold standard and submit; `None` when skipped
    async fn score(
        &self,
        request: &ExerciseRequest,
        joints: &JointSet,
        at: DateTime<Utc>,
    ) -> Option<i64> {
        let reference = self.paths.reference_dir(&request.exercise);
        let mpjpe = match self.calculator.compare_to_reference(&reference, joints) {
            Ok(mpjpe) => mpjpe,
            Err(e) => {
                warn!(exercise = %request.exercise, error = %e, "metric_skipped");
                return None;
            }
        };
        let metric = ceil_metric(mpjpe);
        info!(exercise = %request.exercise, mpjpe = %mpjpe, metric = %metric, "follow_up_scored");

        let sink = self.sink.as_ref()?;
        match sink.submit(&request.subject_id, &request.exercise, at, metric).await {
            Ok(()) => Some(metric),
            Err(e) => {
                warn!(exercise = %request.exercise, error = %e, "metric_submit_skipped");
                None
            }
        }
    }
}

/// True once a gold-standard prediction exists for `exercise`
pub fn has_reference(paths: &ExercisePaths, exercise: &str) -> bool {
    paths.reference_dir(exercise).join(PREDICTION_FILE).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::capture::{DepthFrame, Frame};
    use crate::io::metric_sink::SinkError;
    use crate::io::persister::FsPersister;
    use crate::io::predictor::PredictionError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::fs;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Tick {
        Idle,
        Capture,
        Abort,
    }

    struct ScriptedSource {
        ticks: VecDeque<Tick>,
        current: Tick,
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
            self.current = self.ticks.pop_front().ok_or(FrameError::Closed)?;
            let depth = DepthFrame::new(2, 1, vec![300, 0], 0.001).unwrap();
            Ok(Some(Frame::depth_only(depth)))
        }

        fn capture_signal(&self) -> bool {
            self.current == Tick::Capture
        }

        fn abort_signal(&self) -> bool {
            self.current == Tick::Abort
        }
    }

    struct AlwaysContinue;

    impl OperatorPrompt for AlwaysContinue {
        fn confirm_continue(&mut self, _error: &dyn std::error::Error) -> bool {
            true
        }
    }

    struct FixedPredictor(Option<JointSet>);

    #[async_trait]
    impl Predictor for FixedPredictor {
        async fn predict_joints(
            &self,
            _frame: &DepthFrame,
            _centroid: &Centroid,
            _hand_side: HandSide,
        ) -> Result<JointSet, PredictionError> {
            self.0.clone().ok_or(PredictionError::Status(503))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<(String, String, i64)>>>);

    #[async_trait]
    impl MetricSink for RecordingSink {
        async fn submit(
            &self,
            subject_id: &str,
            exercise: &str,
            _date: DateTime<Utc>,
            metric: i64,
        ) -> Result<(), SinkError> {
            self.0.lock().unwrap().push((subject_id.to_string(), exercise.to_string(), metric));
            Ok(())
        }
    }

    fn recorder(
        root: &Path,
        ticks: &[Tick],
        prediction: Option<JointSet>,
        sink: RecordingSink,
    ) -> ExerciseRecorder<ScriptedSource, FsPersister, AlwaysContinue> {
        ExerciseRecorder::new(
            ScriptedSource { ticks: ticks.iter().copied().collect(), current: Tick::Idle },
            FsPersister::new(),
            AlwaysContinue,
            Box::new(FixedPredictor(prediction)),
            Some(Box::new(sink)),
            ExercisePaths::new(root),
            MetricCalculator::new(2),
            0.40,
        )
    }

    fn request(capture_type: CaptureType) -> ExerciseRequest {
        ExerciseRequest {
            subject_id: "17".to_string(),
            exercise: "wrist-flexion".to_string(),
            capture_type,
            hand_side: HandSide::Right,
        }
    }

    #[tokio::test]
    async fn test_reference_capture_stores_prediction() {
        let dir = tempdir().unwrap();
        let joints = JointSet::new(vec![[0.0, 0.0, 0.0], [1.0, 2.0, 0.0]]);
        let sink = RecordingSink::default();
        let mut rec = recorder(dir.path(), &[Tick::Idle, Tick::Capture, Tick::Abort], Some(joints), sink.clone());

        let summary = rec.run(&request(CaptureType::Reference)).await.unwrap();
        assert_eq!(summary.captures, 1);
        assert_eq!(summary.predictions, 1);
        assert_eq!(summary.metrics_submitted, 0);
        assert!(has_reference(rec.paths(), "wrist-flexion"));
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_follow_up_submits_ceiled_metric() {
        let dir = tempdir().unwrap();
        let paths = ExercisePaths::new(dir.path());
        let reference = paths.reference_dir("wrist-flexion");
        fs::create_dir_all(&reference).unwrap();
        fs::write(reference.join(PREDICTION_FILE), "0 0 0\n1 2 0\n").unwrap();

        // distances 5 and 13, mean 9
        let joints = JointSet::new(vec![[3.0, 4.0, 0.0], [6.0, 14.0, 0.0]]);
        let sink = RecordingSink::default();
        let mut rec = recorder(dir.path(), &[Tick::Capture, Tick::Abort], Some(joints), sink.clone());

        let summary = rec.run(&request(CaptureType::FollowUp)).await.unwrap();
        assert_eq!(summary.metrics_submitted, 1);
        assert_eq!(summary.last_metric, Some(9));
        assert_eq!(
            sink.0.lock().unwrap().as_slice(),
            &[("17".to_string(), "wrist-flexion".to_string(), 9)]
        );
    }

    #[tokio::test]
    async fn test_prediction_failure_keeps_capture() {
        let dir = tempdir().unwrap();
        let sink = RecordingSink::default();
        let mut rec = recorder(dir.path(), &[Tick::Capture, Tick::Abort], None, sink.clone());

        let summary = rec.run(&request(CaptureType::FollowUp)).await.unwrap();
        assert_eq!(summary.captures, 1);
        assert_eq!(summary.predictions, 0);
        assert!(sink.0.lock().unwrap().is_empty());
        assert!(dir.path().join("follow_up").join("wrist-flexion").is_dir());
    }

    #[tokio::test]
    async fn test_missing_reference_skips_metric() {
        let dir = tempdir().unwrap();
        let joints = JointSet::new(vec![[3.0, 4.0, 0.0], [6.0, 14.0, 0.0]]);
        let sink = RecordingSink::default();
        let mut rec = recorder(dir.path(), &[Tick::Capture, Tick::Abort], Some(joints), sink.clone());

        let summary = rec.run(&request(CaptureType::FollowUp)).await.unwrap();
        assert_eq!(summary.predictions, 1);
        assert_eq!(summary.metrics_submitted, 0);
        assert!(sink.0.lock().unwrap().is_empty());
    }
}
