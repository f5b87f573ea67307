//! Services - capture flow and joint metrics
//!
//! - `path_resolver` - Capture directory layout
//! - `capture_gate` - Per-trigger state machine owning the counters
//! - `capture_session` - Frame loop for one sub-session
//! - `sequencer` - Walks the experiment plan
//! - `centroid` - Hand centroid and distance check
//! - `metric` - MPJPE engine and file-based calculator
//! - `recorder` - Real-time single-exercise recording

pub mod capture_gate;
pub mod capture_session;
pub mod centroid;
pub mod metric;
pub mod path_resolver;
pub mod recorder;
pub mod sequencer;

pub use capture_gate::{CaptureGate, GateError, GateState};
pub use capture_session::{CaptureSession, FrameLoopSession, SessionError};
pub use metric::{ceil_metric, euclidean_distance, mean_per_joint_position_error, MetricCalculator};
pub use path_resolver::{CapturePathResolver, ExercisePaths};
pub use recorder::{ExerciseRecorder, ExerciseRequest, RecordingSummary};
pub use sequencer::{ExitStatus, SessionSequencer};
