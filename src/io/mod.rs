//! IO modules - external system interfaces
//!
//! - `frame_source` - Camera boundary and recorded-frame replay
//! - `terminal` - Operator keys and the continue prompt
//! - `persister` - Capture files on disk
//! - `predictor` - HTTP joint predictor
//! - `metric_sink` - Follow-up metric submission

pub mod frame_source;
pub mod metric_sink;
pub mod persister;
pub mod predictor;
pub mod terminal;

pub use frame_source::{FrameSource, ReplayFrameSource};
pub use metric_sink::{HttpMetricSink, MetricSink, SinkError};
pub use persister::{FsPersister, Persister};
pub use predictor::{HttpPredictor, PredictionError, Predictor};
pub use terminal::{KeySource, OperatorKey, OperatorPrompt, TerminalKeys, TerminalPrompt};
