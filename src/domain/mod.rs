//! Domain models - capture conditions, session state and joint data
//!
//! This module contains the canonical data types used throughout the system:
//! - `ExperimentPlan` - the ordered matrix of capture conditions for a subject
//! - `SessionState` - where a running sub-session currently is
//! - `Frame` / `Capture` - camera frames and the accepted captures built from them
//! - `JointSet` - index-aligned hand joint coordinates

pub mod capture;
pub mod joints;
pub mod plan;
pub mod session;
pub mod types;

// Re-export commonly used types at module level
pub use capture::{Capture, ColorFrame, DepthFrame, Frame, FrameError};
pub use joints::{reshape_to_joints, JointError, JointSet};
pub use plan::{ExperimentPlan, Iteration, PlanError, SetupEntry};
pub use session::SessionState;
pub use types::{CaptureType, Centroid, GraspSequence, HandSide, LightSetup, Point3};
