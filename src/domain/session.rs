//! Mutable position of a running sub-session

use crate::domain::plan::{Iteration, SetupEntry};
use crate::domain::types::{CaptureType, GraspSequence, HandSide, LightSetup};

/// Where a sub-session currently is
///
/// Configured by the sequencer, counters advanced only by the capture gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub subject_id: String,
    pub light_setup: LightSetup,
    pub distance_cm: u32,
    pub capture_type: CaptureType,
    pub target_repetitions: u32,
    pub hand_side: HandSide,
    /// Completed repetitions in this sub-session
    pub repetition_count: u32,
    /// Cursor into the grasp sequence; stays 0 for reference captures
    pub grasp_index: usize,
    pub should_stop: bool,
    pub forced_exit: bool,
}

impl SessionState {
    /// Fresh state for one (setup, iteration) pair
    pub fn new(subject_id: &str, entry: &SetupEntry, iteration: &Iteration) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            light_setup: entry.light_setup,
            distance_cm: entry.distance_cm,
            capture_type: iteration.capture_type,
            target_repetitions: iteration.repetitions,
            hand_side: iteration.hand_side,
            repetition_count: 0,
            grasp_index: 0,
            should_stop: false,
            forced_exit: false,
        }
    }

    /// Grasp the patient should be holding for the next capture
    pub fn grasp_label<'a>(&self, grasps: &'a GraspSequence) -> &'a str {
        if self.capture_type.is_follow_up() {
            debug_assert!(
                self.grasp_index < grasps.len(),
                "grasp index {} out of range for {} grasps",
                self.grasp_index,
                grasps.len()
            );
            grasps.label(self.grasp_index).unwrap_or_else(|| grasps.fully_open())
        } else {
            grasps.fully_open()
        }
    }

    /// Status line shown to the operator, e.g. `Rep. 3/10; right closed`
    pub fn progress_line(&self, grasps: &GraspSequence) -> String {
        format!(
            "Rep. {}/{}; {} {}",
            self.repetition_count,
            self.target_repetitions,
            self.hand_side,
            self.grasp_label(grasps)
        )
    }
}
