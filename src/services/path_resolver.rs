//! Storage paths for captures
//!
//! Experiment captures:
//! `<root>/<subject>/<light_setup>/<distance_cm>/<capture_type>[/repetition_<n>]/<grasp>`
//! The repetition segment only exists for follow-up captures. Reference
//! captures always use the fully open grasp label.
//!
//! Exercise recordings (real-time mode):
//! `<root>/gold_standard/<exercise>` and `<root>/follow_up/<exercise>/<stamp>`

use crate::domain::session::SessionState;
use crate::domain::types::{CaptureType, GraspSequence};
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File holding predicted joints inside a capture directory
pub const PREDICTION_FILE: &str = "prediction.txt";

/// Derives capture directories from session state
#[derive(Debug, Clone)]
pub struct CapturePathResolver {
    root: PathBuf,
    grasps: GraspSequence,
}

impl CapturePathResolver {
    pub fn new(root: impl Into<PathBuf>, grasps: GraspSequence) -> Self {
        Self { root: root.into(), grasps }
    }

    pub fn grasps(&self) -> &GraspSequence {
        &self.grasps
    }

    /// Pure path computation, no filesystem access
    pub fn resolve(&self, state: &SessionState) -> PathBuf {
        let mut path = self.root.join(&state.subject_id);
        path.push(state.light_setup.as_str());
        path.push(state.distance_cm.to_string());
        path.push(state.capture_type.as_str());
        if state.capture_type.is_follow_up() {
            path.push(format!("repetition_{}", state.repetition_count));
        }
        path.push(state.grasp_label(&self.grasps));
        path
    }

    /// Resolve and create the directory
    pub fn resolve_and_create(&self, state: &SessionState) -> io::Result<PathBuf> {
        let path = self.resolve(state);
        Self::prepare(&path)?;
        Ok(path)
    }

    /// Create `path` and its parents; no-op if it already exists
    pub fn prepare(path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)?;
        debug!(path = %path.display(), "capture_dir_ready");
        Ok(())
    }
}

/// Directory layout for single-exercise recordings
#[derive(Debug, Clone)]
pub struct ExercisePaths {
    root: PathBuf,
}

impl ExercisePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn reference_dir(&self, exercise: &str) -> PathBuf {
        self.root.join(CaptureType::Reference.as_str()).join(exercise)
    }

    pub fn follow_up_dir(&self, exercise: &str, stamp: &str) -> PathBuf {
        self.root.join(CaptureType::FollowUp.as_str()).join(exercise).join(stamp)
    }

    /// Directory for a capture taken at `at`
    pub fn capture_dir(&self, capture_type: CaptureType, exercise: &str, at: DateTime<Utc>) -> PathBuf {
        match capture_type {
            CaptureType::Reference => self.reference_dir(exercise),
            CaptureType::FollowUp => self.follow_up_dir(exercise, &follow_up_stamp(at)),
        }
    }
}

/// Timestamp segment for follow-up directories, e.g. `2022-03-21T14.05.09.250`
pub fn follow_up_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H.%M.%S%.3f").to_string()
}
