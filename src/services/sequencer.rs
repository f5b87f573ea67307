//! Walks an experiment plan one sub-session at a time

use crate::domain::plan::ExperimentPlan;
use crate::domain::session::SessionState;
use crate::domain::types::{CaptureType, LightSetup};
use crate::services::capture_session::{CaptureSession, SessionError};
use std::time::Instant;
use tracing::{info, warn};

/// How a sweep ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    Completed {
        subsessions: usize,
    },
    /// Operator aborted; `completed` counts the sub-sessions that finished
    /// before the aborted one
    ForcedExit {
        completed: usize,
        light_setup: LightSetup,
        distance_cm: u32,
        capture_type: CaptureType,
    },
}

impl ExitStatus {
    pub fn is_forced(&self) -> bool {
        matches!(self, ExitStatus::ForcedExit { .. })
    }
}

pub struct SessionSequencer<'a> {
    plan: &'a ExperimentPlan,
}

impl<'a> SessionSequencer<'a> {
    pub fn new(plan: &'a ExperimentPlan) -> Self {
        Self { plan }
    }

    /// Run every (setup, iteration) pair in plan order. A forced exit stops
    /// the sweep; the remaining pairs never run.
    pub fn run<R>(&self, runner: &mut R) -> Result<ExitStatus, SessionError>
    where
        R: CaptureSession + ?Sized,
    {
        let start = Instant::now();
        let total = self.plan.subsession_count();
        let mut completed = 0;

        info!(
            subject = %self.plan.subject_id(),
            subsessions = %total,
            "experiment_started"
        );

        for (entry, iteration) in self.plan.subsessions() {
            let mut state = SessionState::new(self.plan.subject_id(), entry, iteration);

            while !state.should_stop {
                runner.run(&mut state)?;
            }

            if state.forced_exit {
                warn!(
                    completed = %completed,
                    total = %total,
                    light_setup = %state.light_setup,
                    distance_cm = %state.distance_cm,
                    capture_type = %state.capture_type,
                    "experiment_aborted"
                );
                return Ok(ExitStatus::ForcedExit {
                    completed,
                    light_setup: state.light_setup,
                    distance_cm: state.distance_cm,
                    capture_type: state.capture_type,
                });
            }
            completed += 1;
        }

        info!(
            subsessions = %completed,
            elapsed_s = %start.elapsed().as_secs(),
            "experiment_completed"
        );
        Ok(ExitStatus::Completed { subsessions: completed })
    }
}
