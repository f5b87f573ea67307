//! Capture gate - decides what a capture or abort trigger does to a sub-session
//!
//! State machine:
//! - `Awaiting` --capture--> `Accepted` --saved--> `Awaiting` | `SubsessionDone`
//! - `Accepted` --retry--> `Awaiting` (save failed, operator continued; counters untouched)
//! - `Accepted` --abort--> `ForceExit`
//! - any non-terminal state --abort--> `ForceExit`
//!
//! Follow-up repetitions count full laps of the grasp sequence, not triggers.

use crate::domain::session::SessionState;
use crate::services::path_resolver::CapturePathResolver;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Awaiting,
    Accepted,
    SubsessionDone,
    ForceExit,
}

impl GateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateState::Awaiting => "awaiting",
            GateState::Accepted => "accepted",
            GateState::SubsessionDone => "subsession_done",
            GateState::ForceExit => "force_exit",
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, GateState::SubsessionDone | GateState::ForceExit)
    }
}

/// Result of a successful persistence step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Capture written; counters advance
    Saved,
    /// Write failed and the operator chose to continue; the same slot is captured again
    Retry,
}

/// Operator declined to continue; same effect as the termination trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abort;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("trigger sent to a terminal gate ({})", .0.as_str())]
    Terminal(GateState),
}

/// One gate per sub-session
pub struct CaptureGate<'a> {
    resolver: &'a CapturePathResolver,
    state: GateState,
}

impl<'a> CaptureGate<'a> {
    pub fn new(resolver: &'a CapturePathResolver) -> Self {
        Self { resolver, state: GateState::Awaiting }
    }

    #[inline]
    pub fn state(&self) -> GateState {
        self.state
    }

    /// Termination trigger
    pub fn on_abort(&mut self, session: &mut SessionState) -> Result<GateState, GateError> {
        self.ensure_open()?;
        Ok(self.force_exit(session))
    }

    /// Capture trigger. `persist` receives the resolved storage path.
    pub fn on_capture<F>(&mut self, session: &mut SessionState, persist: F) -> Result<GateState, GateError>
    where
        F: FnOnce(&Path) -> Result<Persistence, Abort>,
    {
        self.ensure_open()?;
        self.state = GateState::Accepted;

        let path = self.resolver.resolve(session);
        match persist(&path) {
            Ok(Persistence::Saved) => {
                info!(
                    path = %path.display(),
                    repetition = %session.repetition_count,
                    grasp = %session.grasp_label(self.resolver.grasps()),
                    "capture_accepted"
                );
            }
            Ok(Persistence::Retry) => {
                warn!(path = %path.display(), "capture_retry");
                self.state = GateState::Awaiting;
                return Ok(self.state);
            }
            Err(Abort) => return Ok(self.force_exit(session)),
        }

        self.advance(session);
        Ok(self.state)
    }

    fn advance(&mut self, session: &mut SessionState) {
        if session.capture_type.is_follow_up() {
            session.grasp_index += 1;
            if session.grasp_index >= self.resolver.grasps().len() {
                session.grasp_index = 0;
                session.repetition_count += 1;
            }
        } else {
            session.repetition_count += 1;
        }

        if session.repetition_count >= session.target_repetitions {
            session.should_stop = true;
            self.state = GateState::SubsessionDone;
            info!(
                capture_type = %session.capture_type,
                repetitions = %session.repetition_count,
                "subsession_done"
            );
        } else {
            self.state = GateState::Awaiting;
        }
    }

    fn force_exit(&mut self, session: &mut SessionState) -> GateState {
        session.forced_exit = true;
        session.should_stop = true;
        self.state = GateState::ForceExit;
        warn!(
            repetition = %session.repetition_count,
            grasp_index = %session.grasp_index,
            "forced_exit"
        );
        self.state
    }

    fn ensure_open(&self) -> Result<(), GateError> {
        if self.state.is_terminal() {
            return Err(GateError::Terminal(self.state));
        }
        Ok(())
    }
}
