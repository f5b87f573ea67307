//! Frame loop for one sub-session
//!
//! Each tick: wait for a frame, honour an abort first, compute the hand
//! centroid, and on a capture trigger hand the frame to the gate. Failures
//! from the frame source or the persister go to the operator prompt; a
//! declined prompt ends the whole run as a forced exit.

use crate::domain::capture::{Capture, FrameError};
use crate::domain::session::SessionState;
use crate::io::frame_source::FrameSource;
use crate::io::persister::Persister;
use crate::io::terminal::OperatorPrompt;
use crate::services::capture_gate::{Abort, CaptureGate, GateError, Persistence};
use crate::services::centroid::{calculate_centroid, is_distance_valid};
use crate::services::path_resolver::CapturePathResolver;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error("frame source closed before the sub-session finished")]
    SourceClosed,
}

/// Runs one sub-session until `state.should_stop` is set
pub trait CaptureSession {
    fn run(&mut self, state: &mut SessionState) -> Result<(), SessionError>;
}

pub struct FrameLoopSession<S, P, O> {
    source: S,
    persister: P,
    prompt: O,
    resolver: CapturePathResolver,
    clipping_distance_m: f64,
}

impl<S, P, O> FrameLoopSession<S, P, O>
where
    S: FrameSource,
    P: Persister,
    O: OperatorPrompt,
{
    pub fn new(
        source: S,
        persister: P,
        prompt: O,
        resolver: CapturePathResolver,
        clipping_distance_m: f64,
    ) -> Self {
        Self { source, persister, prompt, resolver, clipping_distance_m }
    }

    pub fn resolver(&self) -> &CapturePathResolver {
        &self.resolver
    }

    pub fn persister(&self) -> &P {
        &self.persister
    }
}

impl<S, P, O> CaptureSession for FrameLoopSession<S, P, O>
where
    S: FrameSource,
    P: Persister,
    O: OperatorPrompt,
{
    fn run(&mut self, state: &mut SessionState) -> Result<(), SessionError> {
        let Self { source, persister, prompt, resolver, clipping_distance_m } = self;
        let mut gate = CaptureGate::new(resolver);

        info!(
            subject = %state.subject_id,
            light_setup = %state.light_setup,
            distance_cm = %state.distance_cm,
            capture_type = %state.capture_type,
            repetitions = %state.target_repetitions,
            hand_side = %state.hand_side,
            "subsession_started"
        );
        info!(progress = %state.progress_line(resolver.grasps()), "awaiting_capture");

        while !state.should_stop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    if source.abort_signal() {
                        gate.on_abort(state)?;
                    }
                    continue;
                }
                Err(FrameError::Closed) => return Err(SessionError::SourceClosed),
                Err(e) => {
                    error!(error = %e, "frame_processing_failed");
                    if !prompt.confirm_continue(&e) {
                        gate.on_abort(state)?;
                    }
                    continue;
                }
            };

            if source.abort_signal() {
                info!("abort_requested");
                gate.on_abort(state)?;
                break;
            }

            if !source.capture_signal() {
                continue;
            }

            let centroid =
                calculate_centroid(&frame.depth, *clipping_distance_m).unwrap_or_default();
            if !is_distance_valid(&centroid, state.distance_cm) {
                warn!(
                    expected_cm = %state.distance_cm,
                    measured_cm = %centroid.distance_cm(),
                    "capture_distance_mismatch"
                );
            }

            let outcome = gate.on_capture(state, |path| {
                let capture = Capture::new(frame, centroid, path.to_path_buf());
                persist_capture(persister, prompt, path, &capture)
            })?;
            if !outcome.is_terminal() {
                info!(progress = %state.progress_line(resolver.grasps()), "awaiting_capture");
            }
        }

        info!(
            repetitions = %state.repetition_count,
            forced_exit = %state.forced_exit,
            "subsession_finished"
        );
        Ok(())
    }
}

pub(crate) fn persist_capture<P: Persister, O: OperatorPrompt>(
    persister: &mut P,
    prompt: &mut O,
    path: &Path,
    capture: &Capture,
) -> Result<Persistence, Abort> {
    let result = CapturePathResolver::prepare(path).and_then(|_| persister.save(path, capture));
    match result {
        Ok(()) => Ok(Persistence::Saved),
        Err(e) => {
            error!(path = %path.display(), error = %e, "capture_save_failed");
            if prompt.confirm_continue(&e) {
                Ok(Persistence::Retry)
            } else {
                Err(Abort)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::capture::{DepthFrame, Frame};
    use crate::domain::joints::JointSet;
    use crate::domain::plan::{Iteration, SetupEntry};
    use crate::domain::types::{CaptureType, GraspSequence, HandSide, LightSetup};
    use std::collections::VecDeque;
    use std::io;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Tick {
        Idle,
        Capture,
        Abort,
        Empty,
        Fail,
    }

    struct ScriptedSource {
        ticks: VecDeque<Tick>,
        current: Tick,
    }

    impl ScriptedSource {
        fn new(ticks: &[Tick]) -> Self {
            Self { ticks: ticks.iter().copied().collect(), current: Tick::Idle }
        }
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
            self.current = self.ticks.pop_front().ok_or(FrameError::Closed)?;
            match self.current {
                Tick::Empty => Ok(None),
                Tick::Fail => Err(FrameError::Empty),
                _ => {
                    let depth = DepthFrame::new(2, 1, vec![280, 0], 0.001).unwrap();
                    Ok(Some(Frame::depth_only(depth)))
                }
            }
        }

        fn capture_signal(&self) -> bool {
            self.current == Tick::Capture
        }

        fn abort_signal(&self) -> bool {
            self.current == Tick::Abort
        }
    }

    /// Records saves; fails the first `failures` calls
    #[derive(Default)]
    struct MemoryPersister {
        saved: Vec<PathBuf>,
        failures: usize,
    }

    impl Persister for MemoryPersister {
        fn save(&mut self, path: &Path, _capture: &Capture) -> io::Result<()> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(io::Error::other("disk full"));
            }
            self.saved.push(path.to_path_buf());
            Ok(())
        }

        fn save_joints(&mut self, _path: &Path, _joints: &JointSet) -> io::Result<()> {
            Ok(())
        }
    }

    struct FixedPrompt {
        answer: bool,
        asked: usize,
    }

    impl OperatorPrompt for FixedPrompt {
        fn confirm_continue(&mut self, _error: &dyn std::error::Error) -> bool {
            self.asked += 1;
            self.answer
        }
    }

    fn state(capture_type: CaptureType, repetitions: u32) -> SessionState {
        let entry = SetupEntry { light_setup: LightSetup::Side, distance_cm: 28, iterations: vec![] };
        SessionState::new("carla", &entry, &Iteration::new(capture_type, repetitions, HandSide::Left))
    }

    fn session(
        root: &Path,
        ticks: &[Tick],
        persister: MemoryPersister,
        answer: bool,
    ) -> FrameLoopSession<ScriptedSource, MemoryPersister, FixedPrompt> {
        FrameLoopSession::new(
            ScriptedSource::new(ticks),
            persister,
            FixedPrompt { answer, asked: 0 },
            CapturePathResolver::new(root, GraspSequence::default()),
            0.40,
        )
    }

    #[test]
    fn test_idle_ticks_are_ignored() {
        let dir = tempdir().unwrap();
        let ticks = [Tick::Idle, Tick::Empty, Tick::Idle, Tick::Capture];
        let mut s = session(dir.path(), &ticks, MemoryPersister::default(), true);
        let mut st = state(CaptureType::Reference, 1);

        s.run(&mut st).unwrap();
        assert!(st.should_stop);
        assert!(!st.forced_exit);
        assert_eq!(s.persister().saved.len(), 1);
        assert!(s.persister().saved[0].is_dir());
    }

    #[test]
    fn test_abort_stops_loop() {
        let dir = tempdir().unwrap();
        let ticks = [Tick::Capture, Tick::Abort, Tick::Capture];
        let mut s = session(dir.path(), &ticks, MemoryPersister::default(), true);
        let mut st = state(CaptureType::FollowUp, 1);

        s.run(&mut st).unwrap();
        assert!(st.forced_exit);
        assert_eq!(st.grasp_index, 1);
        assert_eq!(st.repetition_count, 0);
        assert_eq!(s.persister().saved.len(), 1);
    }

    #[test]
    fn test_failed_save_is_retaken_when_operator_continues() {
        let dir = tempdir().unwrap();
        let ticks = [Tick::Capture, Tick::Capture];
        let persister = MemoryPersister { failures: 1, ..Default::default() };
        let mut s = session(dir.path(), &ticks, persister, true);
        let mut st = state(CaptureType::Reference, 1);

        s.run(&mut st).unwrap();
        assert!(!st.forced_exit);
        assert_eq!(st.repetition_count, 1);
        assert_eq!(s.persister().saved.len(), 1);
        assert_eq!(s.prompt.asked, 1);
    }

    #[test]
    fn test_failed_save_aborts_when_operator_declines() {
        let dir = tempdir().unwrap();
        let ticks = [Tick::Capture, Tick::Capture];
        let persister = MemoryPersister { failures: 1, ..Default::default() };
        let mut s = session(dir.path(), &ticks, persister, false);
        let mut st = state(CaptureType::Reference, 1);

        s.run(&mut st).unwrap();
        assert!(st.forced_exit);
        assert_eq!(st.repetition_count, 0);
        assert!(s.persister().saved.is_empty());
    }

    #[test]
    fn test_frame_error_goes_to_prompt() {
        let dir = tempdir().unwrap();
        let ticks = [Tick::Fail, Tick::Capture];
        let mut s = session(dir.path(), &ticks, MemoryPersister::default(), true);
        let mut st = state(CaptureType::Reference, 1);

        s.run(&mut st).unwrap();
        assert_eq!(s.prompt.asked, 1);
        assert_eq!(st.repetition_count, 1);

        let ticks = [Tick::Fail, Tick::Capture];
        let mut s = session(dir.path(), &ticks, MemoryPersister::default(), false);
        let mut st = state(CaptureType::Reference, 1);
        s.run(&mut st).unwrap();
        assert!(st.forced_exit);
    }

    #[test]
    fn test_closed_source_is_an_error() {
        let dir = tempdir().unwrap();
        let mut s = session(dir.path(), &[Tick::Idle], MemoryPersister::default(), true);
        let mut st = state(CaptureType::Reference, 1);

        assert!(matches!(s.run(&mut st), Err(SessionError::SourceClosed)));
    }
}
