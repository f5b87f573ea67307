//! End-to-end experiment flow over replayed frames and the real file persister

use rehab_capture::domain::plan::{ExperimentPlan, Iteration};
use rehab_capture::domain::types::{CaptureType, GraspSequence, HandSide, LightSetup};
use rehab_capture::io::persister::{CENTROID_FILE, DEPTH_FILE, METADATA_FILE};
use rehab_capture::io::{FsPersister, KeySource, OperatorKey, OperatorPrompt, ReplayFrameSource};
use rehab_capture::infra::Config;
use rehab_capture::services::{ExitStatus, FrameLoopSession, SessionSequencer};
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

struct ScriptedKeys(VecDeque<Option<OperatorKey>>);

impl ScriptedKeys {
    fn captures(n: usize) -> Self {
        Self((0..n).flat_map(|_| [None, Some(OperatorKey::Capture)]).collect())
    }

    fn then_abort(mut self) -> Self {
        self.0.push_back(Some(OperatorKey::Abort));
        self
    }
}

impl KeySource for ScriptedKeys {
    fn poll_key(&mut self, _timeout: Duration) -> io::Result<Option<OperatorKey>> {
        Ok(self.0.pop_front().flatten())
    }
}

struct NeverContinue;

impl OperatorPrompt for NeverContinue {
    fn confirm_continue(&mut self, _error: &dyn std::error::Error) -> bool {
        false
    }
}

fn write_frames(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    // hand pixels at ~28 cm, background beyond the clipping distance
    fs::write(dir.join("000.txt"), "900 900 900\n900 280 280\n900 280 280\n").unwrap();
    fs::write(dir.join("001.txt"), "901 901 901\n901 280 280\n901 280 280\n").unwrap();
}

fn plan() -> ExperimentPlan {
    ExperimentPlan::grid(
        "s01",
        &[LightSetup::Side, LightSetup::CameraMounted],
        &[28],
        &[
            Iteration::new(CaptureType::Reference, 1, HandSide::Left),
            Iteration::new(CaptureType::FollowUp, 1, HandSide::Right),
        ],
    )
    .unwrap()
}

#[test]
fn test_full_experiment_writes_every_capture() {
    let dir = tempdir().unwrap();
    let config = Config::default().with_roots(dir.path());
    write_frames(config.replay_dir());

    // per pair: 1 reference + 4 grasps
    let keys = ScriptedKeys::captures(10);
    let source =
        ReplayFrameSource::open(config.replay_dir(), config.depth_scale(), keys, 1000).unwrap();
    let mut session = FrameLoopSession::new(
        source,
        FsPersister::new(),
        NeverContinue,
        config.path_resolver(),
        config.clipping_distance_m(),
    );

    let plan = plan();
    let status = SessionSequencer::new(&plan).run(&mut session).unwrap();
    assert_eq!(status, ExitStatus::Completed { subsessions: 4 });

    let reference = dir.path().join("experiments/s01/side/28/gold_standard/open");
    assert!(reference.join(DEPTH_FILE).is_file());
    assert!(reference.join(METADATA_FILE).is_file());

    let centroid = fs::read_to_string(reference.join(CENTROID_FILE)).unwrap();
    assert_eq!(centroid, "2.000000 2.000000 280.000000\n");

    for grasp in GraspSequence::default().labels() {
        let path = dir.path().join("experiments/s01/camera-mounted/28/follow_up/repetition_0").join(grasp);
        assert!(path.join(DEPTH_FILE).is_file(), "missing {}", path.display());
    }
}

#[test]
fn test_abort_stops_the_sweep() {
    let dir = tempdir().unwrap();
    let config = Config::default().with_roots(dir.path());
    write_frames(config.replay_dir());

    // reference done, two follow-up grasps, then Esc
    let keys = ScriptedKeys::captures(3).then_abort();
    let source =
        ReplayFrameSource::open(config.replay_dir(), config.depth_scale(), keys, 1000).unwrap();
    let mut session = FrameLoopSession::new(
        source,
        FsPersister::new(),
        NeverContinue,
        config.path_resolver(),
        config.clipping_distance_m(),
    );

    let plan = plan();
    let status = SessionSequencer::new(&plan).run(&mut session).unwrap();
    assert_eq!(
        status,
        ExitStatus::ForcedExit {
            completed: 1,
            light_setup: LightSetup::Side,
            distance_cm: 28,
            capture_type: CaptureType::FollowUp,
        }
    );
    assert!(!dir.path().join("experiments/s01/camera-mounted").exists());
    let follow_up = dir.path().join("experiments/s01/side/28/follow_up/repetition_0");
    assert!(follow_up.join("closed").is_dir());
    assert!(follow_up.join("half-open-1").is_dir());
    assert!(!follow_up.join("half-open-2").exists());
}
