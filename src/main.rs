//! Rehab capture - guided depth-capture experiment runner
//!
//! Walks a subject through every (light setup, distance, capture type)
//! condition of the configured plan. Enter captures the current frame, Esc
//! aborts the whole experiment.
//!
//! Module structure:
//! - `domain/` - Core types (plan, session state, frames, joints)
//! - `io/` - External interfaces (frame source, terminal, persistence, HTTP)
//! - `services/` - Capture gate, session loop, sequencer, metrics
//! - `infra/` - Config and logging

use anyhow::Context;
use clap::Parser;
use rehab_capture::infra::{logging, Config};
use rehab_capture::io::{FsPersister, ReplayFrameSource, TerminalKeys, TerminalPrompt};
use rehab_capture::services::{ExitStatus, FrameLoopSession, SessionSequencer};
use std::path::PathBuf;
use tracing::{info, warn};

/// Guided capture experiment for one subject
#[derive(Parser, Debug)]
#[command(name = "rehab-capture", version, about)]
struct Args {
    /// Subject identifier, used as the top-level output directory
    subject_id: String,

    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/default.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Directory of recorded depth frames to replay instead of the configured one
    #[arg(long)]
    replay_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let args = Args::parse();

    info!(git_hash = %env!("GIT_HASH"), "rehab_capture_starting");

    let config_path = Config::resolve_config_path(args.config.as_deref());
    let config = Config::load_from_path(&config_path);
    info!(
        config_file = %config.config_file(),
        output_root = %config.output_root().display(),
        width = %config.camera_width(),
        height = %config.camera_height(),
        frame_rate = %config.frame_rate(),
        grasps = ?config.grasps().labels(),
        "config_loaded"
    );

    let plan = config.experiment_plan(&args.subject_id).context("invalid experiment plan")?;
    let replay_dir = args.replay_dir.unwrap_or_else(|| config.replay_dir().to_path_buf());

    let keys = TerminalKeys::new().context("failed to enable terminal input")?;
    let source = ReplayFrameSource::open(&replay_dir, config.depth_scale(), keys, config.frame_rate())
        .with_context(|| format!("failed to open replay frames in {}", replay_dir.display()))?;

    let mut session = FrameLoopSession::new(
        source,
        FsPersister::new(),
        TerminalPrompt,
        config.path_resolver(),
        config.clipping_distance_m(),
    );

    let status = SessionSequencer::new(&plan).run(&mut session)?;
    drop(session);

    match status {
        ExitStatus::Completed { subsessions } => {
            info!(subject = %plan.subject_id(), subsessions = %subsessions, "experiment_finished");
        }
        ExitStatus::ForcedExit { completed, light_setup, distance_cm, capture_type } => {
            warn!(
                subject = %plan.subject_id(),
                completed = %completed,
                light_setup = %light_setup,
                distance_cm = %distance_cm,
                capture_type = %capture_type,
                "experiment_terminated_early"
            );
            std::process::exit(2);
        }
    }
    Ok(())
}
