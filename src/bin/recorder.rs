//! Exercise Recorder - real-time capture for one rehabilitation exercise
//!
//! Records a gold standard or a follow-up for an exercise. Each capture is
//! sent to the joint predictor; follow-ups are scored against the gold
//! standard and the metric is submitted to the patient web service.
//!
//! Usage:
//!   exercise-recorder wrist-flexion --hand left --gold-standard
//!   exercise-recorder wrist-flexion --hand left --email a@b.c --password secret
//!
//! Files are written to:
//!   <results_root>/gold_standard/<exercise>/
//!   <results_root>/follow_up/<exercise>/<YYYY-MM-DDTHH.MM.SS.mmm>/

use anyhow::Context;
use clap::Parser;
use rehab_capture::domain::types::{CaptureType, HandSide};
use rehab_capture::infra::{logging, Config};
use rehab_capture::io::{
    FsPersister, HttpMetricSink, HttpPredictor, MetricSink, ReplayFrameSource, TerminalKeys,
    TerminalPrompt,
};
use rehab_capture::services::recorder::has_reference;
use rehab_capture::services::{ExerciseRecorder, ExerciseRequest};
use std::path::PathBuf;
use tracing::{info, warn};

/// Exercise Recorder - capture, predict and score one exercise
#[derive(Parser, Debug)]
#[command(name = "exercise-recorder", version, about, long_about = None)]
struct Args {
    /// Exercise name, used as a directory segment
    exercise: String,

    /// Hand being captured: "left" or "right"
    #[arg(long, default_value = "right")]
    hand: HandSide,

    /// Record the gold standard instead of a follow-up
    #[arg(long)]
    gold_standard: bool,

    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/default.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Metric sink account; overrides [metric_sink] email
    #[arg(long)]
    email: Option<String>,

    /// Metric sink password; overrides [metric_sink] password
    #[arg(long)]
    password: Option<String>,

    /// Subject id to submit under; defaults to the signed-in user id
    #[arg(long)]
    subject_id: Option<String>,

    /// Skip metric submission entirely
    #[arg(long)]
    no_submit: bool,

    /// Directory of recorded depth frames to replay instead of the configured one
    #[arg(long)]
    replay_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let args = Args::parse();

    info!(git_hash = %env!("GIT_HASH"), exercise = %args.exercise, "exercise_recorder_starting");

    let config = Config::load_from_path(Config::resolve_config_path(args.config.as_deref()));
    let capture_type = if args.gold_standard { CaptureType::Reference } else { CaptureType::FollowUp };
    let paths = config.exercise_paths();

    if capture_type.is_follow_up() && !has_reference(&paths, &args.exercise) {
        warn!(
            exercise = %args.exercise,
            reference = %paths.reference_dir(&args.exercise).display(),
            "gold_standard_missing"
        );
    }

    let predictor = HttpPredictor::new(config.predictor_url(), config.joint_count(), config.predictor_timeout())
        .context("failed to build predictor client")?;
    info!(url = %predictor.url(), "predictor_configured");

    let sink = if capture_type.is_follow_up() && !args.no_submit {
        let email = args.email.as_deref().or(config.metric_sink_email());
        let password = args.password.as_deref().or(config.metric_sink_password());
        match (email, password) {
            (Some(email), Some(password)) => Some(
                HttpMetricSink::sign_in(config.metric_sink_url(), email, password, config.metric_sink_timeout())
                    .await
                    .context("metric sink sign-in failed")?,
            ),
            _ => {
                warn!("metric_sink_credentials_missing");
                None
            }
        }
    } else {
        None
    };

    let subject_id = args
        .subject_id
        .clone()
        .or_else(|| sink.as_ref().map(|s| s.user_id().to_string()))
        .unwrap_or_else(|| "anonymous".to_string());
    let sink = sink.map(|s| Box::new(s) as Box<dyn MetricSink>);

    let replay_dir = args.replay_dir.unwrap_or_else(|| config.replay_dir().to_path_buf());
    let keys = TerminalKeys::new().context("failed to enable terminal input")?;
    let source = ReplayFrameSource::open(&replay_dir, config.depth_scale(), keys, config.frame_rate())
        .with_context(|| format!("failed to open replay frames in {}", replay_dir.display()))?;

    let mut recorder = ExerciseRecorder::new(
        source,
        FsPersister::new(),
        TerminalPrompt,
        Box::new(predictor),
        sink,
        paths,
        config.metric_calculator(),
        config.clipping_distance_m(),
    );

    let request = ExerciseRequest {
        subject_id,
        exercise: args.exercise,
        capture_type,
        hand_side: args.hand,
    };
    let summary = recorder.run(&request).await?;
    drop(recorder);

    info!(
        exercise = %request.exercise,
        captures = %summary.captures,
        predictions = %summary.predictions,
        metrics = %summary.metrics_submitted,
        last_metric = ?summary.last_metric,
        "exercise_recorder_finished"
    );
    Ok(())
}
