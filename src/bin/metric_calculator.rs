//! Metric Calculator - MPJPE between two stored joint predictions
//!
//! Usage:
//!   metric-calculator files <reference> <comparison>
//!   metric-calculator exercise wrist-flexion 2022-03-21T14.05.09.250
//!
//! File arguments may be `prediction.txt` files or capture directories.

use clap::{Parser, Subcommand};
use rehab_capture::infra::{logging, Config};
use rehab_capture::services::{ceil_metric, MetricCalculator};
use std::path::PathBuf;
use tracing::info;

/// Metric Calculator - mean per-joint position error
#[derive(Parser, Debug)]
#[command(name = "metric-calculator", version, about, long_about = None)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/default.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Number of joints per prediction; overrides [metric] joint_count
    #[arg(short, long, global = true)]
    joints: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare two prediction files or capture directories
    Files { reference: PathBuf, comparison: PathBuf },
    /// Compare a follow-up against its exercise's gold standard
    Exercise {
        exercise: String,
        /// Follow-up directory name, e.g. 2022-03-21T14.05.09.250
        stamp: String,
    },
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let args = Args::parse();

    let config = Config::load_from_path(Config::resolve_config_path(args.config.as_deref()));
    let calculator = match args.joints {
        Some(joints) => MetricCalculator::new(joints),
        None => config.metric_calculator(),
    };

    let mpjpe = match &args.command {
        Command::Files { reference, comparison } => calculator.compare(reference, comparison)?,
        Command::Exercise { exercise, stamp } => {
            calculator.compare_exercise(&config.exercise_paths(), exercise, stamp)?
        }
    };

    info!(mpjpe = %mpjpe, metric = %ceil_metric(mpjpe), joints = %calculator.joint_count(), "mpjpe_result");
    println!("{:.6}", mpjpe);
    Ok(())
}
