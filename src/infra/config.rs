//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/default.toml

use crate::domain::plan::{ExperimentPlan, Iteration, PlanError};
use crate::domain::types::{CaptureType, GraspSequence, HandSide, LightSetup};
use crate::services::metric::MetricCalculator;
use crate::services::path_resolver::{CapturePathResolver, ExercisePaths};
use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_output_root")]
    pub output_root: String,
    #[serde(default = "default_grasps")]
    pub grasps: Vec<String>,
    #[serde(default = "default_fully_open")]
    pub fully_open: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            grasps: default_grasps(),
            fully_open: default_fully_open(),
        }
    }
}

fn default_output_root() -> String {
    "./experiments".to_string()
}

fn default_grasps() -> Vec<String> {
    GraspSequence::default().labels().to_vec()
}

fn default_fully_open() -> String {
    GraspSequence::default().fully_open().to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_height")]
    pub height: usize,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    /// Metres per raw depth unit
    #[serde(default = "default_depth_scale")]
    pub depth_scale: f64,
    /// Pixels farther than this are background
    #[serde(default = "default_clipping_distance")]
    pub clipping_distance_m: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            frame_rate: default_frame_rate(),
            depth_scale: default_depth_scale(),
            clipping_distance_m: default_clipping_distance(),
        }
    }
}

fn default_width() -> usize {
    640
}

fn default_height() -> usize {
    480
}

fn default_frame_rate() -> u32 {
    60
}

fn default_depth_scale() -> f64 {
    0.001
}

fn default_clipping_distance() -> f64 {
    0.40
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayConfig {
    /// Directory of recorded depth matrices, one `.txt` per frame
    #[serde(default = "default_replay_dir")]
    pub dir: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { dir: default_replay_dir() }
    }
}

fn default_replay_dir() -> String {
    "./recordings".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanConfig {
    #[serde(default = "default_light_setups")]
    pub light_setups: Vec<LightSetup>,
    #[serde(default = "default_distances")]
    pub distances_cm: Vec<u32>,
    #[serde(default = "default_iterations")]
    pub iterations: Vec<Iteration>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            light_setups: default_light_setups(),
            distances_cm: default_distances(),
            iterations: default_iterations(),
        }
    }
}

fn default_light_setups() -> Vec<LightSetup> {
    vec![LightSetup::HandMounted, LightSetup::Side, LightSetup::CameraMounted]
}

fn default_distances() -> Vec<u32> {
    vec![28, 35, 37]
}

fn default_iterations() -> Vec<Iteration> {
    vec![
        Iteration::new(CaptureType::Reference, 1, HandSide::Left),
        Iteration::new(CaptureType::FollowUp, 10, HandSide::Right),
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictorConfig {
    #[serde(default = "default_predictor_url")]
    pub url: String,
    #[serde(default = "default_predictor_timeout")]
    pub timeout_ms: u64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self { url: default_predictor_url(), timeout_ms: default_predictor_timeout() }
    }
}

fn default_predictor_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_predictor_timeout() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricSinkConfig {
    #[serde(default = "default_sink_url")]
    pub url: String,
    #[serde(default = "default_sink_timeout")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for MetricSinkConfig {
    fn default() -> Self {
        Self { url: default_sink_url(), timeout_ms: default_sink_timeout(), email: None, password: None }
    }
}

fn default_sink_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_sink_timeout() -> u64 {
    5_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricConfig {
    #[serde(default = "default_joint_count")]
    pub joint_count: usize,
    /// Root of the gold_standard/ and follow_up/ trees
    #[serde(default = "default_results_root")]
    pub results_root: String,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self { joint_count: default_joint_count(), results_root: default_results_root() }
    }
}

fn default_joint_count() -> usize {
    crate::domain::joints::DEFAULT_JOINT_COUNT
}

fn default_results_root() -> String {
    "./results".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub plan: PlanConfig,
    #[serde(default)]
    pub predictor: PredictorConfig,
    #[serde(default)]
    pub metric_sink: MetricSinkConfig,
    #[serde(default)]
    pub metric: MetricConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    config_file: String,
    output_root: PathBuf,
    grasps: GraspSequence,
    camera_width: usize,
    camera_height: usize,
    frame_rate: u32,
    depth_scale: f64,
    clipping_distance_m: f64,
    replay_dir: PathBuf,
    light_setups: Vec<LightSetup>,
    distances_cm: Vec<u32>,
    iterations: Vec<Iteration>,
    predictor_url: String,
    predictor_timeout_ms: u64,
    metric_sink_url: String,
    metric_sink_timeout_ms: u64,
    metric_sink_email: Option<String>,
    metric_sink_password: Option<String>,
    joint_count: usize,
    results_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let raw = TomlConfig::default();
        Self {
            config_file: "default".to_string(),
            output_root: PathBuf::from(raw.session.output_root),
            grasps: GraspSequence::default(),
            camera_width: raw.camera.width,
            camera_height: raw.camera.height,
            frame_rate: raw.camera.frame_rate,
            depth_scale: raw.camera.depth_scale,
            clipping_distance_m: raw.camera.clipping_distance_m,
            replay_dir: PathBuf::from(raw.replay.dir),
            light_setups: raw.plan.light_setups,
            distances_cm: raw.plan.distances_cm,
            iterations: raw.plan.iterations,
            predictor_url: raw.predictor.url,
            predictor_timeout_ms: raw.predictor.timeout_ms,
            metric_sink_url: raw.metric_sink.url,
            metric_sink_timeout_ms: raw.metric_sink.timeout_ms,
            metric_sink_email: None,
            metric_sink_password: None,
            joint_count: raw.metric.joint_count,
            results_root: PathBuf::from(raw.metric.results_root),
        }
    }
}

impl Config {
    /// `explicit` (from --config) wins over CONFIG_FILE, then the default path
    pub fn resolve_config_path(explicit: Option<&str>) -> String {
        if let Some(path) = explicit {
            return path.to_string();
        }
        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }
        DEFAULT_CONFIG_FILE.to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Self::from_toml(toml_config, path.display().to_string())
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    fn from_toml(toml_config: TomlConfig, config_file: String) -> anyhow::Result<Self> {
        let session = toml_config.session;
        let grasps = GraspSequence::new(session.grasps, session.fully_open)
            .ok_or_else(|| anyhow!("[session] grasps must not be empty"))?;

        let camera = toml_config.camera;
        if camera.depth_scale <= 0.0 || camera.clipping_distance_m <= 0.0 {
            return Err(anyhow!("[camera] depth_scale and clipping_distance_m must be positive"));
        }

        let plan = toml_config.plan;
        ExperimentPlan::grid("config", &plan.light_setups, &plan.distances_cm, &plan.iterations)
            .context("[plan] is not a valid experiment plan")?;

        if toml_config.metric.joint_count == 0 {
            return Err(anyhow!("[metric] joint_count must be at least 1"));
        }

        Ok(Self {
            config_file,
            output_root: PathBuf::from(session.output_root),
            grasps,
            camera_width: camera.width,
            camera_height: camera.height,
            frame_rate: camera.frame_rate,
            depth_scale: camera.depth_scale,
            clipping_distance_m: camera.clipping_distance_m,
            replay_dir: PathBuf::from(toml_config.replay.dir),
            light_setups: plan.light_setups,
            distances_cm: plan.distances_cm,
            iterations: plan.iterations,
            predictor_url: toml_config.predictor.url,
            predictor_timeout_ms: toml_config.predictor.timeout_ms,
            metric_sink_url: toml_config.metric_sink.url,
            metric_sink_timeout_ms: toml_config.metric_sink.timeout_ms,
            metric_sink_email: toml_config.metric_sink.email,
            metric_sink_password: toml_config.metric_sink.password,
            joint_count: toml_config.metric.joint_count,
            results_root: PathBuf::from(toml_config.metric.results_root),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "config_fallback_to_defaults");
                Self::default()
            }
        }
    }

    /// The configured plan grid for `subject_id`
    pub fn experiment_plan(&self, subject_id: &str) -> Result<ExperimentPlan, PlanError> {
        ExperimentPlan::grid(subject_id, &self.light_setups, &self.distances_cm, &self.iterations)
    }

    pub fn path_resolver(&self) -> CapturePathResolver {
        CapturePathResolver::new(self.output_root.clone(), self.grasps.clone())
    }

    pub fn exercise_paths(&self) -> ExercisePaths {
        ExercisePaths::new(self.results_root.clone())
    }

    pub fn metric_calculator(&self) -> MetricCalculator {
        MetricCalculator::new(self.joint_count)
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn grasps(&self) -> &GraspSequence {
        &self.grasps
    }

    pub fn camera_width(&self) -> usize {
        self.camera_width
    }

    pub fn camera_height(&self) -> usize {
        self.camera_height
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn depth_scale(&self) -> f64 {
        self.depth_scale
    }

    pub fn clipping_distance_m(&self) -> f64 {
        self.clipping_distance_m
    }

    pub fn replay_dir(&self) -> &Path {
        &self.replay_dir
    }

    pub fn light_setups(&self) -> &[LightSetup] {
        &self.light_setups
    }

    pub fn distances_cm(&self) -> &[u32] {
        &self.distances_cm
    }

    pub fn iterations(&self) -> &[Iteration] {
        &self.iterations
    }

    pub fn predictor_url(&self) -> &str {
        &self.predictor_url
    }

    pub fn predictor_timeout(&self) -> Duration {
        Duration::from_millis(self.predictor_timeout_ms)
    }

    pub fn metric_sink_url(&self) -> &str {
        &self.metric_sink_url
    }

    pub fn metric_sink_timeout(&self) -> Duration {
        Duration::from_millis(self.metric_sink_timeout_ms)
    }

    pub fn metric_sink_email(&self) -> Option<&str> {
        self.metric_sink_email.as_deref()
    }

    pub fn metric_sink_password(&self) -> Option<&str> {
        self.metric_sink_password.as_deref()
    }

    pub fn joint_count(&self) -> usize {
        self.joint_count
    }

    pub fn results_root(&self) -> &Path {
        &self.results_root
    }

    /// Builder method for tests to point every output tree at a scratch dir
    pub fn with_roots(mut self, root: &Path) -> Self {
        self.output_root = root.join("experiments");
        self.results_root = root.join("results");
        self.replay_dir = root.join("recordings");
        self
    }
}
