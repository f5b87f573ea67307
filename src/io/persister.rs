//! Capture persistence - writes accepted frames to their capture directory
//!
//! Files per capture directory:
//! - `depth_frame.txt` - raw depth matrix, six decimals
//! - `centroid.txt` - `x y z` with z in millimetres
//! - `color_frame.bgr` - raw BGR8 bytes, when a color frame exists
//! - `prediction.txt` - predicted joints, one per line, when known
//! - `capture.json` - capture metadata

use crate::domain::capture::Capture;
use crate::domain::joints::JointSet;
use crate::services::path_resolver::PREDICTION_FILE;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

pub const DEPTH_FILE: &str = "depth_frame.txt";
pub const CENTROID_FILE: &str = "centroid.txt";
pub const COLOR_FILE: &str = "color_frame.bgr";
pub const METADATA_FILE: &str = "capture.json";

/// Writes captures somewhere durable
pub trait Persister {
    fn save(&mut self, path: &Path, capture: &Capture) -> io::Result<()>;

    /// Store predicted joints next to an already saved capture
    fn save_joints(&mut self, path: &Path, joints: &JointSet) -> io::Result<()>;
}

#[derive(Debug, Serialize)]
struct CaptureMetadata {
    id: Uuid,
    captured_at: DateTime<Utc>,
    width: usize,
    height: usize,
    depth_scale: f64,
    centroid: [f64; 3],
    has_color: bool,
    joint_count: Option<usize>,
}

/// Plain-file persister
#[derive(Debug, Default)]
pub struct FsPersister;

impl FsPersister {
    pub fn new() -> Self {
        Self
    }
}

impl Persister for FsPersister {
    fn save(&mut self, path: &Path, capture: &Capture) -> io::Result<()> {
        fs::create_dir_all(path)?;

        let depth = &capture.frame.depth;
        fs::write(path.join(DEPTH_FILE), depth.to_text())?;

        let [x, y, z_mm] = capture.centroid.to_mm();
        fs::write(path.join(CENTROID_FILE), format!("{:.6} {:.6} {:.6}\n", x, y, z_mm))?;

        if let Some(color) = &capture.frame.color {
            fs::write(path.join(COLOR_FILE), &color.bgr)?;
        }

        if let Some(joints) = &capture.joints {
            fs::write(path.join(PREDICTION_FILE), joints.to_text())?;
        }

        let metadata = CaptureMetadata {
            id: capture.id,
            captured_at: capture.captured_at,
            width: depth.width(),
            height: depth.height(),
            depth_scale: depth.depth_scale(),
            centroid: capture.centroid.to_mm(),
            has_color: capture.frame.color.is_some(),
            joint_count: capture.joints.as_ref().map(JointSet::len),
        };
        let json = serde_json::to_string_pretty(&metadata).map_err(io::Error::other)?;
        fs::write(path.join(METADATA_FILE), json)?;

        info!(id = %capture.id, path = %path.display(), "capture_saved");
        Ok(())
    }

    fn save_joints(&mut self, path: &Path, joints: &JointSet) -> io::Result<()> {
        fs::create_dir_all(path)?;
        fs::write(path.join(PREDICTION_FILE), joints.to_text())?;
        debug!(path = %path.display(), joints = %joints.len(), "prediction_saved");
        Ok(())
    }
}
