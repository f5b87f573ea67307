//! Shared types for capture sessions

use serde::{Deserialize, Serialize};

/// A point in camera space: [x, y, z]
pub type Point3 = [f64; 3];

/// Position of the lamp relative to the camera and the hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LightSetup {
    CameraMounted,
    Side,
    HandMounted,
}

impl LightSetup {
    /// Directory segment used in capture paths
    pub fn as_str(&self) -> &'static str {
        match self {
            LightSetup::CameraMounted => "camera-mounted",
            LightSetup::Side => "side",
            LightSetup::HandMounted => "hand-mounted",
        }
    }
}

impl std::fmt::Display for LightSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a capture is the gold standard or a later comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureType {
    #[serde(alias = "gold_standard")]
    Reference,
    FollowUp,
}

impl CaptureType {
    /// Directory segment used in capture paths
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureType::Reference => "gold_standard",
            CaptureType::FollowUp => "follow_up",
        }
    }

    #[inline]
    pub fn is_follow_up(&self) -> bool {
        matches!(self, CaptureType::FollowUp)
    }
}

impl std::fmt::Display for CaptureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandSide {
    Left,
    Right,
}

impl HandSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandSide::Left => "left",
            HandSide::Right => "right",
        }
    }

    #[inline]
    pub fn is_left(&self) -> bool {
        matches!(self, HandSide::Left)
    }
}

impl std::fmt::Display for HandSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HandSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(HandSide::Left),
            "right" => Ok(HandSide::Right),
            other => Err(format!("unknown hand side '{}'", other)),
        }
    }
}

/// Hand centroid: pixel column, pixel row, depth in metres
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub x: f64,
    pub y: f64,
    pub z_m: f64,
}

impl Centroid {
    pub fn new(x: f64, y: f64, z_m: f64) -> Self {
        Self { x, y, z_m }
    }

    /// Depth in whole centimetres, as shown to the operator
    #[inline]
    pub fn distance_cm(&self) -> i64 {
        (self.z_m * 100.0).round() as i64
    }

    /// Centroid with depth converted to millimetres (predictor and file format)
    pub fn to_mm(&self) -> Point3 {
        [self.x, self.y, self.z_m * 1000.0]
    }
}

/// Ordered grasp labels cycled through during a follow-up sub-session
///
/// Never empty. `fully_open` is the label used for reference captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraspSequence {
    labels: Vec<String>,
    fully_open: String,
}

impl GraspSequence {
    /// Returns `None` if `labels` is empty
    pub fn new(labels: Vec<String>, fully_open: impl Into<String>) -> Option<Self> {
        if labels.is_empty() {
            return None;
        }
        Some(Self { labels, fully_open: fully_open.into() })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn fully_open(&self) -> &str {
        &self.fully_open
    }
}

impl Default for GraspSequence {
    fn default() -> Self {
        Self {
            labels: vec![
                "closed".to_string(),
                "half-open-1".to_string(),
                "half-open-2".to_string(),
                "open".to_string(),
            ],
            fully_open: "open".to_string(),
        }
    }
}
