//! Frames delivered by the camera and the captures built from them

use crate::domain::joints::JointSet;
use crate::domain::types::Centroid;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame source io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("depth matrix row {row} has {found} columns, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },
    #[error("invalid depth value '{0}'")]
    Value(String),
    #[error("depth matrix is empty")]
    Empty,
    #[error("frame source closed")]
    Closed,
}

/// Raw depth image in sensor units (z16)
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFrame {
    width: usize,
    height: usize,
    data: Vec<u16>,
    /// Metres per sensor unit
    depth_scale: f64,
}

impl DepthFrame {
    /// Returns `None` if `data` does not hold `width * height` values
    pub fn new(width: usize, height: usize, data: Vec<u16>, depth_scale: f64) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self { width, height, data, depth_scale })
    }

    /// Parse a whitespace separated depth matrix, one image row per line
    pub fn from_text(text: &str, depth_scale: f64) -> Result<Self, FrameError> {
        let mut width = 0;
        let mut height = 0;
        let mut data = Vec::new();

        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let before = data.len();
            for token in line.split_whitespace() {
                let value: f64 =
                    token.parse().map_err(|_| FrameError::Value(token.to_string()))?;
                if !(0.0..=f64::from(u16::MAX)).contains(&value) {
                    return Err(FrameError::Value(token.to_string()));
                }
                data.push(value.round() as u16);
            }
            let found = data.len() - before;
            if height == 0 {
                width = found;
            } else if found != width {
                return Err(FrameError::Ragged { row: height, expected: width, found });
            }
            height += 1;
        }

        if data.is_empty() {
            return Err(FrameError::Empty);
        }
        Ok(Self { width, height, data, depth_scale })
    }

    /// Matrix text with six decimals per value
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.data.len() * 12);
        for row in self.data.chunks(self.width.max(1)) {
            let line: Vec<String> = row.iter().map(|v| format!("{:.6}", f64::from(*v))).collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        out
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn depth_scale(&self) -> f64 {
        self.depth_scale
    }

    pub fn data(&self) -> &[u16] {
        &self.data
    }

    /// Raw value at column `x`, row `y`
    #[inline]
    pub fn raw(&self, x: usize, y: usize) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Distance in metres at column `x`, row `y`
    pub fn distance_m(&self, x: usize, y: usize) -> Option<f64> {
        self.raw(x, y).map(|v| f64::from(v) * self.depth_scale)
    }

    /// Rows of raw values, as sent to the predictor
    pub fn rows(&self) -> Vec<Vec<u16>> {
        self.data.chunks(self.width.max(1)).map(<[u16]>::to_vec).collect()
    }
}

/// BGR8 color image aligned to the depth frame
#[derive(Debug, Clone, PartialEq)]
pub struct ColorFrame {
    pub width: usize,
    pub height: usize,
    pub bgr: Vec<u8>,
}

/// One aligned frame pair from the camera
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub depth: DepthFrame,
    pub color: Option<ColorFrame>,
}

impl Frame {
    pub fn depth_only(depth: DepthFrame) -> Self {
        Self { depth, color: None }
    }
}

/// An accepted frame, ready to be written once
#[derive(Debug, Clone)]
pub struct Capture {
    pub id: Uuid,
    pub captured_at: DateTime<Utc>,
    pub frame: Frame,
    pub centroid: Centroid,
    pub joints: Option<JointSet>,
    pub storage_path: PathBuf,
}

impl Capture {
    pub fn new(frame: Frame, centroid: Centroid, storage_path: PathBuf) -> Self {
        Self {
            id: Uuid::now_v7(),
            captured_at: Utc::now(),
            frame,
            centroid,
            joints: None,
            storage_path,
        }
    }
}
