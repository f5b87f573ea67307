//! Frame acquisition
//!
//! `FrameSource` is the boundary to the camera. `ReplayFrameSource` plays
//! back recorded depth matrices (one `.txt` file per frame, sorted by name)
//! in a loop at the configured frame rate, with operator keys from any
//! `KeySource`.

use crate::domain::capture::{DepthFrame, Frame, FrameError};
use crate::io::terminal::{KeySource, OperatorKey};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Source of camera frames and operator signals
pub trait FrameSource {
    /// Block until the next tick. `Ok(None)` is a transiently empty frame.
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError>;

    /// Operator asked to capture during the last tick
    fn capture_signal(&self) -> bool;

    /// Operator asked to abort during the last tick
    fn abort_signal(&self) -> bool;
}

pub struct ReplayFrameSource<K: KeySource> {
    frames: Vec<DepthFrame>,
    cursor: usize,
    keys: K,
    last_key: Option<OperatorKey>,
    frame_interval: Duration,
}

impl<K: KeySource> ReplayFrameSource<K> {
    pub fn new(frames: Vec<DepthFrame>, keys: K, frame_rate: u32) -> Result<Self, FrameError> {
        if frames.is_empty() {
            return Err(FrameError::Empty);
        }
        let frame_interval = Duration::from_secs(1) / frame_rate.max(1);
        Ok(Self { frames, cursor: 0, keys, last_key: None, frame_interval })
    }

    /// Load every `.txt` depth matrix in `dir`
    pub fn open(dir: &Path, depth_scale: f64, keys: K, frame_rate: u32) -> Result<Self, FrameError> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        files.sort();

        let mut frames = Vec::with_capacity(files.len());
        for file in &files {
            let text = fs::read_to_string(file)?;
            frames.push(DepthFrame::from_text(&text, depth_scale)?);
        }

        info!(dir = %dir.display(), frames = %frames.len(), "replay_frames_loaded");
        Self::new(frames, keys, frame_rate)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl<K: KeySource> FrameSource for ReplayFrameSource<K> {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        self.last_key = self.keys.poll_key(self.frame_interval)?;
        if let Some(OperatorKey::Other(ref key)) = self.last_key {
            warn!(key = %key, "input_not_recognized");
        }

        let depth = self.frames[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.frames.len();
        debug!(cursor = %self.cursor, "replay_frame");
        Ok(Some(Frame::depth_only(depth)))
    }

    fn capture_signal(&self) -> bool {
        matches!(self.last_key, Some(OperatorKey::Capture))
    }

    fn abort_signal(&self) -> bool {
        matches!(self.last_key, Some(OperatorKey::Abort))
    }
}
