//! Remote joint predictor
//!
//! Protocol: `POST {url}/calculate-joint-coordinates` with JSON
//! `{ "frame": [[u16]], "centroid": [x, y, z_mm], "is_left_hand": bool }`.
//! Response: `{ "prediction": [...] }`, flat or nested numbers, reshaped to
//! the configured joint count.

use crate::domain::capture::DepthFrame;
use crate::domain::joints::{reshape_to_joints, JointError, JointSet};
use crate::domain::types::{Centroid, HandSide};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("predictor request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("predictor returned status {0}")]
    Status(u16),
    #[error("predictor response is malformed: {0}")]
    Malformed(String),
    #[error(transparent)]
    Joint(#[from] JointError),
}

#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict_joints(
        &self,
        frame: &DepthFrame,
        centroid: &Centroid,
        hand_side: HandSide,
    ) -> Result<JointSet, PredictionError>;
}

#[derive(Serialize)]
struct PredictionRequest {
    frame: Vec<Vec<u16>>,
    centroid: [f64; 3],
    is_left_hand: bool,
}

#[derive(Deserialize)]
struct PredictionResponse {
    prediction: serde_json::Value,
}

pub struct HttpPredictor {
    url: String,
    joint_count: usize,
    client: reqwest::Client,
}

impl HttpPredictor {
    pub fn new(base_url: &str, joint_count: usize, timeout: Duration) -> Result<Self, PredictionError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: format!("{}/calculate-joint-coordinates", base_url.trim_end_matches('/')),
            joint_count,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Predictor for HttpPredictor {
    async fn predict_joints(
        &self,
        frame: &DepthFrame,
        centroid: &Centroid,
        hand_side: HandSide,
    ) -> Result<JointSet, PredictionError> {
        let start = Instant::now();
        let body = PredictionRequest {
            frame: frame.rows(),
            centroid: centroid.to_mm(),
            is_left_hand: hand_side.is_left(),
        };

        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!(status = %status.as_u16(), url = %self.url, "predictor_status_error");
            return Err(PredictionError::Status(status.as_u16()));
        }

        let parsed: PredictionResponse = response.json().await?;
        let flat = flatten_numbers(&parsed.prediction)?;
        let joints = reshape_to_joints(&flat, self.joint_count)?;

        info!(
            joints = %joints.len(),
            latency_ms = %start.elapsed().as_millis(),
            "joints_predicted"
        );
        Ok(joints)
    }
}

/// Collect every number of an arbitrarily nested JSON array, in order
fn flatten_numbers(value: &serde_json::Value) -> Result<Vec<f64>, PredictionError> {
    let mut out = Vec::new();
    collect_numbers(value, &mut out)?;
    Ok(out)
}

fn collect_numbers(value: &serde_json::Value, out: &mut Vec<f64>) -> Result<(), PredictionError> {
    match value {
        serde_json::Value::Number(n) => {
            let v = n.as_f64().ok_or_else(|| PredictionError::Malformed(n.to_string()))?;
            out.push(v);
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_numbers(item, out)?;
            }
        }
        other => return Err(PredictionError::Malformed(other.to_string())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_prediction() {
        let value = json!([[1.0, 2.0, 3.0], [4, 5, 6]]);
        assert_eq!(flatten_numbers(&value).unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_flatten_flat_prediction() {
        let value = json!([0.5, 1.5, 2.5]);
        assert_eq!(flatten_numbers(&value).unwrap(), vec![0.5, 1.5, 2.5]);
    }

    #[test]
    fn test_flatten_rejects_non_numbers() {
        assert!(matches!(
            flatten_numbers(&json!([1.0, "x"])),
            Err(PredictionError::Malformed(_))
        ));
        assert!(matches!(flatten_numbers(&json!(null)), Err(PredictionError::Malformed(_))));
    }

    #[test]
    fn test_url_is_normalized() {
        let predictor = HttpPredictor::new("http://localhost:5000/", 14, Duration::from_secs(1)).unwrap();
        assert_eq!(predictor.url(), "http://localhost:5000/calculate-joint-coordinates");
    }

    #[test]
    fn test_request_body_shape() {
        let frame = DepthFrame::new(2, 1, vec![10, 20], 0.001).unwrap();
        let body = PredictionRequest {
            frame: frame.rows(),
            centroid: Centroid::new(1.0, 0.0, 0.25).to_mm(),
            is_left_hand: HandSide::Left.is_left(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, json!({ "frame": [[10, 20]], "centroid": [1.0, 0.0, 250.0], "is_left_hand": true }));
    }
}
