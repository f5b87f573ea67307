//! Follow-up metric submission to the patient web service
//!
//! Protocol:
//! - `POST {url}/auth/signin` form `email`, `password` -> `{ "token", "userId" }`
//! - `POST {url}/follow-up/save/{userId}` form `exercise`, `date`, `metric`
//!   with `Authorization: Bearer <token>`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("metric sink request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("metric sink returned status {status} for {endpoint}")]
    Status { endpoint: &'static str, status: u16 },
}

#[async_trait]
pub trait MetricSink: Send + Sync {
    /// `metric` is the ceiling-rounded MPJPE
    async fn submit(
        &self,
        subject_id: &str,
        exercise: &str,
        date: DateTime<Utc>,
        metric: i64,
    ) -> Result<(), SinkError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    token: String,
    /// String or number depending on the backend
    user_id: serde_json::Value,
}

impl SignInResponse {
    fn user_id(&self) -> String {
        match &self.user_id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Authenticated HTTP sink; `user_id` is the subject id to submit under
pub struct HttpMetricSink {
    base_url: String,
    token: String,
    user_id: String,
    client: reqwest::Client,
}

impl HttpMetricSink {
    pub async fn sign_in(
        base_url: &str,
        email: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, SinkError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let response = client
            .post(format!("{}/auth/signin", base_url))
            .form(&[("email", email), ("password", password)])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            error!(status = %status, "metric_sink_signin_failed");
            return Err(SinkError::Status { endpoint: "signin", status });
        }
        let auth: SignInResponse = response.json().await?;

        let user_id = auth.user_id();
        info!(user_id = %user_id, "metric_sink_signed_in");
        Ok(Self { base_url, token: auth.token, user_id, client })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// Date format expected by the web service
pub fn submission_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[async_trait]
impl MetricSink for HttpMetricSink {
    async fn submit(
        &self,
        subject_id: &str,
        exercise: &str,
        date: DateTime<Utc>,
        metric: i64,
    ) -> Result<(), SinkError> {
        let url = format!("{}/follow-up/save/{}", self.base_url, subject_id);
        let metric_str = metric.to_string();
        let date_str = submission_date(date);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .form(&[("exercise", exercise), ("date", date_str.as_str()), ("metric", metric_str.as_str())])
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            error!(status = %status, subject_id = %subject_id, "metric_submit_failed");
            return Err(SinkError::Status { endpoint: "follow-up/save", status });
        }

        info!(
            subject_id = %subject_id,
            exercise = %exercise,
            metric = %metric,
            status = %status,
            "metric_submitted"
        );
        Ok(())
    }
}
