//! Outbound user-turn submission.
//!
//! Separate request/response call, not the push stream; acknowledgement
//! arrives later as `progress`/`success`/`error` frames on the channel.

use std::time::Duration;

use serde::Serialize;

use tether_common::{ImageRef, SessionId, SyncError};

#[derive(Debug, Serialize)]
struct SubmitBody<'a> {
    session_id: &'a str,
    message: &'a str,
    images: &'a [ImageRef],
}

/// Validate a turn before any network call. Empty messages never leave
/// the client.
pub fn validate(session_id: &SessionId, message: &str) -> Result<(), SyncError> {
    if session_id.as_str().is_empty() {
        return Err(SyncError::InvalidSubmission("no active session".into()));
    }
    if message.trim().is_empty() {
        return Err(SyncError::InvalidSubmission("empty message".into()));
    }
    Ok(())
}

/// Client for `POST {base}/chat`.
pub struct SubmitClient {
    base_url: String,
    http: reqwest::Client,
}

impl SubmitClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url.trim_end_matches('/'))
    }

    /// Submit a new user turn for the session.
    pub async fn submit(
        &self,
        session_id: &SessionId,
        message: &str,
        images: &[ImageRef],
    ) -> Result<(), SyncError> {
        validate(session_id, message)?;

        let body = SubmitBody {
            session_id: session_id.as_str(),
            message,
            images,
        };
        let response = self
            .http
            .post(self.chat_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Request(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| SyncError::Request(e.to_string()))?;
        tracing::debug!(session = %session_id, "user turn submitted");
        Ok(())
    }
}
