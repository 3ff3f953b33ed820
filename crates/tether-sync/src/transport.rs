//! Transport seam: how a push channel is physically opened.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use tether_common::{SessionId, SyncError};

use crate::sse::read_sse_stream;
use crate::wire::RawFrame;

/// Frames from one open channel, in receipt order. The stream ends when
/// the server closes the connection; a transport read error arrives as
/// the final item.
pub type FrameStream = mpsc::Receiver<Result<RawFrame, SyncError>>;

/// Opens a per-session frame stream. The channel manager owns retries;
/// a transport only reports per-open success or failure.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, session_id: &SessionId) -> Result<FrameStream, SyncError>;
}

/// SSE transport over HTTP: `GET {base}/sessions/{id}/stream`.
pub struct SseTransport {
    base_url: String,
    http: reqwest::Client,
}

impl SseTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            // No overall timeout: the stream is long-lived and the server
            // keeps it warm with ping frames.
            http: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    fn stream_url(&self, session_id: &SessionId) -> String {
        format!(
            "{}/sessions/{}/stream",
            self.base_url.trim_end_matches('/'),
            session_id
        )
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn open(&self, session_id: &SessionId) -> Result<FrameStream, SyncError> {
        let response = self
            .http
            .get(self.stream_url(session_id))
            .send()
            .await
            .map_err(|e| SyncError::ConnectFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| SyncError::ConnectFailed(e.to_string()))?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            if let Err(e) = read_sse_stream(response, &tx).await {
                let _ = tx.send(Err(e)).await;
            }
        });
        Ok(rx)
    }
}
