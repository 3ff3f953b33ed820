//! Server-Sent Events (SSE) stream parsing.
//!
//! The push channel is a long-lived `text/event-stream` response. This
//! module reads it line by line and assembles `event:`/`data:` fields
//! into [`RawFrame`]s.

use futures_util::StreamExt;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;

use tether_common::SyncError;

use crate::wire::RawFrame;

/// Line-by-line SSE field accumulator. An empty line terminates the
/// current event.
#[derive(Debug, Default)]
pub struct SseAccumulator {
    event: Option<String>,
    data: String,
}

impl SseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line; returns a completed frame on event boundaries.
    pub fn push_line(&mut self, line: &str) -> Option<RawFrame> {
        if line.is_empty() {
            return self.take_frame();
        }

        if let Some(event) = line.strip_prefix("event: ") {
            self.event = Some(event.to_string());
        } else if let Some(data) = line.strip_prefix("data: ") {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(data);
        }
        // Other fields (id:, retry:, comments) are ignored.
        None
    }

    /// Flush whatever is buffered (stream end without trailing blank line).
    pub fn flush(&mut self) -> Option<RawFrame> {
        self.take_frame()
    }

    fn take_frame(&mut self) -> Option<RawFrame> {
        if self.event.is_none() && self.data.is_empty() {
            return None;
        }
        // "message" is the SSE default event type.
        let event = self.event.take().unwrap_or_else(|| "message".to_string());
        let data = std::mem::take(&mut self.data);
        Some(RawFrame { event, data })
    }
}

/// Read an SSE response to completion, forwarding each frame on `tx`.
///
/// Returns `Ok(())` when the server closes the stream cleanly and `Err`
/// on a transport read error. Stops early (without error) if the
/// receiver has gone away.
pub async fn read_sse_stream(
    response: reqwest::Response,
    tx: &mpsc::Sender<Result<RawFrame, SyncError>>,
) -> Result<(), SyncError> {
    let byte_stream = response
        .bytes_stream()
        .map(|result| result.map_err(std::io::Error::other));
    let reader = tokio::io::BufReader::new(StreamReader::new(byte_stream));
    let mut lines = reader.lines();
    let mut acc = SseAccumulator::new();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| SyncError::Stream(e.to_string()))?
    {
        if let Some(frame) = acc.push_line(&line) {
            if tx.send(Ok(frame)).await.is_err() {
                return Ok(());
            }
        }
    }

    if let Some(frame) = acc.flush() {
        let _ = tx.send(Ok(frame)).await;
    }
    Ok(())
}
