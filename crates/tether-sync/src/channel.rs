//! Push-channel lifecycle: connect, auto-reconnect, teardown.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use tether_common::{ConnectionStatus, SessionId};

use crate::retry::RetryPolicy;
use crate::transport::Transport;
use crate::wire::RawFrame;

struct ActiveChannel {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

/// Owns the one physical push channel for the active session.
///
/// Invariant: at most one channel task is alive at any time. `connect`
/// always completes the previous teardown (pending backoff timer
/// cancelled, task joined) before spawning the next channel, so frames
/// can never leak across sessions.
pub struct ChannelManager {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    frame_tx: mpsc::Sender<RawFrame>,
    status_tx: watch::Sender<ConnectionStatus>,
    session: Option<SessionId>,
    active: Option<ActiveChannel>,
}

impl ChannelManager {
    /// Returns the manager plus the frame queue and status watch the
    /// dispatcher loop consumes.
    pub fn new(
        transport: Arc<dyn Transport>,
        retry: RetryPolicy,
    ) -> (
        Self,
        mpsc::Receiver<RawFrame>,
        watch::Receiver<ConnectionStatus>,
    ) {
        let (frame_tx, frame_rx) = mpsc::channel(256);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let manager = Self {
            transport,
            retry,
            frame_tx,
            status_tx,
            session: None,
            active: None,
        };
        (manager, frame_rx, status_rx)
    }

    /// Session the manager is (or was last) attached to.
    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    /// Open the channel for `session_id`, tearing down any prior channel
    /// first.
    pub async fn connect(&mut self, session_id: SessionId) {
        self.disconnect().await;

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(run_channel(
            self.transport.clone(),
            session_id.clone(),
            self.retry,
            self.frame_tx.clone(),
            self.status_tx.clone(),
            shutdown_rx,
        ));

        self.session = Some(session_id);
        self.active = Some(ActiveChannel { shutdown_tx, task });
    }

    /// Tear down the channel. Idempotent; cancels any pending
    /// reconnection timer and waits for the channel task to finish.
    pub async fn disconnect(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        // No-op if the task already exited (e.g. terminal failure).
        let _ = active.shutdown_tx.send(()).await;
        if let Err(e) = active.task.await {
            tracing::warn!(error = %e, "channel task join failed");
        }
        let _ = self.status_tx.send(ConnectionStatus::Disconnected);
    }

    /// Force a manual retry from any state, including terminal failure.
    pub async fn reconnect(&mut self) {
        if let Some(session_id) = self.session.clone() {
            self.connect(session_id).await;
        }
    }
}

/// One channel's lifetime: open, pump frames, back off on failure.
///
/// Every suspension point races the shutdown signal so teardown can
/// never be outlived by a scheduled callback.
async fn run_channel(
    transport: Arc<dyn Transport>,
    session_id: SessionId,
    retry: RetryPolicy,
    frame_tx: mpsc::Sender<RawFrame>,
    status_tx: watch::Sender<ConnectionStatus>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut attempts: u32 = 0;

    loop {
        let _ = status_tx.send(ConnectionStatus::Connecting);
        tracing::info!(session = %session_id, attempts, "opening push channel");

        let opened = tokio::select! {
            result = transport.open(&session_id) => result,
            _ = shutdown_rx.recv() => return,
        };

        match opened {
            Ok(mut frames) => {
                // A successful open resets the failure budget.
                attempts = 0;
                let _ = status_tx.send(ConnectionStatus::Connected);
                tracing::info!(session = %session_id, "push channel connected");

                loop {
                    tokio::select! {
                        frame = frames.recv() => match frame {
                            Some(Ok(raw)) => {
                                if frame_tx.send(raw).await.is_err() {
                                    // Consumer gone; nothing left to sync.
                                    return;
                                }
                            }
                            Some(Err(e)) => {
                                tracing::warn!(session = %session_id, error = %e, "push channel stream error");
                                break;
                            }
                            None => {
                                tracing::warn!(session = %session_id, "push channel closed by server");
                                break;
                            }
                        },
                        _ = shutdown_rx.recv() => return,
                    }
                }
                let _ = status_tx.send(ConnectionStatus::Error);
            }
            Err(e) => {
                tracing::warn!(session = %session_id, error = %e, "failed to open push channel");
                let _ = status_tx.send(ConnectionStatus::Error);
            }
        }

        if attempts >= retry.max_attempts {
            tracing::error!(session = %session_id, attempts, "reconnect attempts exhausted, giving up");
            let _ = status_tx.send(ConnectionStatus::Failed);
            return;
        }

        let delay = retry.delay(attempts);
        attempts += 1;
        tracing::info!(
            session = %session_id,
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            "scheduling reconnect"
        );
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.recv() => return,
        }
    }
}
