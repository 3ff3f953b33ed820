//! Session coordinator: the single owner of all client-side state.
//!
//! Owns the transcript and workspace stores, the session archive, and
//! the channel manager, and applies every mutation on one logical
//! execution context — no locks, no shared globals. The channel task
//! only touches state through the frame queue and status watch consumed
//! here.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch};

use tether_common::{
    ChatMessage, ConnectionStatus, ImageRef, PersistError, Sender, SessionId, SessionMeta,
    SessionSnapshot, SyncError,
};
use tether_persist::SessionArchive;
use tether_state::{TranscriptStore, WorkspaceStore};
use tether_sync::{
    submit, Applied, ChannelManager, Dispatcher, RawFrame, RetryPolicy, SubmitClient, Transport,
};

const TITLE_MAX: usize = 50;
const PREVIEW_MAX: usize = 80;

/// A state change worth surfacing to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A durable message was appended.
    Message(ChatMessage),
    /// The progress slot changed. Also emitted with `None` when a
    /// terminal frame resolved a run without appending a message.
    Progress(Option<String>),
    /// The file listing was replaced; `created` names freshly created
    /// files when the server reports them.
    FilesChanged {
        total: usize,
        created: Vec<String>,
    },
    /// Connection health changed.
    Status(ConnectionStatus),
}

pub struct SessionCoordinator {
    transcript: TranscriptStore,
    workspace: WorkspaceStore,
    archive: SessionArchive,
    channel: ChannelManager,
    frames: mpsc::Receiver<RawFrame>,
    status: watch::Receiver<ConnectionStatus>,
    submit: SubmitClient,
}

impl SessionCoordinator {
    /// Build a coordinator around a fresh session.
    pub fn new(
        transport: Arc<dyn Transport>,
        archive: SessionArchive,
        submit: SubmitClient,
        retry: RetryPolicy,
    ) -> Self {
        let (channel, frames, status) = ChannelManager::new(transport, retry);
        Self {
            transcript: TranscriptStore::new(),
            workspace: WorkspaceStore::new(SessionId::new()),
            archive,
            channel,
            frames,
            status,
            submit,
        }
    }

    /// Resume an existing session instead of the fresh one. Call before
    /// [`start`](Self::start).
    pub fn with_session(mut self, id: SessionId) -> Self {
        if let Some(snapshot) = self.archive.load(&id) {
            self.transcript.replace(snapshot.messages);
            self.workspace.reset(id);
            self.workspace.replace_files(snapshot.files, Vec::new());
        } else {
            self.workspace.reset(id);
        }
        self
    }

    pub fn session_id(&self) -> &SessionId {
        self.workspace.session_id()
    }

    pub fn transcript(&self) -> &TranscriptStore {
        &self.transcript
    }

    pub fn workspace(&self) -> &WorkspaceStore {
        &self.workspace
    }

    /// Registry entries for session pickers, most recent first.
    pub fn sessions(&self) -> Vec<SessionMeta> {
        self.archive.sessions()
    }

    /// Open the push channel for the current session.
    pub async fn start(&mut self) {
        self.channel.connect(self.workspace.session_id().clone()).await;
    }

    /// Switch to another session: snapshot the outgoing one, tear down
    /// its channel, then restore (or default) the incoming one and
    /// connect. Teardown always completes before the new connect.
    pub async fn switch_to(&mut self, id: SessionId) {
        if &id == self.workspace.session_id() {
            return;
        }
        tracing::info!(from = %self.workspace.session_id(), to = %id, "switching session");

        self.persist_current();
        self.channel.disconnect().await;
        self.drain_stale_frames();

        self.workspace.reset(id.clone());
        match self.archive.load(&id) {
            Some(snapshot) => {
                self.transcript.replace(snapshot.messages);
                self.workspace.replace_files(snapshot.files, Vec::new());
            }
            None => self.transcript.clear(),
        }

        self.channel.connect(id).await;
    }

    /// Start a brand-new session, snapshotting the current one first.
    pub async fn new_session(&mut self) -> SessionId {
        let fresh = SessionId::new();
        self.switch_to(fresh.clone()).await;
        fresh
    }

    /// Delete a session's persisted data. Deleting the active session
    /// replaces it with a freshly created one.
    pub async fn delete_session(&mut self, id: &SessionId) -> Result<(), PersistError> {
        let was_active = id == self.workspace.session_id();
        if was_active {
            self.channel.disconnect().await;
            self.drain_stale_frames();
        }

        self.archive.delete(id)?;

        if was_active {
            let fresh = SessionId::new();
            tracing::info!(session = %fresh, "active session deleted, starting fresh");
            self.transcript.clear();
            self.workspace.reset(fresh.clone());
            self.channel.connect(fresh).await;
        }
        Ok(())
    }

    /// Submit a new user turn. Validation failures are rejected before
    /// any network call; the push channel later acknowledges with
    /// `progress`/`success`/`error` frames.
    pub async fn submit_turn(
        &mut self,
        message: &str,
        images: Vec<ImageRef>,
    ) -> Result<(), SyncError> {
        submit::validate(self.workspace.session_id(), message)?;

        let message = message.trim();
        self.transcript.push_user(message, images.clone());
        self.transcript.set_loading(true);
        self.persist_current();

        if let Err(e) = self
            .submit
            .submit(self.workspace.session_id(), message, &images)
            .await
        {
            self.transcript.set_loading(false);
            self.transcript
                .push(Sender::Error, format!("Failed to send message: {e}"));
            return Err(e);
        }
        Ok(())
    }

    /// Stop reflecting the in-flight run. Client-local only: the remote
    /// operation keeps running and its terminal frame is still applied
    /// when it arrives.
    pub fn stop_generation(&mut self) {
        self.transcript.set_loading(false);
        self.transcript.set_progress(None);
    }

    /// Manual retry, usable even from the terminal failed state.
    pub async fn reconnect(&mut self) {
        self.channel.reconnect().await;
    }

    /// Snapshot and tear down. Call once before exit.
    pub async fn shutdown(&mut self) {
        self.persist_current();
        self.channel.disconnect().await;
    }

    /// Wait for the next observable state change, applying frames and
    /// status updates in receipt order.
    pub async fn poll(&mut self) -> SyncEvent {
        loop {
            tokio::select! {
                raw = self.frames.recv() => {
                    let Some(raw) = raw else {
                        // Channel manager owns a sender for its whole
                        // lifetime, so this cannot resolve while it lives.
                        return std::future::pending().await;
                    };
                    let before = self.transcript.message_count();
                    match Dispatcher::handle_raw(&raw, &mut self.transcript, &mut self.workspace) {
                        Applied::Nothing => continue,
                        Applied::Progress => {
                            return SyncEvent::Progress(
                                self.transcript.progress().map(str::to_string),
                            );
                        }
                        Applied::Files => {
                            return SyncEvent::FilesChanged {
                                total: self.workspace.files().len(),
                                created: self.workspace.new_files().to_vec(),
                            };
                        }
                        Applied::Completed | Applied::Errored => {
                            if self.transcript.message_count() > before {
                                self.persist_current();
                                if let Some(message) = self.transcript.last_message() {
                                    return SyncEvent::Message(message.clone());
                                }
                            }
                            // Terminal frame that appended nothing (empty
                            // result): the run resolved, but there is no new
                            // message to surface.
                            return SyncEvent::Progress(None);
                        }
                    }
                }
                changed = self.status.changed() => {
                    if changed.is_err() {
                        return std::future::pending().await;
                    }
                    let status = *self.status.borrow_and_update();
                    self.workspace.set_status(status);
                    return SyncEvent::Status(status);
                }
            }
        }
    }

    /// Frames queued by a torn-down channel are dropped so they can
    /// never mutate the next session's state.
    fn drain_stale_frames(&mut self) {
        let mut dropped = 0usize;
        while self.frames.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!(dropped, "discarded frames from torn-down channel");
        }
    }

    fn persist_current(&mut self) {
        if self.transcript.message_count() == 0 {
            return;
        }
        let id = self.workspace.session_id().clone();
        let snapshot = SessionSnapshot {
            messages: self.transcript.messages().to_vec(),
            files: self.workspace.files().to_vec(),
            saved_at: Utc::now(),
        };
        if let Err(e) = self.archive.save(&id, &snapshot) {
            tracing::warn!(session = %id, error = %e, "failed to save session snapshot");
            return;
        }

        let meta = SessionMeta {
            id: id.clone(),
            title: truncate(
                self.transcript.first_user_content().unwrap_or("Untitled"),
                TITLE_MAX,
            ),
            last_message_preview: truncate(
                self.transcript
                    .last_message()
                    .map(|m| m.content.as_str())
                    .unwrap_or(""),
                PREVIEW_MAX,
            ),
            updated_at: Utc::now(),
            message_count: self.transcript.message_count(),
        };
        if let Err(e) = self.archive.upsert_meta(meta) {
            tracing::warn!(session = %id, error = %e, "failed to update session registry");
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tether_common::FileEntry;
    use tether_sync::FrameStream;

    /// Opens succeed, optionally preloading frames, and streams stay
    /// open until torn down.
    struct StubTransport {
        preload: Vec<RawFrame>,
        live: Mutex<Vec<mpsc::Sender<Result<RawFrame, SyncError>>>>,
    }

    impl StubTransport {
        fn silent() -> Arc<Self> {
            Arc::new(Self {
                preload: Vec::new(),
                live: Mutex::new(Vec::new()),
            })
        }

        fn scripted(preload: Vec<RawFrame>) -> Arc<Self> {
            Arc::new(Self {
                preload,
                live: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn open(&self, _session_id: &SessionId) -> Result<FrameStream, SyncError> {
            let (tx, rx) = mpsc::channel(32);
            for frame in &self.preload {
                tx.send(Ok(frame.clone())).await.expect("preload frame");
            }
            self.live.lock().unwrap().push(tx);
            Ok(rx)
        }
    }

    fn coordinator(transport: Arc<StubTransport>, dir: &std::path::Path) -> SessionCoordinator {
        SessionCoordinator::new(
            transport,
            SessionArchive::new(dir),
            SubmitClient::new("http://127.0.0.1:9"),
            RetryPolicy::default(),
        )
    }

    fn entry(path: &str) -> FileEntry {
        FileEntry {
            name: path.to_string(),
            path: path.to_string(),
            size: 1,
            file_type: "text".into(),
            modified: None,
        }
    }

    #[tokio::test]
    async fn switch_snapshots_outgoing_and_restores_incoming() {
        let dir = tempfile::tempdir().unwrap();
        let mut coord = coordinator(StubTransport::silent(), dir.path());
        coord.start().await;

        let original = coord.session_id().clone();
        coord.transcript.push(Sender::User, "build a parser");
        coord.transcript.push(Sender::Assistant, "done");
        coord.workspace.replace_files(vec![entry("parser.py")], Vec::new());

        let other = SessionId::new();
        coord.switch_to(other.clone()).await;
        assert_eq!(coord.session_id(), &other);
        assert_eq!(coord.transcript().message_count(), 0);
        assert!(coord.workspace().files().is_empty());

        coord.switch_to(original.clone()).await;
        assert_eq!(coord.session_id(), &original);
        assert_eq!(coord.transcript().message_count(), 2);
        assert_eq!(coord.transcript().messages()[0].content, "build a parser");
        assert_eq!(coord.workspace().files().len(), 1);

        coord.shutdown().await;
    }

    #[tokio::test]
    async fn switch_updates_the_session_registry() {
        let dir = tempfile::tempdir().unwrap();
        let mut coord = coordinator(StubTransport::silent(), dir.path());
        coord.start().await;

        let original = coord.session_id().clone();
        coord.transcript.push(Sender::User, "hello there");
        coord.switch_to(SessionId::new()).await;

        let sessions = coord.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, original);
        assert_eq!(sessions[0].title, "hello there");
        assert_eq!(sessions[0].message_count, 1);

        coord.shutdown().await;
    }

    #[tokio::test]
    async fn deleting_active_session_creates_a_fresh_one() {
        let dir = tempfile::tempdir().unwrap();
        let mut coord = coordinator(StubTransport::silent(), dir.path());
        coord.start().await;

        let doomed = coord.session_id().clone();
        coord.transcript.push(Sender::User, "delete me");
        coord.workspace.replace_files(vec![entry("junk.txt")], Vec::new());
        coord.persist_current();

        coord.delete_session(&doomed.clone()).await.unwrap();

        assert_ne!(coord.session_id(), &doomed);
        assert_eq!(coord.transcript().message_count(), 0);
        assert!(coord.workspace().files().is_empty());
        assert!(coord.sessions().iter().all(|m| m.id != doomed));

        coord.shutdown().await;
    }

    #[tokio::test]
    async fn deleting_inactive_session_keeps_current_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut coord = coordinator(StubTransport::silent(), dir.path());
        coord.start().await;

        let active = coord.session_id().clone();
        coord.transcript.push(Sender::User, "keep me");

        let other = SessionId::new();
        coord.archive.save(
            &other,
            &SessionSnapshot {
                messages: vec![ChatMessage::new(Sender::User, "bye")],
                files: Vec::new(),
                saved_at: Utc::now(),
            },
        )
        .unwrap();

        coord.delete_session(&other).await.unwrap();
        assert_eq!(coord.session_id(), &active);
        assert_eq!(coord.transcript().message_count(), 1);

        coord.shutdown().await;
    }

    #[tokio::test]
    async fn empty_turn_is_rejected_before_any_network_call() {
        let dir = tempfile::tempdir().unwrap();
        let mut coord = coordinator(StubTransport::silent(), dir.path());

        let result = coord.submit_turn("   ", Vec::new()).await;
        assert!(matches!(result, Err(SyncError::InvalidSubmission(_))));
        assert_eq!(coord.transcript().message_count(), 0);
        assert!(!coord.transcript().is_loading());
    }

    #[tokio::test]
    async fn stop_generation_is_client_local() {
        let dir = tempfile::tempdir().unwrap();
        let mut coord = coordinator(StubTransport::silent(), dir.path());
        coord.transcript.set_loading(true);
        coord.transcript.set_progress(Some("working".into()));
        coord.workspace.set_status(ConnectionStatus::Connected);

        coord.stop_generation();
        assert!(!coord.transcript().is_loading());
        assert_eq!(coord.transcript().progress(), None);
        // The channel is untouched; terminal frames still apply later.
        assert_eq!(coord.workspace().status(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn poll_applies_frames_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let transport = StubTransport::scripted(vec![
            RawFrame::new("progress", r#"{"message":"Analyzing..."}"#),
            RawFrame::new(
                "success",
                r#"{"result":"ok","metadata":{"duration_ms":10,"num_turns":1,"total_cost_usd":0.001}}"#,
            ),
        ]);
        let mut coord = coordinator(transport, dir.path());
        coord.start().await;

        let message = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let SyncEvent::Message(m) = coord.poll().await {
                    return m;
                }
            }
        })
        .await
        .expect("terminal frame never arrived");

        assert_eq!(message.sender, Sender::Assistant);
        assert_eq!(message.content, "ok");
        assert_eq!(coord.transcript().message_count(), 1);
        assert_eq!(coord.transcript().progress(), None);
        assert!(!coord.transcript().is_loading());
        assert_eq!(coord.workspace().status(), ConnectionStatus::Connected);

        coord.shutdown().await;
    }

    #[tokio::test]
    async fn empty_result_success_does_not_reemit_an_earlier_message() {
        let dir = tempfile::tempdir().unwrap();
        let transport =
            StubTransport::scripted(vec![RawFrame::new("success", r#"{"result":"   "}"#)]);
        let mut coord = coordinator(transport, dir.path());
        coord.transcript.push(Sender::User, "my own turn");
        coord.transcript.set_loading(true);
        coord.start().await;

        let event = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match coord.poll().await {
                    SyncEvent::Status(_) => continue,
                    other => return other,
                }
            }
        })
        .await
        .expect("terminal frame never arrived");

        // The run resolved without a result; the prior user message must
        // not be surfaced again.
        assert_eq!(event, SyncEvent::Progress(None));
        assert_eq!(coord.transcript().message_count(), 1);
        assert!(!coord.transcript().is_loading());

        coord.shutdown().await;
    }
}
