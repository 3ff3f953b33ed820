//! Chat transcript store: ordered messages, loading flag, progress slot.

use tether_common::{ChatMessage, ImageRef, Sender, TaskMetadata};

/// Holds the ordered message list for the active session.
///
/// The progress slot is a single overwritten value: a long-running remote
/// operation emits many transient status lines, and only the latest one is
/// shown until a terminal `success`/`error` frame resolves it into at most
/// one durable message. Bursts of progress frames therefore cannot
/// accumulate memory or backlog.
#[derive(Debug, Default)]
pub struct TranscriptStore {
    messages: Vec<ChatMessage>,
    loading: bool,
    progress: Option<String>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message with a generated id and timestamp. Arrival order
    /// is display order; messages are never reordered.
    pub fn push(&mut self, sender: Sender, content: impl Into<String>) -> &ChatMessage {
        self.messages.push(ChatMessage::new(sender, content));
        self.messages.last().unwrap()
    }

    pub fn push_user(&mut self, content: impl Into<String>, images: Vec<ImageRef>) -> &ChatMessage {
        self.messages
            .push(ChatMessage::new(Sender::User, content).with_images(images));
        self.messages.last().unwrap()
    }

    pub fn push_with_metadata(
        &mut self,
        sender: Sender,
        content: impl Into<String>,
        metadata: TaskMetadata,
    ) -> &ChatMessage {
        self.messages
            .push(ChatMessage::new(sender, content).with_metadata(metadata));
        self.messages.last().unwrap()
    }

    /// Overwrite the progress slot. Never queues.
    pub fn set_progress(&mut self, progress: Option<String>) {
        self.progress = progress;
    }

    pub fn progress(&self) -> Option<&str> {
        self.progress.as_deref()
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// First user message, used as the session title seed.
    pub fn first_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.sender == Sender::User)
            .map(|m| m.content.as_str())
    }

    /// Reset to empty: no messages, not loading, no progress.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.loading = false;
        self.progress = None;
    }

    /// Replace the whole transcript (session restore).
    pub fn replace(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
        self.loading = false;
        self.progress = None;
    }
}
