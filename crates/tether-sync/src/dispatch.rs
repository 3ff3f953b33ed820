//! Routes decoded frames into the state stores.

use tether_common::Sender;
use tether_state::{TranscriptStore, WorkspaceStore};

use crate::wire::{decode_frame, PushFrame, RawFrame, VerbosePayload};

/// What a frame did to the stores. Lets callers surface UI updates
/// without diffing store state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Keep-alive, unknown, malformed, or reserved frame; no mutation.
    Nothing,
    /// Progress slot overwritten.
    Progress,
    /// File listing replaced wholesale.
    Files,
    /// Terminal success: loading and progress cleared, result appended.
    Completed,
    /// Application-level error appended. Connection status is untouched.
    Errored,
}

pub struct Dispatcher;

impl Dispatcher {
    /// Decode and route one raw frame. Malformed frames are logged and
    /// dropped; they never terminate the channel.
    pub fn handle_raw(
        raw: &RawFrame,
        transcript: &mut TranscriptStore,
        workspace: &mut WorkspaceStore,
    ) -> Applied {
        match decode_frame(raw) {
            Ok(Some(frame)) => Self::apply(frame, transcript, workspace),
            Ok(None) => {
                tracing::debug!(event = %raw.event, "ignoring unknown frame type");
                Applied::Nothing
            }
            Err(e) => {
                tracing::warn!(event = %raw.event, error = %e, "dropping malformed frame");
                Applied::Nothing
            }
        }
    }

    /// Route a decoded frame into the stores.
    pub fn apply(
        frame: PushFrame,
        transcript: &mut TranscriptStore,
        workspace: &mut WorkspaceStore,
    ) -> Applied {
        match frame {
            PushFrame::Connected | PushFrame::Ping => Applied::Nothing,
            PushFrame::Verbose(payload) => {
                transcript.set_progress(Some(format_verbose(&payload)));
                Applied::Progress
            }
            PushFrame::Progress { message } => {
                transcript.set_progress(Some(message));
                Applied::Progress
            }
            // Reserved for future incremental rendering; state ignores it.
            PushFrame::Text { .. } => Applied::Nothing,
            PushFrame::FilesUpdated(payload) => {
                workspace.replace_files(payload.files, payload.new_files);
                Applied::Files
            }
            PushFrame::DirectoryStructureUpdated(payload) => {
                workspace.replace_tree(payload.structure);
                Applied::Files
            }
            PushFrame::Success(payload) => {
                transcript.set_loading(false);
                transcript.set_progress(None);
                if !payload.result.trim().is_empty() {
                    transcript.push_with_metadata(
                        Sender::Assistant,
                        payload.result,
                        payload.metadata,
                    );
                }
                Applied::Completed
            }
            PushFrame::Error(payload) => {
                transcript.set_loading(false);
                transcript.set_progress(None);
                transcript.push(Sender::Error, payload.message);
                Applied::Errored
            }
        }
    }
}

/// Render a verbose frame as a one-line status, preferring the tool-call
/// context when present.
fn format_verbose(payload: &VerbosePayload) -> String {
    let Some(tool) = payload.tool_name.as_deref() else {
        return payload.message.clone();
    };
    let field = |key: &str| {
        payload
            .tool_input
            .as_ref()
            .and_then(|input| input.get(key))
            .and_then(|value| value.as_str())
            .unwrap_or("")
            .to_string()
    };
    let path_field = || {
        let path = field("file_path");
        if path.is_empty() {
            field("path")
        } else {
            path
        }
    };

    match tool {
        "LS" => format!("Listing: {}", field("path")),
        "Read" => format!("Reading: {}", path_field()),
        "Write" => format!("Writing: {}", path_field()),
        "Edit" => format!("Editing: {}", path_field()),
        "Bash" => format!("Running: {}", field("command")),
        "TodoWrite" => "Updating todo list".to_string(),
        other => format!("Using tool: {other}"),
    }
}
