//! Wire frame types and decoding.
//!
//! The push channel delivers named SSE events with JSON bodies. Decoding
//! normalizes each into a canonical [`PushFrame`]; unknown event names
//! decode to `None` so server-side additions never break the client.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use tether_common::{FileEntry, FileNode, SyncError, TaskMetadata};

/// A raw frame as received from the transport: event name plus unparsed
/// JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub event: String,
    pub data: String,
}

impl RawFrame {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }
}

/// Body of a `verbose` frame: a status line, optionally with the tool
/// call that produced it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VerbosePayload {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FilesPayload {
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub new_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StructurePayload {
    pub structure: FileNode,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SuccessPayload {
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub metadata: TaskMetadata,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// A decoded push-channel frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PushFrame {
    Connected,
    Ping,
    Verbose(VerbosePayload),
    Progress { message: String },
    Text { content: String },
    FilesUpdated(FilesPayload),
    DirectoryStructureUpdated(StructurePayload),
    Success(SuccessPayload),
    Error(ErrorPayload),
}

fn parse<T: DeserializeOwned>(data: &str) -> Result<T, SyncError> {
    serde_json::from_str(data).map_err(|e| SyncError::Decode(e.to_string()))
}

/// Decode a raw frame into its canonical form.
///
/// Returns `Ok(None)` for unknown event names (forward compatible) and
/// `Err` for malformed bodies — the caller logs and drops those; a single
/// bad frame never terminates the channel.
pub fn decode_frame(raw: &RawFrame) -> Result<Option<PushFrame>, SyncError> {
    #[derive(Deserialize)]
    struct Progress {
        message: String,
    }
    #[derive(Deserialize)]
    struct Text {
        #[serde(default)]
        content: String,
    }

    let frame = match raw.event.as_str() {
        "connected" => PushFrame::Connected,
        "ping" => PushFrame::Ping,
        "verbose" => PushFrame::Verbose(parse(&raw.data)?),
        "progress" => {
            let p: Progress = parse(&raw.data)?;
            PushFrame::Progress { message: p.message }
        }
        "text" => {
            let t: Text = parse(&raw.data)?;
            PushFrame::Text { content: t.content }
        }
        "files_updated" => PushFrame::FilesUpdated(parse(&raw.data)?),
        "directory_structure_updated" => PushFrame::DirectoryStructureUpdated(parse(&raw.data)?),
        "success" => PushFrame::Success(parse(&raw.data)?),
        "error" => PushFrame::Error(parse(&raw.data)?),
        _ => return Ok(None),
    };
    Ok(Some(frame))
}
