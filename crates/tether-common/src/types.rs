//! Domain types shared across the sync layer.
//!
//! Wire-facing shapes (`FileEntry`, `FileNode`, `TaskMetadata`) keep the
//! server's field names; everything else is internal.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{new_id, SessionId};

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
    System,
    Error,
}

/// An image attached to an outbound user turn (base64 payload).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub name: String,
    pub media_type: String,
    pub data: String,
}

/// Metadata the server attaches to a terminal `success` frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub num_turns: u64,
    #[serde(default)]
    pub total_cost_usd: f64,
}

/// One durable transcript entry. Append-only within a session; arrival
/// order is display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TaskMetadata>,
}

impl ChatMessage {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            sender,
            content: content.into(),
            timestamp: Utc::now(),
            images: Vec::new(),
            metadata: None,
        }
    }

    pub fn with_images(mut self, images: Vec<ImageRef>) -> Self {
        self.images = images;
        self
    }

    pub fn with_metadata(mut self, metadata: TaskMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A file in the session workspace, as reported by the server.
///
/// Snapshots replace the whole list; entries are never merged field-by-field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    #[serde(rename = "type", default)]
    pub file_type: String,
    #[serde(default)]
    pub modified: Option<String>,
}

/// A node in the workspace directory tree, keyed by child name.
///
/// Mirrors the server's tree shape; `modified` stays a raw ISO string
/// because the server is authoritative and the value is display-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(rename = "type", default)]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, FileNode>,
}

impl FileNode {
    /// Re-derive the flat file list from the tree's file leaves,
    /// depth-first in child-name order.
    pub fn flatten(&self) -> Vec<FileEntry> {
        let mut files = Vec::new();
        self.collect_files(&mut files);
        files
    }

    fn collect_files(&self, out: &mut Vec<FileEntry>) {
        if !self.is_directory {
            out.push(FileEntry {
                name: self.name.clone(),
                path: self.path.clone(),
                size: self.size,
                file_type: self.file_type.clone().unwrap_or_else(|| "text".into()),
                modified: self.modified.clone(),
            });
            return;
        }
        for child in self.children.values() {
            child.collect_files(out);
        }
    }
}

/// Connection health of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
    Failed,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::Disconnected
    }
}

/// Registry entry describing a persisted session for session pickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub id: SessionId,
    pub title: String,
    pub last_message_preview: String,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

/// The durable per-session blob: transcript plus file snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub messages: Vec<ChatMessage>,
    pub files: Vec<FileEntry>,
    pub saved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, path: &str, size: u64) -> FileNode {
        FileNode {
            name: name.into(),
            path: path.into(),
            is_directory: false,
            size,
            modified: Some("2025-01-01T00:00:00".into()),
            file_type: Some("text".into()),
            children: BTreeMap::new(),
        }
    }

    fn dir(name: &str, path: &str, children: Vec<FileNode>) -> FileNode {
        FileNode {
            name: name.into(),
            path: path.into(),
            is_directory: true,
            size: 0,
            modified: None,
            file_type: None,
            children: children
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect(),
        }
    }

    #[test]
    fn flatten_collects_file_leaves_only() {
        let tree = dir(
            "workspace",
            "",
            vec![
                file("main.py", "main.py", 120),
                dir("src", "src", vec![file("app.py", "src/app.py", 64)]),
            ],
        );

        let files = tree.flatten();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "main.py");
        assert_eq!(files[1].path, "src/app.py");
        assert_eq!(files[1].size, 64);
    }

    #[test]
    fn flatten_is_deterministic() {
        let tree = dir(
            "workspace",
            "",
            vec![
                file("b.txt", "b.txt", 1),
                file("a.txt", "a.txt", 1),
                file("c.txt", "c.txt", 1),
            ],
        );

        let paths: Vec<_> = tree.flatten().into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn file_node_parses_server_shape() {
        // Shape produced by the server's tree serializer.
        let json = r#"{
            "name": "workspace",
            "path": "",
            "is_directory": true,
            "size": 0,
            "modified": null,
            "type": null,
            "children": {
                "notes.md": {
                    "name": "notes.md",
                    "path": "notes.md",
                    "is_directory": false,
                    "size": 42,
                    "modified": "2025-03-04T10:21:09",
                    "type": "text"
                }
            }
        }"#;

        let node: FileNode = serde_json::from_str(json).unwrap();
        assert!(node.is_directory);
        let files = node.flatten();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "notes.md");
        assert_eq!(files[0].file_type, "text");
    }

    #[test]
    fn file_entry_parses_server_shape() {
        let json = r#"{"name":"a.py","path":"src/a.py","size":10,"type":"text","modified":"2025-03-04T10:21:09"}"#;
        let entry: FileEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.name, "a.py");
        assert_eq!(entry.file_type, "text");
    }

    #[test]
    fn chat_message_round_trips() {
        let msg = ChatMessage::new(Sender::Assistant, "done").with_metadata(TaskMetadata {
            duration_ms: 1200,
            num_turns: 3,
            total_cost_usd: 0.0421,
        });

        let json = serde_json::to_string(&msg).unwrap();
        let back: ChatMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn chat_message_omits_empty_optionals() {
        let msg = ChatMessage::new(Sender::User, "hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("images"));
        assert!(!json.contains("metadata"));
    }

    #[test]
    fn task_metadata_defaults_missing_fields() {
        let meta: TaskMetadata = serde_json::from_str(r#"{"duration_ms": 5}"#).unwrap();
        assert_eq!(meta.duration_ms, 5);
        assert_eq!(meta.num_turns, 0);
        assert_eq!(meta.total_cost_usd, 0.0);
    }

    #[test]
    fn connection_status_default_is_disconnected() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
    }
}
