//! Shared types for the Tether sync layer.
//!
//! Everything the other crates agree on lives here: session ids, the
//! chat/file/session domain types, the connection status enum, and the
//! error taxonomy.

pub mod errors;
pub mod id;
pub mod types;

pub use errors::{ConfigError, PersistError, SyncError, TetherError};
pub use id::{new_id, SessionId};
pub use types::{
    ChatMessage, ConnectionStatus, FileEntry, FileNode, ImageRef, Sender, SessionMeta,
    SessionSnapshot, TaskMetadata,
};
