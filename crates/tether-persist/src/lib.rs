//! Durable session persistence.
//!
//! Snapshots each session's transcript and file listing to JSON blobs on
//! disk and keeps a capped, most-recently-updated registry of session
//! metadata for session pickers.

pub mod archive;

pub use archive::{SessionArchive, DEFAULT_SESSION_CAP};
