//! Client-side state stores.
//!
//! Two explicit stores owned by one coordinator and passed by reference
//! to the dispatcher: the chat transcript and the session workspace.
//! All mutation is synchronous; no store takes locks.

pub mod transcript;
pub mod workspace;

pub use transcript::TranscriptStore;
pub use workspace::WorkspaceStore;
