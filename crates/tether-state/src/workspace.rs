//! Session workspace store: session id, connection status, file snapshot.

use tether_common::{ConnectionStatus, FileEntry, FileNode, SessionId};

/// Holds the active session's identity, connection health, and the file
/// listing the server has reported for it.
///
/// File and tree updates are wholesale, idempotent replacements: the
/// transport delivers frames in send order per channel, so the last
/// delivered snapshot always wins and re-applying an identical payload is
/// a no-op in effect.
#[derive(Debug)]
pub struct WorkspaceStore {
    session_id: SessionId,
    status: ConnectionStatus,
    files: Vec<FileEntry>,
    tree: Option<FileNode>,
    new_files: Vec<String>,
}

impl WorkspaceStore {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            status: ConnectionStatus::Disconnected,
            files: Vec::new(),
            tree: None,
            new_files: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ConnectionStatus) {
        self.status = status;
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn tree(&self) -> Option<&FileNode> {
        self.tree.as_ref()
    }

    /// Paths the server flagged as freshly created in the latest file
    /// snapshot. Valid until the next snapshot replaces it.
    pub fn new_files(&self) -> &[String] {
        &self.new_files
    }

    /// Replace the flat file list with an authoritative server snapshot.
    /// `new_files` highlights entries the server reports as just created.
    pub fn replace_files(&mut self, files: Vec<FileEntry>, new_files: Vec<String>) {
        self.files = files;
        self.new_files = new_files;
    }

    /// Replace the directory tree and re-derive the flat list from its
    /// file leaves. Tree snapshots carry no created-file hints.
    pub fn replace_tree(&mut self, tree: FileNode) {
        self.files = tree.flatten();
        self.tree = Some(tree);
        self.new_files.clear();
    }

    /// Point the store at a different session, dropping all file state.
    /// Connection status is left alone; the channel manager owns it.
    pub fn reset(&mut self, session_id: SessionId) {
        self.session_id = session_id;
        self.files.clear();
        self.tree = None;
        self.new_files.clear();
    }
}
