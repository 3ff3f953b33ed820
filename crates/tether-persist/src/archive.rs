//! JSON-on-disk session archive with a capped metadata registry.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use tether_common::{PersistError, SessionId, SessionMeta, SessionSnapshot};

/// Registry keeps at most this many sessions unless overridden.
pub const DEFAULT_SESSION_CAP: usize = 20;

/// Stores one `<id>.json` blob per session plus an `index.json` registry
/// ordered most-recently-updated first.
///
/// Corrupt or missing blobs are treated as absent so a bad snapshot can
/// never wedge a session switch.
pub struct SessionArchive {
    root: PathBuf,
    cap: usize,
}

impl SessionArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cap: DEFAULT_SESSION_CAP,
        }
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    /// Platform default: `<data_dir>/tether/sessions`.
    pub fn default_root() -> Result<PathBuf, PersistError> {
        let data_dir = dirs::data_dir().ok_or(PersistError::NoDataDir)?;
        Ok(data_dir.join("tether").join("sessions"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, id: &SessionId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    /// Write a session snapshot to its blob file.
    pub fn save(&self, id: &SessionId, snapshot: &SessionSnapshot) -> Result<(), PersistError> {
        std::fs::create_dir_all(&self.root)?;
        let json = serde_json::to_string(snapshot)?;
        std::fs::write(self.blob_path(id), json)?;
        debug!(session = %id, messages = snapshot.messages.len(), "session snapshot saved");
        Ok(())
    }

    /// Read a session snapshot back, or `None` if it is missing or corrupt.
    pub fn load(&self, id: &SessionId) -> Option<SessionSnapshot> {
        let path = self.blob_path(id);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(session = %id, error = %e, "discarding corrupt session snapshot");
                None
            }
        }
    }

    /// Purge a session: its blob and its registry entry.
    pub fn delete(&self, id: &SessionId) -> Result<(), PersistError> {
        match std::fs::remove_file(self.blob_path(id)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut index = self.load_index();
        index.retain(|m| &m.id != id);
        self.save_index(&index)?;
        debug!(session = %id, "session purged");
        Ok(())
    }

    /// Upsert a registry entry: move it to the most-recently-updated
    /// position and evict the least-recently-updated beyond the cap.
    /// Evicted sessions lose their blobs as well.
    pub fn upsert_meta(&self, meta: SessionMeta) -> Result<(), PersistError> {
        std::fs::create_dir_all(&self.root)?;

        let mut index = self.load_index();
        index.retain(|m| m.id != meta.id);
        index.insert(0, meta);

        for evicted in index.split_off(self.cap.min(index.len())) {
            warn!(session = %evicted.id, "evicting session beyond registry cap");
            match std::fs::remove_file(self.blob_path(&evicted.id)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.save_index(&index)
    }

    /// Registry entries, most-recently-updated first.
    pub fn sessions(&self) -> Vec<SessionMeta> {
        self.load_index()
    }

    fn load_index(&self) -> Vec<SessionMeta> {
        let content = match std::fs::read_to_string(self.index_path()) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&content) {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "discarding corrupt session index");
                Vec::new()
            }
        }
    }

    fn save_index(&self, index: &[SessionMeta]) -> Result<(), PersistError> {
        let json = serde_json::to_string(index)?;
        std::fs::write(self.index_path(), json)?;
        Ok(())
    }
}
