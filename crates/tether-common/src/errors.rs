use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("frame decode error: {0}")]
    Decode(String),

    #[error("submission rejected: {0}")]
    InvalidSubmission(String),

    #[error("request failed: {0}")]
    Request(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("archive io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("no platform data directory available")]
    NoDataDir,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TetherError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_error_display() {
        let err = SyncError::ConnectFailed("connection refused".into());
        assert_eq!(err.to_string(), "connect failed: connection refused");

        let err = SyncError::Stream("unexpected eof".into());
        assert_eq!(err.to_string(), "stream error: unexpected eof");

        let err = SyncError::Decode("missing field `message`".into());
        assert_eq!(err.to_string(), "frame decode error: missing field `message`");

        let err = SyncError::InvalidSubmission("empty message".into());
        assert_eq!(err.to_string(), "submission rejected: empty message");
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");
    }

    #[test]
    fn tether_error_from_sync() {
        let sync_err = SyncError::Request("timeout".into());
        let err: TetherError = sync_err.into();
        assert!(matches!(err, TetherError::Sync(_)));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn tether_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: TetherError = io_err.into();
        assert!(matches!(err, TetherError::Io(_)));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn persist_error_from_serde() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json");
        let err: PersistError = bad.unwrap_err().into();
        assert!(matches!(err, PersistError::Encode(_)));
    }
}
