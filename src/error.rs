use std::path::PathBuf;

use crate::config::ConfigError;

/// Result alias carrying [`OrchestraError`].
pub type Result<T> = std::result::Result<T, OrchestraError>;

/// Errors surfaced by the control side of the engine.
///
/// Nothing here is produced by the render path. Snapshot fields that are
/// malformed or out of range are dropped or clamped instead of reported.
#[derive(Debug, thiserror::Error)]
pub enum OrchestraError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot document is not JSON at all.
    #[error("snapshot is not valid JSON: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("failed to spawn thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("audio device: {0}")]
    Device(String),

    #[error("wav encoding failed: {0}")]
    Wav(#[from] hound::Error),

    /// A data source could not produce a snapshot this cycle.
    #[error("data source `{name}` failed: {reason}")]
    Source { name: String, reason: String },
}

impl OrchestraError {
    pub fn device<T: Into<String>>(msg: T) -> Self {
        OrchestraError::Device(msg.into())
    }

    pub fn source_failed<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        OrchestraError::Source {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_the_path() {
        let err = OrchestraError::Io {
            path: PathBuf::from("/tmp/missing.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let msg = format!("{err}");
        assert!(msg.contains("/tmp/missing.json"), "got: {msg}");
        assert!(msg.contains("gone"), "got: {msg}");
    }

    #[test]
    fn source_error_display() {
        let err = OrchestraError::source_failed("sidc", "timed out");
        assert_eq!(format!("{err}"), "data source `sidc` failed: timed out");
    }
}
