//! Collaborator errors

use std::path::{Path, PathBuf};

use obi_scan::ScanError;

/// Errors from the entity store, the job service or the launched task
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Entity does not exist
    #[error("{entity_type} '{entity_id}' not found")]
    NotFound { entity_type: String, entity_id: String },

    /// Asset does not exist on the entity
    #[error("asset '{asset_id}' not found on {entity_type} '{entity_id}'")]
    AssetNotFound {
        entity_type: String,
        entity_id: String,
        asset_id: String,
    },

    /// Job service answered with a non-success status
    #[error("job submission rejected with status {status}: {message}")]
    JobRejected { status: u16, message: String },

    /// Job service answered without a job id
    #[error("job service response has no id: {0}")]
    MissingJobId(String),

    /// Local file system failure
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stored document is not valid JSON
    #[error("invalid document: {0}")]
    Json(#[from] serde_json::Error),

    /// The launched scan or coordinate failed
    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl ClientError {
    /// Wrap an I/O error with the path involved
    #[inline]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Check if the error came from a collaborator rather than the task
    #[inline]
    #[must_use]
    pub fn is_collaborator_error(&self) -> bool {
        !matches!(self, Self::Scan(_))
    }
}
