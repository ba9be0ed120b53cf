//! Error types for OBI Scan
//!
//! Provides error handling for:
//! - Scan configuration errors (mismatched coupled dimensions, invalid coordinates)
//! - Missing lifecycle hooks
//! - Registry lookups
//! - File output

use std::path::{Path, PathBuf};

use obi_model::{EditError, FormError, HashError, LocationPath};

use crate::coordinate::ExecutionMode;

/// Main scan error type
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Coupled scan dimensions disagree on their candidate count
    #[error(
        "coupled scan requires equal candidate counts: {reference} has {expected}, {location} has {found}"
    )]
    CoupledLengthMismatch {
        /// First swept parameter
        reference: LocationPath,
        /// Its candidate count
        expected: usize,
        /// Offending parameter
        location: LocationPath,
        /// Its candidate count
        found: usize,
    },

    /// A coordinate's edits could not be applied
    #[error("coordinate {idx}: {source}")]
    CoordinateEdit {
        idx: usize,
        #[source]
        source: EditError,
    },

    /// A resolved coordinate does not deserialize as the form
    #[error("coordinate {idx} is not a valid {type_name}: {source}")]
    CoordinateCast {
        idx: usize,
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A resolved coordinate violates a block constraint
    #[error("coordinate {idx} failed validation: {source}")]
    CoordinateValidation {
        idx: usize,
        #[source]
        source: FormError,
    },

    /// Single coordinate type lacks the requested hook
    #[error("{hook} is not implemented for {type_name}")]
    NotImplemented {
        type_name: &'static str,
        hook: ExecutionMode,
    },

    /// Type registry failure
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A serialized document does not match the model it claims to be
    #[error("invalid {what}: {source}")]
    Deserialization {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML document could not be parsed
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Fingerprint computation failed
    #[error("fingerprint failed: {0}")]
    Hash(#[from] HashError),

    /// File system failure
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A lifecycle hook failed
    #[error("{type_name} task failed: {message}")]
    Task {
        type_name: &'static str,
        message: String,
    },
}

impl ScanError {
    /// Wrap an I/O error with the path involved
    #[inline]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Check if the error stems from the scan configuration itself
    ///
    /// Configuration errors abort the scan; retrying cannot help.
    #[inline]
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::CoupledLengthMismatch { .. }
                | Self::CoordinateEdit { .. }
                | Self::CoordinateCast { .. }
                | Self::CoordinateValidation { .. }
                | Self::Registry(_)
                | Self::Deserialization { .. }
        )
    }

    /// Index of the coordinate the error belongs to, if any
    #[inline]
    #[must_use]
    pub fn coordinate_index(&self) -> Option<usize> {
        match self {
            Self::CoordinateEdit { idx, .. }
            | Self::CoordinateCast { idx, .. }
            | Self::CoordinateValidation { idx, .. } => Some(*idx),
            _ => None,
        }
    }
}

/// Type registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A type name was registered twice
    #[error("type '{0}' is already registered")]
    Duplicate(String),

    /// No registered type carries this name
    #[error("unknown type '{0}'")]
    UnknownType(String),

    /// A bare form document was given where a scan or coordinate is expected
    #[error("'{0}' is a form; wrap it in a scan or use deserialize_form")]
    UnwrappedForm(String),

    /// Document lacks a type tag
    #[error("document has no 'type' tag")]
    MissingTag,

    /// Document carries a different type than expected
    #[error("expected type '{expected}', found '{found}'")]
    TypeMismatch { expected: String, found: String },
}
