//! Error types for project file operations.

use thiserror::Error;

use crate::model::CategoryId;

/// Errors that can occur while reading or writing a project file.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid format structure or content
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },

    /// An annotation references a category the file does not define
    #[error("Annotation {annotation_id} references unknown category {category_id}")]
    UnknownCategory {
        /// The offending annotation
        annotation_id: u64,
        /// The missing category ID
        category_id: CategoryId,
    },

    /// Requested image index is past the end of the project
    #[error("Image index {index} out of range (project has {count} images)")]
    ImageIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of images in the project
        count: usize,
    },

    /// Version mismatch between expected and found
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version string
        expected: String,
        /// Found version string
        found: String,
    },
}

impl FormatError {
    /// Create an invalid format error with a message.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}
