//! Error types shared by the core services.

use thiserror::Error;

use crate::editor::EditMode;
use crate::model::CategoryId;

/// Errors raised while decoding a run-length encoded mask.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RleError {
    /// The runs do not add up to the declared pixel count.
    #[error("Malformed run length: runs cover {actual} pixels, expected {expected}")]
    MalformedRunLength {
        /// `width * height` of the target buffer
        expected: usize,
        /// Sum of the runs
        actual: usize,
    },
}

/// Errors from the inference backend or another external collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request did not complete in time.
    #[error("Backend request timed out")]
    Timeout,

    /// The response could not be interpreted.
    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    /// No backend is reachable.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors from taxonomy edits. Taxonomy edits are all-or-nothing: when one of
/// these is returned, nothing was changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaxonomyError {
    /// A category with this display name already exists.
    #[error("Category name '{0}' already exists")]
    DuplicateCategoryName(String),

    /// The category can never be removed.
    #[error("Category {0} is protected and cannot be removed")]
    ProtectedCategory(CategoryId),

    /// The operation is not valid for this category.
    #[error("Invalid state for category {id}: {reason}")]
    InvalidCategoryState {
        /// Offending category
        id: CategoryId,
        /// What was wrong
        reason: String,
    },

    /// A mask still references the category or its paired variant.
    #[error("Category {category_id} is still used by image {image_index}")]
    CategoryInUse {
        /// The referenced category id
        category_id: CategoryId,
        /// Index of the image holding the reference
        image_index: usize,
    },

    /// No category with this id.
    #[error("Unknown category {0}")]
    UnknownCategory(CategoryId),

    /// The usage query against other images failed.
    #[error("Category usage query failed: {0}")]
    UsageQuery(#[from] BackendError),
}

/// Errors from the editing state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// The operation is not available in the current mode.
    #[error("Operation requires {expected:?} mode, current mode is {actual:?}")]
    WrongMode {
        /// Mode the operation needs
        expected: EditMode,
        /// Mode the editor is in
        actual: EditMode,
    },

    /// Confirm was requested without a candidate mask.
    #[error("No candidate mask to confirm")]
    NoCandidate,

    /// A backend response arrived for a session that no longer exists.
    #[error("Stale response for request {token}, current request is {current}")]
    StaleResponse {
        /// Token the response was issued for
        token: u64,
        /// Token of the live session
        current: u64,
    },

    /// The candidate returned by the backend could not be decoded.
    #[error("Candidate mask is invalid: {0}")]
    InvalidCandidate(#[from] RleError),

    /// The backend call failed; mode and session are unchanged.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Errors surfaced by the application composition root.
#[derive(Error, Debug)]
pub enum AppError {
    /// Reading or writing the project failed.
    #[error(transparent)]
    Format(#[from] crate::format::FormatError),

    /// Loading or saving the configuration failed.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// A taxonomy edit was refused.
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),

    /// An editing operation was refused.
    #[error(transparent)]
    Editor(#[from] EditorError),

    /// The operation needs an open image but the project has none.
    #[error("No image is open")]
    NoImage,
}
