//! Seam to the segmentation inference backend.
//!
//! The backend owns the prompt history of the active session; the editor only
//! mirrors what each response reports.

use serde::{Deserialize, Serialize};

use crate::editor::session::Prompt;
use crate::error::BackendError;

/// Backend reply to a prompt change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CandidateResponse {
    /// Runs of the candidate mask over the whole image, if there is one
    pub candidate: Option<Vec<u32>>,
    /// Full prompt history after the change
    pub prompt_history: Vec<Prompt>,
}

/// Interactive segmentation service.
///
/// Calls for one session are issued one at a time; each depends on the
/// history left by the previous one.
pub trait SegmentationBackend {
    /// Add prompts to the session and return the new candidate.
    fn create_or_update_mask(&mut self, prompts: &[Prompt])
    -> Result<CandidateResponse, BackendError>;

    /// Drop the most recent prompt and return the candidate for the rest.
    fn undo_last_prompt(&mut self) -> Result<CandidateResponse, BackendError>;

    /// Discard the whole prompt history.
    fn clear_prompts(&mut self) -> Result<(), BackendError>;

    /// Acknowledge that the current candidate was committed.
    fn confirm_mask(&mut self) -> Result<(), BackendError>;
}

/// Backend used when no inference service is configured; every request fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableBackend;

impl SegmentationBackend for UnavailableBackend {
    fn create_or_update_mask(
        &mut self,
        _prompts: &[Prompt],
    ) -> Result<CandidateResponse, BackendError> {
        Err(BackendError::Unavailable("no segmentation backend configured".to_string()))
    }

    fn undo_last_prompt(&mut self) -> Result<CandidateResponse, BackendError> {
        Err(BackendError::Unavailable("no segmentation backend configured".to_string()))
    }

    fn clear_prompts(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn confirm_mask(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
}
