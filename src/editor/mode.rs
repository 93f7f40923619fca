//! Editing modes.

use serde::{Deserialize, Serialize};

/// Interaction mode of the annotation editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EditMode {
    /// Select masks and assign categories
    #[default]
    Select,
    /// Create a new mask from point prompts
    CreateMask,
    /// Select masks and delete them
    Delete,
    /// Show the quadrat overlay; no editing
    DefineQuadrat,
}

/// Which edit buttons a mode shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditControls {
    pub undo: bool,
    pub reset: bool,
    pub confirm: bool,
}

impl EditMode {
    /// Get the display name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            EditMode::Select => "Select",
            EditMode::CreateMask => "Create Mask",
            EditMode::Delete => "Delete",
            EditMode::DefineQuadrat => "Define Quadrat",
        }
    }

    /// Get all modes.
    pub fn all() -> &'static [EditMode] {
        &[
            EditMode::Select,
            EditMode::CreateMask,
            EditMode::Delete,
            EditMode::DefineQuadrat,
        ]
    }

    /// Check if clicks toggle mask selection in this mode.
    pub fn selects_masks(&self) -> bool {
        matches!(self, EditMode::Select | EditMode::Delete)
    }

    /// Buttons shown while in this mode.
    pub fn controls(&self) -> EditControls {
        match self {
            EditMode::CreateMask => EditControls {
                undo: true,
                reset: true,
                confirm: true,
            },
            EditMode::Delete => EditControls {
                confirm: true,
                ..EditControls::default()
            },
            EditMode::Select | EditMode::DefineQuadrat => EditControls::default(),
        }
    }
}
