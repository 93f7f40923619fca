//! Prompt session state for interactive mask creation.

use serde::{Deserialize, Serialize};

use crate::model::{CategoryId, Mask, PROMPT_CATEGORY_ID};

/// Identifies the session a backend request was issued for.
pub type RequestToken = u64;

/// Whether a prompt marks foreground or background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PromptLabel {
    /// Label 0: the point is outside the object
    Background,
    /// Label 1: the point is on the object
    Foreground,
}

impl TryFrom<u8> for PromptLabel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PromptLabel::Background),
            1 => Ok(PromptLabel::Foreground),
            other => Err(format!("invalid prompt label {}", other)),
        }
    }
}

impl From<PromptLabel> for u8 {
    fn from(label: PromptLabel) -> Self {
        match label {
            PromptLabel::Background => 0,
            PromptLabel::Foreground => 1,
        }
    }
}

/// A single point prompt in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub x: u32,
    pub y: u32,
    pub label: PromptLabel,
}

impl Prompt {
    pub fn new(x: u32, y: u32, label: PromptLabel) -> Self {
        Self { x, y, label }
    }
}

/// Prompt history and candidate of one mask-creation session.
///
/// The prompt list mirrors the backend's history and is only replaced from a
/// backend response.
#[derive(Debug, Clone)]
pub struct PromptSession {
    token: RequestToken,
    prompts: Vec<Prompt>,
    candidate: Option<Mask>,
    category_id: CategoryId,
}

impl PromptSession {
    pub fn new(token: RequestToken) -> Self {
        Self {
            token,
            prompts: Vec::new(),
            candidate: None,
            category_id: PROMPT_CATEGORY_ID,
        }
    }

    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn candidate(&self) -> Option<&Mask> {
        self.candidate.as_ref()
    }

    /// Category the candidate will be committed with.
    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    pub fn set_category_id(&mut self, category_id: CategoryId) {
        self.category_id = category_id;
        if let Some(candidate) = self.candidate.as_mut() {
            candidate.set_category_id(category_id);
        }
    }

    /// Check whether the session has neither prompts nor a candidate.
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty() && self.candidate.is_none()
    }

    /// Replace the mirrored history and candidate with a backend response.
    pub fn apply(&mut self, prompts: Vec<Prompt>, candidate: Option<Mask>) {
        self.prompts = prompts;
        self.candidate = candidate.map(|mut mask| {
            mask.set_category_id(self.category_id);
            mask
        });
    }

    /// Take the candidate out of the session.
    pub fn take_candidate(&mut self) -> Option<Mask> {
        self.candidate.take()
    }
}
