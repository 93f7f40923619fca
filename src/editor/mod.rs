//! Annotation editing state machine.
//!
//! The editor owns the mode, the prompt session and the shortcut table. The
//! mask set itself belongs to the active [`ImageData`], which is passed in to
//! every operation that reads or mutates it. Callers rebuild the compositor
//! layers and statistics after any mutating call.

mod backend;
mod mode;
mod session;
mod shortcuts;

pub use backend::{CandidateResponse, SegmentationBackend, UnavailableBackend};
pub use mode::{EditControls, EditMode};
pub use session::{Prompt, PromptLabel, PromptSession, RequestToken};
pub use shortcuts::{EditorAction, Key, Shortcut, ShortcutRegistry};

use crate::constants::{FOCUS_COLOR, REMOVE_COLOR};
use crate::error::EditorError;
use crate::model::{CategoryId, ImageData, Mask, MaskId, PROMPT_CATEGORY_ID, Taxonomy};

/// Outcome of a shortcut press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutOutcome {
    /// Nothing is bound to the key in the current mode
    Unbound,
    /// The editor carried out the action
    Handled(EditorAction),
    /// The action concerns the application (navigation, viewport, visibility)
    Forward(EditorAction),
}

/// Mode, selection and prompt-session controller.
#[derive(Debug, Clone)]
pub struct Editor {
    mode: EditMode,
    session: Option<PromptSession>,
    /// Token of the most recently started session
    last_token: RequestToken,
    shortcuts: ShortcutRegistry,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(ShortcutRegistry::with_defaults())
    }
}

impl Editor {
    pub fn new(shortcuts: ShortcutRegistry) -> Self {
        Self {
            mode: EditMode::Select,
            session: None,
            last_token: 0,
            shortcuts,
        }
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn controls(&self) -> EditControls {
        self.mode.controls()
    }

    pub fn session(&self) -> Option<&PromptSession> {
        self.session.as_ref()
    }

    pub fn shortcuts(&self) -> &ShortcutRegistry {
        &self.shortcuts
    }

    pub fn shortcuts_mut(&mut self) -> &mut ShortcutRegistry {
        &mut self.shortcuts
    }

    /// Whether the quadrat overlay is shown.
    pub fn quadrat_visible(&self) -> bool {
        self.mode == EditMode::DefineQuadrat
    }

    /// Fill colour for selected masks in the current mode.
    pub fn selection_color(&self) -> Option<[u8; 3]> {
        match self.mode {
            EditMode::Select => Some(FOCUS_COLOR),
            EditMode::Delete => Some(REMOVE_COLOR),
            EditMode::CreateMask | EditMode::DefineQuadrat => None,
        }
    }

    /// Fill colour of the candidate mask on the edit layer.
    pub fn candidate_color(&self, taxonomy: &Taxonomy) -> [u8; 3] {
        let category_id = self
            .session
            .as_ref()
            .map(PromptSession::category_id)
            .unwrap_or(PROMPT_CATEGORY_ID);
        taxonomy.fill_color(category_id)
    }

    fn require_mode(&self, expected: EditMode) -> Result<(), EditorError> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(EditorError::WrongMode {
                expected,
                actual: self.mode,
            })
        }
    }

    /// Switch mode. Entering any mode clears the selection and drops the
    /// prompt session.
    pub fn set_mode(
        &mut self,
        mode: EditMode,
        data: &mut ImageData,
        backend: &mut dyn SegmentationBackend,
    ) {
        data.clear_selection();
        self.drop_session(backend);
        if self.mode != mode {
            log::info!("Edit mode {} -> {}", self.mode.name(), mode.name());
        }
        self.mode = mode;
    }

    fn drop_session(&mut self, backend: &mut dyn SegmentationBackend) {
        if self.session.take().is_none() {
            return;
        }
        if let Err(e) = backend.clear_prompts() {
            log::warn!("Backend failed to clear prompts: {}", e);
        }
    }

    /// Toggle selection of every displayed mask under an image pixel.
    ///
    /// Returns the toggled mask ids.
    pub fn click(&mut self, data: &mut ImageData, x: u32, y: u32) -> Result<Vec<MaskId>, EditorError> {
        if !self.mode.selects_masks() {
            return Err(EditorError::WrongMode {
                expected: EditMode::Select,
                actual: self.mode,
            });
        }
        let hits = data.masks_at(x, y);
        for &id in &hits {
            if let Some(mask) = data.mask_mut(id) {
                mask.toggle_selected();
            }
        }
        log::debug!("Click at ({}, {}) toggled masks {:?}", x, y, hits);
        Ok(hits)
    }

    /// Assign a category.
    ///
    /// In select mode every selected mask is relabelled and the selection is
    /// cleared; the returned count is the number of relabelled masks. In
    /// create-mask mode the category is attached to the candidate instead.
    pub fn assign_category(
        &mut self,
        data: &mut ImageData,
        category_id: CategoryId,
    ) -> Result<usize, EditorError> {
        match self.mode {
            EditMode::Select => {
                let mut count = 0;
                for mask in data.masks_mut().iter_mut().filter(|m| m.is_selected()) {
                    mask.set_category_id(category_id);
                    mask.set_selected(false);
                    count += 1;
                }
                log::info!("Assigned category {} to {} masks", category_id, count);
                Ok(count)
            }
            EditMode::CreateMask => {
                self.start_session();
                if let Some(session) = self.session.as_mut() {
                    session.set_category_id(category_id);
                }
                Ok(0)
            }
            actual => Err(EditorError::WrongMode {
                expected: EditMode::Select,
                actual,
            }),
        }
    }

    /// Remove every selected mask. Valid in select and delete mode.
    pub fn remove_selected(&mut self, data: &mut ImageData) -> Result<usize, EditorError> {
        if !self.mode.selects_masks() {
            return Err(EditorError::WrongMode {
                expected: EditMode::Delete,
                actual: self.mode,
            });
        }
        let ids = data.selected_ids();
        let removed = data.remove_masks(&ids);
        log::info!("Removed {} masks from image {}", removed, data.index());
        Ok(removed)
    }

    /// Delete mode's confirm: remove every selected mask.
    pub fn commit_delete(&mut self, data: &mut ImageData) -> Result<usize, EditorError> {
        self.require_mode(EditMode::Delete)?;
        self.remove_selected(data)
    }

    fn start_session(&mut self) -> RequestToken {
        if let Some(session) = &self.session {
            return session.token();
        }
        self.last_token += 1;
        self.session = Some(PromptSession::new(self.last_token));
        self.last_token
    }

    /// Token of the live session, starting one if needed. Used by callers that
    /// issue backend requests themselves and report back through
    /// [`Editor::accept_response`].
    pub fn request_token(&mut self) -> Result<RequestToken, EditorError> {
        self.require_mode(EditMode::CreateMask)?;
        Ok(self.start_session())
    }

    /// Apply a backend response issued for `token`.
    ///
    /// Fails with [`EditorError::StaleResponse`] when the session it was
    /// issued for has since been reset, confirmed or left; the current token is
    /// 0 when no session is live. An empty prompt history ends the session.
    pub fn accept_response(
        &mut self,
        token: RequestToken,
        response: CandidateResponse,
        data: &ImageData,
    ) -> Result<(), EditorError> {
        let current = self.session.as_ref().map_or(0, PromptSession::token);
        if current == 0 || current != token {
            return Err(EditorError::StaleResponse { token, current });
        }

        let candidate = match response.candidate {
            Some(runs) => {
                let mask =
                    Mask::from_runs(0, PROMPT_CATEGORY_ID, runs, data.width(), data.height());
                mask.decoded()?;
                Some(mask)
            }
            None => None,
        };

        if response.prompt_history.is_empty() && candidate.is_none() {
            log::debug!("Prompt history empty, ending session {}", token);
            self.session = None;
            return Ok(());
        }
        if let Some(session) = self.session.as_mut() {
            session.apply(response.prompt_history, candidate);
        }
        Ok(())
    }

    /// Add a point prompt and fetch the updated candidate.
    ///
    /// On a backend failure or a malformed candidate the session is left
    /// exactly as it was.
    pub fn add_prompt(
        &mut self,
        backend: &mut dyn SegmentationBackend,
        data: &ImageData,
        x: u32,
        y: u32,
        label: PromptLabel,
    ) -> Result<(), EditorError> {
        self.require_mode(EditMode::CreateMask)?;
        let fresh = self.session.is_none();
        let token = self.start_session();
        let prompt = Prompt::new(x, y, label);
        let result = backend
            .create_or_update_mask(&[prompt])
            .map_err(EditorError::from)
            .and_then(|response| self.accept_response(token, response, data));
        if let Err(e) = &result {
            log::warn!("Prompt ({}, {}) failed: {}", x, y, e);
            if fresh {
                self.session = None;
            }
        }
        result
    }

    /// Undo the most recent prompt. A no-op without prompts.
    pub fn undo(
        &mut self,
        backend: &mut dyn SegmentationBackend,
        data: &ImageData,
    ) -> Result<(), EditorError> {
        self.require_mode(EditMode::CreateMask)?;
        let Some(token) = self
            .session
            .as_ref()
            .filter(|s| !s.prompts().is_empty())
            .map(PromptSession::token)
        else {
            return Ok(());
        };
        let response = backend.undo_last_prompt()?;
        self.accept_response(token, response, data)
    }

    /// Discard all prompts and the candidate.
    pub fn reset(&mut self, backend: &mut dyn SegmentationBackend) -> Result<(), EditorError> {
        self.require_mode(EditMode::CreateMask)?;
        if self.session.is_some() {
            backend.clear_prompts()?;
            self.session = None;
        }
        Ok(())
    }

    /// Commit the candidate into `data`, returning the new mask id.
    ///
    /// Without a chosen category the mask gets the predicted sentinel.
    pub fn confirm(
        &mut self,
        backend: &mut dyn SegmentationBackend,
        data: &mut ImageData,
    ) -> Result<MaskId, EditorError> {
        self.require_mode(EditMode::CreateMask)?;
        let category_id = match self.session.as_ref() {
            Some(session) if session.candidate().is_some() => session.category_id(),
            _ => return Err(EditorError::NoCandidate),
        };
        backend.confirm_mask()?;

        let candidate = self
            .session
            .take()
            .and_then(|mut session| session.take_candidate())
            .ok_or(EditorError::NoCandidate)?;
        let runs = candidate.runs().to_vec();
        let id = data.add_mask(runs, category_id);
        log::info!("Confirmed new mask {} in image {}", id, data.index());
        Ok(id)
    }

    /// Dispatch a key press through the shortcut table of the current mode.
    pub fn handle_shortcut(
        &mut self,
        shortcut: Shortcut,
        backend: &mut dyn SegmentationBackend,
        data: &mut ImageData,
    ) -> Result<ShortcutOutcome, EditorError> {
        let Some(action) = self.shortcuts.lookup(self.mode, shortcut) else {
            return Ok(ShortcutOutcome::Unbound);
        };
        log::debug!("Shortcut {} -> {}", shortcut, action.name());
        match action {
            EditorAction::RemoveSelection => {
                self.remove_selected(data)?;
            }
            EditorAction::CommitDelete => {
                self.commit_delete(data)?;
            }
            EditorAction::Undo => self.undo(backend, data)?,
            EditorAction::Reset => self.reset(backend)?,
            EditorAction::Confirm => {
                self.confirm(backend, data)?;
            }
            EditorAction::NextImage
            | EditorAction::PrevImage
            | EditorAction::ResetViewpoint
            | EditorAction::ToggleMasks => return Ok(ShortcutOutcome::Forward(action)),
        }
        Ok(ShortcutOutcome::Handled(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::model::PREDICTED_CORAL_ID;

    /// Backend that accumulates prompts and returns a candidate covering the
    /// first `prompt count` pixels.
    #[derive(Default)]
    struct FakeBackend {
        history: Vec<Prompt>,
        fail: bool,
        malformed: bool,
        cleared: usize,
        confirmed: usize,
    }

    impl FakeBackend {
        fn response(&self) -> CandidateResponse {
            let n = self.history.len() as u32;
            if self.malformed {
                return CandidateResponse {
                    candidate: Some(vec![0, 999]),
                    prompt_history: self.history.clone(),
                };
            }
            CandidateResponse {
                candidate: (n > 0).then(|| vec![0, n, 16 - n]),
                prompt_history: self.history.clone(),
            }
        }
    }

    impl SegmentationBackend for FakeBackend {
        fn create_or_update_mask(
            &mut self,
            prompts: &[Prompt],
        ) -> Result<CandidateResponse, BackendError> {
            if self.fail {
                return Err(BackendError::Timeout);
            }
            self.history.extend_from_slice(prompts);
            Ok(self.response())
        }

        fn undo_last_prompt(&mut self) -> Result<CandidateResponse, BackendError> {
            if self.fail {
                return Err(BackendError::Timeout);
            }
            self.history.pop();
            Ok(self.response())
        }

        fn clear_prompts(&mut self) -> Result<(), BackendError> {
            self.history.clear();
            self.cleared += 1;
            Ok(())
        }

        fn confirm_mask(&mut self) -> Result<(), BackendError> {
            self.history.clear();
            self.confirmed += 1;
            Ok(())
        }
    }

    fn data() -> ImageData {
        let mut data = ImageData::new(0, "reef.jpg", 4, 4);
        // left two columns
        data.push_mask(Mask::from_runs(0, 1, vec![0, 2, 2, 2, 2, 2, 2, 2, 2], 4, 4));
        // right two columns
        data.push_mask(Mask::from_runs(1, 3, vec![2, 2, 2, 2, 2, 2, 2, 2], 4, 4));
        data
    }

    fn create_mode(editor: &mut Editor, data: &mut ImageData, backend: &mut FakeBackend) {
        editor.set_mode(EditMode::CreateMask, data, backend);
    }

    #[test]
    fn test_click_toggles_selection() {
        let mut editor = Editor::default();
        let mut data = data();
        assert_eq!(editor.click(&mut data, 0, 0).unwrap(), vec![0]);
        assert!(data.mask(0).unwrap().is_selected());
        editor.click(&mut data, 0, 0).unwrap();
        assert!(!data.mask(0).unwrap().is_selected());
        assert!(editor.click(&mut data, 9, 9).unwrap().is_empty());
    }

    #[test]
    fn test_click_wrong_mode() {
        let mut editor = Editor::default();
        let mut data = data();
        let mut backend = FakeBackend::default();
        create_mode(&mut editor, &mut data, &mut backend);
        assert!(matches!(
            editor.click(&mut data, 0, 0),
            Err(EditorError::WrongMode { .. })
        ));
    }

    #[test]
    fn test_assign_category_clears_selection() {
        let mut editor = Editor::default();
        let mut data = data();
        editor.click(&mut data, 0, 0).unwrap();
        editor.click(&mut data, 3, 3).unwrap();
        assert_eq!(editor.assign_category(&mut data, 5).unwrap(), 2);
        assert_eq!(data.mask(0).unwrap().category_id(), 5);
        assert_eq!(data.mask(1).unwrap().category_id(), 5);
        assert!(data.selected_ids().is_empty());
    }

    #[test]
    fn test_mode_change_clears_selection_and_session() {
        let mut editor = Editor::default();
        let mut data = data();
        let mut backend = FakeBackend::default();
        editor.click(&mut data, 0, 0).unwrap();

        create_mode(&mut editor, &mut data, &mut backend);
        assert!(data.selected_ids().is_empty());
        assert!(editor.controls().undo);

        editor.add_prompt(&mut backend, &data, 1, 1, PromptLabel::Foreground).unwrap();
        assert!(editor.session().is_some());

        editor.set_mode(EditMode::Delete, &mut data, &mut backend);
        assert!(editor.session().is_none());
        assert_eq!(backend.cleared, 1);
        assert!(!editor.controls().undo);
        assert!(editor.controls().confirm);
    }

    #[test]
    fn test_prompt_undo_confirm_flow() {
        let mut editor = Editor::default();
        let mut data = data();
        let mut backend = FakeBackend::default();
        create_mode(&mut editor, &mut data, &mut backend);

        editor.add_prompt(&mut backend, &data, 1, 1, PromptLabel::Foreground).unwrap();
        editor.add_prompt(&mut backend, &data, 2, 2, PromptLabel::Background).unwrap();
        let session = editor.session().unwrap();
        assert_eq!(session.prompts().len(), 2);
        assert_eq!(session.candidate().unwrap().area(), 2);

        editor.undo(&mut backend, &data).unwrap();
        assert_eq!(editor.session().unwrap().prompts().len(), 1);
        assert_eq!(editor.session().unwrap().candidate().unwrap().area(), 1);

        let id = editor.confirm(&mut backend, &mut data).unwrap();
        assert_eq!(id, 2);
        assert_eq!(data.mask(id).unwrap().category_id(), PREDICTED_CORAL_ID);
        assert_eq!(data.mask(id).unwrap().runs(), &[0, 1, 15]);
        assert!(editor.session().is_none());
        assert_eq!(backend.confirmed, 1);
    }

    #[test]
    fn test_confirm_uses_chosen_category() {
        let mut editor = Editor::default();
        let mut data = data();
        let mut backend = FakeBackend::default();
        create_mode(&mut editor, &mut data, &mut backend);

        editor.add_prompt(&mut backend, &data, 0, 0, PromptLabel::Foreground).unwrap();
        editor.assign_category(&mut data, 4).unwrap();
        let id = editor.confirm(&mut backend, &mut data).unwrap();
        assert_eq!(data.mask(id).unwrap().category_id(), 4);
    }

    #[test]
    fn test_undo_to_empty_ends_session() {
        let mut editor = Editor::default();
        let mut data = data();
        let mut backend = FakeBackend::default();
        create_mode(&mut editor, &mut data, &mut backend);

        editor.add_prompt(&mut backend, &data, 0, 0, PromptLabel::Foreground).unwrap();
        editor.undo(&mut backend, &data).unwrap();
        assert!(editor.session().is_none());
        // further undo is a no-op
        editor.undo(&mut backend, &data).unwrap();
    }

    #[test]
    fn test_confirm_without_candidate() {
        let mut editor = Editor::default();
        let mut data = data();
        let mut backend = FakeBackend::default();
        create_mode(&mut editor, &mut data, &mut backend);
        assert_eq!(editor.confirm(&mut backend, &mut data), Err(EditorError::NoCandidate));
        assert_eq!(data.masks().len(), 2);
    }

    #[test]
    fn test_backend_failure_leaves_session_unchanged() {
        let mut editor = Editor::default();
        let mut data = data();
        let mut backend = FakeBackend::default();
        create_mode(&mut editor, &mut data, &mut backend);
        editor.add_prompt(&mut backend, &data, 0, 0, PromptLabel::Foreground).unwrap();

        backend.fail = true;
        let err = editor
            .add_prompt(&mut backend, &data, 1, 1, PromptLabel::Foreground)
            .unwrap_err();
        assert_eq!(err, EditorError::Backend(BackendError::Timeout));
        assert_eq!(editor.mode(), EditMode::CreateMask);
        assert_eq!(editor.session().unwrap().prompts().len(), 1);

        assert!(editor.undo(&mut backend, &data).is_err());
        assert_eq!(editor.session().unwrap().prompts().len(), 1);
    }

    #[test]
    fn test_stale_response_rejected() {
        let mut editor = Editor::default();
        let mut data = data();
        let mut backend = FakeBackend::default();
        create_mode(&mut editor, &mut data, &mut backend);

        let token = editor.request_token().unwrap();
        editor.reset(&mut backend).unwrap();
        let late = CandidateResponse {
            candidate: Some(vec![0, 16]),
            prompt_history: vec![Prompt::new(0, 0, PromptLabel::Foreground)],
        };
        assert_eq!(
            editor.accept_response(token, late.clone(), &data),
            Err(EditorError::StaleResponse { token, current: 0 })
        );

        let fresh = editor.request_token().unwrap();
        assert_ne!(fresh, token);
        assert!(editor.accept_response(token, late.clone(), &data).is_err());
        editor.accept_response(fresh, late, &data).unwrap();
        assert!(editor.session().unwrap().candidate().is_some());
    }

    #[test]
    fn test_malformed_candidate_rejected() {
        let mut editor = Editor::default();
        let mut data = data();
        let mut backend = FakeBackend::default();
        create_mode(&mut editor, &mut data, &mut backend);

        let token = editor.request_token().unwrap();
        let bad = CandidateResponse {
            candidate: Some(vec![0, 99]),
            prompt_history: vec![Prompt::new(0, 0, PromptLabel::Foreground)],
        };
        assert!(matches!(
            editor.accept_response(token, bad, &data),
            Err(EditorError::InvalidCandidate(_))
        ));
        assert!(editor.session().unwrap().candidate().is_none());
    }

    #[test]
    fn test_malformed_first_prompt_leaves_no_session() {
        let mut editor = Editor::default();
        let mut data = data();
        let mut backend = FakeBackend {
            malformed: true,
            ..FakeBackend::default()
        };
        create_mode(&mut editor, &mut data, &mut backend);

        let result = editor.add_prompt(&mut backend, &data, 1, 1, PromptLabel::Foreground);
        assert!(matches!(result, Err(EditorError::InvalidCandidate(_))));
        assert!(editor.session().is_none());
        assert_eq!(editor.mode(), EditMode::CreateMask);
    }

    #[test]
    fn test_delete_mode_commit() {
        let mut editor = Editor::default();
        let mut data = data();
        let mut backend = FakeBackend::default();
        editor.set_mode(EditMode::Delete, &mut data, &mut backend);
        editor.click(&mut data, 3, 0).unwrap();
        assert_eq!(editor.selection_color(), Some(REMOVE_COLOR));
        assert_eq!(editor.commit_delete(&mut data).unwrap(), 1);
        assert!(data.mask(1).is_none());
        assert!(data.mask(0).is_some());
    }

    #[test]
    fn test_shortcuts_only_fire_in_their_mode() {
        let mut editor = Editor::default();
        let mut data = data();
        let mut backend = FakeBackend::default();

        // Ctrl+Z means nothing in select mode
        assert_eq!(
            editor.handle_shortcut(Shortcut::ctrl('z'), &mut backend, &mut data).unwrap(),
            ShortcutOutcome::Unbound
        );

        editor.click(&mut data, 0, 0).unwrap();
        assert_eq!(
            editor.handle_shortcut(Shortcut::char('r'), &mut backend, &mut data).unwrap(),
            ShortcutOutcome::Handled(EditorAction::RemoveSelection)
        );
        assert_eq!(data.masks().len(), 1);

        create_mode(&mut editor, &mut data, &mut backend);
        editor.add_prompt(&mut backend, &data, 0, 0, PromptLabel::Foreground).unwrap();
        assert_eq!(
            editor.handle_shortcut(Shortcut::char('r'), &mut backend, &mut data).unwrap(),
            ShortcutOutcome::Handled(EditorAction::Reset)
        );
        assert!(editor.session().is_none());
        assert_eq!(data.masks().len(), 1);

        assert_eq!(
            editor.handle_shortcut(Shortcut::char('d'), &mut backend, &mut data).unwrap(),
            ShortcutOutcome::Forward(EditorAction::NextImage)
        );
    }

    #[test]
    fn test_candidate_color() {
        let mut taxonomy = Taxonomy::new();
        taxonomy.add_coral_category("Acropora").unwrap();
        let mut editor = Editor::default();
        let mut data = data();
        let mut backend = FakeBackend::default();
        create_mode(&mut editor, &mut data, &mut backend);
        assert_eq!(editor.candidate_color(&taxonomy), taxonomy.fill_color(PROMPT_CATEGORY_ID));
        editor.assign_category(&mut data, 1).unwrap();
        assert_eq!(editor.candidate_color(&taxonomy), taxonomy.fill_color(1));
    }
}
