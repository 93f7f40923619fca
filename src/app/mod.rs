//! CMAT application state.
//!
//! [`CmatApp`] owns every service of an annotation session: the project, the
//! taxonomy, the active image, the editor, the compositor and the
//! segmentation backend. All of them are constructed here and passed by
//! reference to each other; nothing is global.
//!
//! Every operation that changes masks, categories or selection finishes with
//! [`CmatApp::refresh`], which re-applies the display filter and rebuilds the
//! overlay layers and statistics.

use image::RgbaImage;

use crate::config::AppConfig;
use crate::editor::{
    CandidateResponse, EditControls, EditMode, Editor, EditorAction, PromptLabel,
    SegmentationBackend, Shortcut, ShortcutOutcome, UnavailableBackend,
};
use crate::error::AppError;
use crate::model::{CategoryId, DisplayFilter, HealthStatus, ImageData, MaskId, Taxonomy};
use crate::project::Project;
use crate::render::MaskCompositor;
use crate::stats::Statistics;

#[cfg(test)]
mod tests;

/// Which pointer button produced a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Select, or add a foreground prompt
    Primary,
    /// Add a background prompt
    Secondary,
}

/// The annotation session.
pub struct CmatApp {
    config: AppConfig,
    project: Project,
    taxonomy: Taxonomy,
    /// The open image, if the project has any
    data: Option<ImageData>,
    editor: Editor,
    compositor: MaskCompositor,
    backend: Box<dyn SegmentationBackend>,
    statistics: Statistics,
    canvas_size: (u32, u32),
}

impl CmatApp {
    /// Build the session and open the project's last active image.
    pub fn new(
        config: AppConfig,
        project: Project,
        backend: Box<dyn SegmentationBackend>,
    ) -> Result<Self, AppError> {
        let prefs = &config.preferences;
        let compositor = MaskCompositor::new(1, 1)
            .with_opacity(prefs.mask_opacity, prefs.edit_mask_opacity);
        let editor = Editor::new(config.shortcut_registry());

        let mut app = Self {
            taxonomy: project.taxonomy(),
            project,
            data: None,
            editor,
            compositor,
            backend,
            statistics: Statistics::default(),
            canvas_size: (0, 0),
            config,
        };

        if app.project.image_count() > 0 {
            let index = app.project.active_index();
            app.load_image(index)?;
        }
        log::info!(
            "Session ready: {} images, {} categories",
            app.project.image_count(),
            app.taxonomy.len()
        );
        Ok(app)
    }

    /// A session without a segmentation backend.
    pub fn without_backend(config: AppConfig, project: Project) -> Result<Self, AppError> {
        Self::new(config, project, Box::new(UnavailableBackend))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn image(&self) -> Option<&ImageData> {
        self.data.as_ref()
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn compositor(&self) -> &MaskCompositor {
        &self.compositor
    }

    /// Statistics of the open image, as of the last refresh.
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn mode(&self) -> EditMode {
        self.editor.mode()
    }

    /// Edit buttons to show for the current mode.
    pub fn controls(&self) -> EditControls {
        self.editor.controls()
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    fn load_image(&mut self, index: usize) -> Result<(), AppError> {
        let policy = self.config.preferences.rle_policy;
        let data = self.project.open_image(index, policy)?;
        self.compositor.resize(data.width(), data.height());
        self.data = Some(data);
        if self.canvas_size != (0, 0) {
            self.compositor
                .reset_viewpoint(self.canvas_size.0, self.canvas_size.1);
        }
        self.refresh();
        Ok(())
    }

    /// Write the open image back into the project.
    fn store_active(&mut self) -> Result<(), AppError> {
        if let Some(data) = self.data.as_mut() {
            data.clear_selection();
            self.project.store_image(data)?;
        }
        Ok(())
    }

    /// Leave the open image for `index`. The prompt session is dropped and the
    /// masks are stored; the edit mode is kept.
    pub fn open_image(&mut self, index: usize) -> Result<(), AppError> {
        let index = self.project.jump_index(index)?;
        if let Some(data) = self.data.as_mut() {
            let mode = self.editor.mode();
            self.editor.set_mode(mode, data, self.backend.as_mut());
        }
        self.store_active()?;
        self.load_image(index)
    }

    /// Go to the next image; stays on the last one.
    pub fn next_image(&mut self) -> Result<usize, AppError> {
        let index = self.project.next_index();
        if index != self.project.active_index() {
            self.open_image(index)?;
        }
        Ok(index)
    }

    /// Go to the previous image; stays on the first one.
    pub fn prev_image(&mut self) -> Result<usize, AppError> {
        let index = self.project.prev_index();
        if index != self.project.active_index() {
            self.open_image(index)?;
        }
        Ok(index)
    }

    // =========================================================================
    // Editing
    // =========================================================================

    pub fn set_mode(&mut self, mode: EditMode) -> Result<(), AppError> {
        let data = self.data.as_mut().ok_or(AppError::NoImage)?;
        self.editor.set_mode(mode, data, self.backend.as_mut());
        self.refresh();
        Ok(())
    }

    /// Handle a click at an image pixel.
    ///
    /// Select and delete mode toggle the masks under the pixel; create-mask
    /// mode adds a prompt (foreground for the primary button). Other modes
    /// ignore clicks.
    pub fn click_image(&mut self, x: u32, y: u32, button: PointerButton) -> Result<(), AppError> {
        let data = self.data.as_mut().ok_or(AppError::NoImage)?;
        match self.editor.mode() {
            EditMode::Select | EditMode::Delete => {
                self.editor.click(data, x, y)?;
            }
            EditMode::CreateMask => {
                let label = match button {
                    PointerButton::Primary => PromptLabel::Foreground,
                    PointerButton::Secondary => PromptLabel::Background,
                };
                self.editor
                    .add_prompt(self.backend.as_mut(), data, x, y, label)?;
            }
            EditMode::DefineQuadrat => return Ok(()),
        }
        self.refresh();
        Ok(())
    }

    /// Handle a click at a canvas pixel; clicks outside the image are ignored.
    pub fn click_canvas(
        &mut self,
        canvas_x: f32,
        canvas_y: f32,
        button: PointerButton,
    ) -> Result<(), AppError> {
        match self.compositor.canvas_pixel_to_image_pixel(canvas_x, canvas_y) {
            Some((x, y)) => self.click_image(x, y, button),
            None => Ok(()),
        }
    }

    /// Assign a category to the selection, or to the candidate while creating.
    pub fn assign_category(&mut self, category_id: CategoryId) -> Result<usize, AppError> {
        self.taxonomy.require(category_id)?;
        let data = self.data.as_mut().ok_or(AppError::NoImage)?;
        let count = self.editor.assign_category(data, category_id)?;
        self.refresh();
        Ok(count)
    }

    /// Delete mode's confirm.
    pub fn commit_delete(&mut self) -> Result<usize, AppError> {
        let data = self.data.as_mut().ok_or(AppError::NoImage)?;
        let removed = self.editor.commit_delete(data)?;
        self.refresh();
        Ok(removed)
    }

    pub fn undo_prompt(&mut self) -> Result<(), AppError> {
        let data = self.data.as_ref().ok_or(AppError::NoImage)?;
        self.editor.undo(self.backend.as_mut(), data)?;
        self.refresh();
        Ok(())
    }

    pub fn reset_prompts(&mut self) -> Result<(), AppError> {
        self.editor.reset(self.backend.as_mut())?;
        self.refresh();
        Ok(())
    }

    /// Commit the candidate mask.
    pub fn confirm_mask(&mut self) -> Result<MaskId, AppError> {
        let data = self.data.as_mut().ok_or(AppError::NoImage)?;
        let id = self.editor.confirm(self.backend.as_mut(), data)?;
        self.refresh();
        Ok(id)
    }

    /// Apply a backend response obtained outside the session, e.g. from an
    /// asynchronous request issued with [`Editor::request_token`].
    pub fn accept_response(
        &mut self,
        token: u64,
        response: CandidateResponse,
    ) -> Result<(), AppError> {
        let data = self.data.as_ref().ok_or(AppError::NoImage)?;
        self.editor.accept_response(token, response, data)?;
        self.refresh();
        Ok(())
    }

    /// Token for an asynchronous backend request in the live session.
    pub fn request_token(&mut self) -> Result<u64, AppError> {
        Ok(self.editor.request_token()?)
    }

    /// Dispatch a key press through the current mode's shortcut table.
    pub fn handle_key(&mut self, shortcut: Shortcut) -> Result<Option<EditorAction>, AppError> {
        let data = self.data.as_mut().ok_or(AppError::NoImage)?;
        let outcome = self
            .editor
            .handle_shortcut(shortcut, self.backend.as_mut(), data)?;
        match outcome {
            ShortcutOutcome::Unbound => Ok(None),
            ShortcutOutcome::Handled(action) => {
                self.refresh();
                Ok(Some(action))
            }
            ShortcutOutcome::Forward(action) => {
                match action {
                    EditorAction::NextImage => {
                        self.next_image()?;
                    }
                    EditorAction::PrevImage => {
                        self.prev_image()?;
                    }
                    EditorAction::ResetViewpoint => self.reset_viewpoint(),
                    EditorAction::ToggleMasks => self.toggle_masks(),
                    _ => {}
                }
                Ok(Some(action))
            }
        }
    }

    // =========================================================================
    // Taxonomy
    // =========================================================================

    fn taxonomy_changed(&mut self) {
        self.project.store_taxonomy(&self.taxonomy);
        self.refresh();
    }

    /// Add a coral species, returning the healthy and bleached ids.
    pub fn add_coral_category(&mut self, name: &str) -> Result<(CategoryId, CategoryId), AppError> {
        let ids = self.taxonomy.add_coral_category(name)?;
        self.taxonomy_changed();
        Ok(ids)
    }

    /// Add a single category.
    pub fn add_category(
        &mut self,
        name: &str,
        is_coral: bool,
        status: HealthStatus,
    ) -> Result<CategoryId, AppError> {
        let id = self.taxonomy.add_category(name, is_coral, status)?;
        self.taxonomy_changed();
        Ok(id)
    }

    /// Remove a category (and its health pair) if no image uses it.
    pub fn remove_category(&mut self, category_id: CategoryId) -> Result<usize, AppError> {
        let data = self.data.as_ref().ok_or(AppError::NoImage)?;
        let removed = self
            .taxonomy
            .remove_category(category_id, data, &self.project)?;
        self.taxonomy_changed();
        Ok(removed.len())
    }

    pub fn rename_category(&mut self, category_id: CategoryId, name: &str) -> Result<(), AppError> {
        self.taxonomy.rename_category(category_id, name)?;
        self.taxonomy_changed();
        Ok(())
    }

    // =========================================================================
    // View
    // =========================================================================

    /// Filter the open image's masks, then rebuild overlay layers and
    /// statistics from it.
    pub fn refresh(&mut self) {
        let Some(data) = self.data.as_mut() else {
            self.statistics = Statistics::default();
            self.compositor.clear_edit_layer();
            return;
        };
        self.config.preferences.display_filter.apply(data);
        let data = &*data;

        let skipped =
            self.compositor
                .update_masks(data, &self.taxonomy, self.editor.selection_color());
        if skipped > 0 {
            log::warn!("{} masks on '{}' could not be drawn", skipped, data.file_name());
        }

        match self.editor.session() {
            Some(session) => self.compositor.update_edit_layer(
                session.candidate(),
                self.editor.candidate_color(&self.taxonomy),
                session.prompts(),
            ),
            None => self.compositor.clear_edit_layer(),
        }

        self.statistics = Statistics::compute(
            data,
            &self.taxonomy,
            self.config.preferences.ignore_undefined_coral,
        );
    }

    /// Set the canvas size and fit the image into it.
    pub fn resize_canvas(&mut self, width: u32, height: u32) {
        self.canvas_size = (width, height);
        self.reset_viewpoint();
    }

    pub fn reset_viewpoint(&mut self) {
        let (w, h) = self.canvas_size;
        if w > 0 && h > 0 {
            self.compositor.reset_viewpoint(w, h);
        }
    }

    /// One wheel step at a canvas point.
    pub fn zoom(&mut self, delta_y: f32, canvas_x: f32, canvas_y: f32) {
        let intensity = self.config.preferences.zoom_intensity;
        self.compositor.zoom_at(delta_y, canvas_x, canvas_y, intensity);
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.compositor.pan_by(dx, dy);
    }

    pub fn toggle_masks(&mut self) {
        let show = !self.compositor.show_masks();
        self.compositor.set_show_masks(show);
    }

    pub fn set_mask_opacity(&mut self, opacity: f32) {
        self.compositor.set_mask_opacity(opacity);
        self.config.preferences.mask_opacity = self.compositor.mask_opacity();
    }

    /// Replace the display filter and re-filter the open image.
    pub fn set_display_filter(&mut self, filter: DisplayFilter) {
        self.config.preferences.display_filter = filter;
        self.refresh();
    }

    /// Hide or show the masks of one category.
    pub fn set_category_hidden(&mut self, category_id: CategoryId, hidden: bool) {
        self.config
            .preferences
            .display_filter
            .set_category_hidden(category_id, hidden);
        self.refresh();
    }

    /// Toggle whether undefined coral is left out of the statistics.
    pub fn set_ignore_undefined(&mut self, ignore: bool) {
        self.config.preferences.ignore_undefined_coral = ignore;
        if let Some(data) = self.data.as_ref() {
            self.statistics = Statistics::compute(data, &self.taxonomy, ignore);
        }
    }

    /// Render one frame of the canvas over `base`.
    pub fn draw(&mut self, base: &RgbaImage) -> RgbaImage {
        let (w, h) = self.canvas_size;
        if w == 0 || h == 0 {
            return self.compositor.compose(base);
        }
        self.compositor.draw(base, w, h)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Store the open image and the taxonomy, then write the project file.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&mut self, path: &std::path::Path) -> Result<(), AppError> {
        self.store_active()?;
        self.project.store_taxonomy(&self.taxonomy);
        self.project.save(path)?;
        self.refresh();
        Ok(())
    }

    /// Snapshot the project with the open image's current masks.
    pub fn export(&mut self) -> Result<crate::format::ProjectFile, AppError> {
        if let Some(data) = self.data.as_ref() {
            self.project.store_image(data)?;
        }
        self.project.store_taxonomy(&self.taxonomy);
        Ok(self.project.to_file())
    }
}
