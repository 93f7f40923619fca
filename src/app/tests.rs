use image::{Rgba, RgbaImage};

use super::*;
use crate::error::{BackendError, EditorError, TaxonomyError};
use crate::editor::{Key, Prompt};
use crate::format::ImageRecord;
use crate::model::Mask;

/// Backend whose candidate covers the first `n` rows of a 10x10 image after
/// `n` prompts.
#[derive(Default)]
struct RowBackend {
    history: Vec<Prompt>,
}

impl RowBackend {
    fn response(&self) -> CandidateResponse {
        let rows = self.history.len() as u32;
        CandidateResponse {
            candidate: (rows > 0).then(|| vec![0, rows * 10, 100 - rows * 10]),
            prompt_history: self.history.clone(),
        }
    }
}

impl SegmentationBackend for RowBackend {
    fn create_or_update_mask(
        &mut self,
        prompts: &[Prompt],
    ) -> Result<CandidateResponse, BackendError> {
        self.history.extend_from_slice(prompts);
        Ok(self.response())
    }

    fn undo_last_prompt(&mut self) -> Result<CandidateResponse, BackendError> {
        self.history.pop();
        Ok(self.response())
    }

    fn clear_prompts(&mut self) -> Result<(), BackendError> {
        self.history.clear();
        Ok(())
    }

    fn confirm_mask(&mut self) -> Result<(), BackendError> {
        self.history.clear();
        Ok(())
    }
}

/// Foreground in the first five columns of every row of a 10x10 image.
fn left_five_columns() -> Vec<u32> {
    let mut runs = vec![0];
    for _ in 0..10 {
        runs.extend_from_slice(&[5, 5]);
    }
    runs
}

/// Two 10x10 images. Image 0 holds one Acropora mask over the left half,
/// image 1 one Porites mask over the bottom half.
fn project() -> Project {
    let mut taxonomy = Taxonomy::new();
    taxonomy.add_coral_category("Acropora").unwrap();
    taxonomy.add_coral_category("Porites").unwrap();

    let mut project = Project::new();
    project.store_taxonomy(&taxonomy);

    let mut first = ImageData::new(0, "a.jpg", 10, 10).with_image_id(100);
    first.add_mask(left_five_columns(), 1);
    project.add_image(ImageRecord::from_image_data(&first));

    let mut second = ImageData::new(1, "b.jpg", 10, 10).with_image_id(101);
    second.add_mask(vec![50, 50], 3);
    project.add_image(ImageRecord::from_image_data(&second));
    project
}

fn app() -> CmatApp {
    CmatApp::new(AppConfig::new(), project(), Box::new(RowBackend::default())).unwrap()
}

#[test]
fn test_add_species() {
    let mut app = CmatApp::without_backend(AppConfig::new(), Project::new()).unwrap();
    assert_eq!(app.taxonomy().len(), 1);

    let (healthy, bleached) = app.add_coral_category("Acropora").unwrap();
    assert_eq!((healthy, bleached), (1, 2));
    let taxonomy = app.taxonomy();
    assert_eq!(taxonomy.get(1).unwrap().name, "Acropora");
    assert_eq!(taxonomy.get(1).unwrap().status, HealthStatus::Healthy);
    assert_eq!(taxonomy.get(2).unwrap().name, "Bleached Acropora");
    assert_eq!(taxonomy.get(2).unwrap().status, HealthStatus::Bleached);
    assert_eq!(
        taxonomy.get(1).unwrap().supercategory_id,
        taxonomy.get(2).unwrap().supercategory_id
    );
}

#[test]
fn test_protected_removal() {
    let mut app = app();
    let before = app.taxonomy().len();
    assert!(matches!(
        app.remove_category(0),
        Err(AppError::Taxonomy(TaxonomyError::ProtectedCategory(0)))
    ));
    assert_eq!(app.taxonomy().len(), before);
}

#[test]
fn test_removal_blocked_by_active_image() {
    let mut app = app();
    assert!(matches!(
        app.remove_category(1),
        Err(AppError::Taxonomy(TaxonomyError::CategoryInUse {
            image_index: 0,
            ..
        }))
    ));
    assert!(app.taxonomy().get(1).is_some());
    assert!(app.taxonomy().get(2).is_some());
}

#[test]
fn test_removal_blocked_by_other_image() {
    let mut app = app();
    assert!(matches!(
        app.remove_category(4),
        Err(AppError::Taxonomy(TaxonomyError::CategoryInUse {
            image_index: 1,
            ..
        }))
    ));
    assert!(app.taxonomy().get(3).is_some());
}

#[test]
fn test_removal_of_unused_species() {
    let mut app = app();
    let (healthy, _) = app.add_coral_category("Favia").unwrap();
    assert_eq!(app.remove_category(healthy).unwrap(), 2);
    let file = app.export().unwrap();
    assert_eq!(file.categories.len(), 5);
}

#[test]
fn test_mask_compositing() {
    let mut app = app();
    app.set_mask_opacity(1.0);
    let [r, g, b] = app.taxonomy().fill_color(1);
    let layer = app.compositor().mask_layer();
    for y in 0..10 {
        for x in 0..10 {
            let expected = if x < 5 { Rgba([r, g, b, 255]) } else { Rgba([0, 0, 0, 0]) };
            assert_eq!(*layer.get_pixel(x, y), expected, "pixel ({}, {})", x, y);
        }
    }
}

#[test]
fn test_select_and_assign_updates_statistics() {
    let mut app = app();
    assert_eq!(app.statistics().area_by_super_category.get(&1), Some(&50));

    app.click_image(2, 2, PointerButton::Primary).unwrap();
    assert!(app.image().unwrap().mask(0).unwrap().is_selected());

    assert_eq!(app.assign_category(3).unwrap(), 1);
    let mask = app.image().unwrap().mask(0).unwrap();
    assert_eq!(mask.category_id(), 3);
    assert!(!mask.is_selected());
    assert_eq!(app.statistics().area_by_super_category.get(&1), None);
    assert_eq!(app.statistics().area_by_super_category.get(&2), Some(&50));
}

#[test]
fn test_assign_unknown_category() {
    let mut app = app();
    app.click_image(2, 2, PointerButton::Primary).unwrap();
    assert!(matches!(
        app.assign_category(42),
        Err(AppError::Taxonomy(TaxonomyError::UnknownCategory(42)))
    ));
    assert_eq!(app.image().unwrap().mask(0).unwrap().category_id(), 1);
}

#[test]
fn test_selection_idempotence() {
    let mut app = app();
    let before = app.compositor().mask_layer().clone();
    app.click_image(1, 1, PointerButton::Primary).unwrap();
    assert_ne!(*app.compositor().mask_layer(), before);
    app.click_image(1, 1, PointerButton::Primary).unwrap();
    assert_eq!(*app.compositor().mask_layer(), before);
}

#[test]
fn test_create_mask_flow() {
    let mut app = app();
    app.set_mode(EditMode::CreateMask).unwrap();
    assert_eq!(
        app.controls(),
        EditControls {
            undo: true,
            reset: true,
            confirm: true
        }
    );

    app.click_image(7, 0, PointerButton::Primary).unwrap();
    app.click_image(7, 1, PointerButton::Secondary).unwrap();
    assert!(app.compositor().edit_layer().is_some());
    assert_eq!(app.editor().session().unwrap().prompts().len(), 2);

    app.undo_prompt().unwrap();
    assert_eq!(app.editor().session().unwrap().prompts().len(), 1);

    app.assign_category(3).unwrap();
    let id = app.confirm_mask().unwrap();
    assert_eq!(id, 1);
    assert!(app.editor().session().is_none());
    assert!(app.compositor().edit_layer().is_none());

    let mask = app.image().unwrap().mask(id).unwrap();
    assert_eq!(mask.category_id(), 3);
    assert_eq!(mask.area(), 10);
    assert_eq!(app.statistics().colony_counts.get(&2), Some(&1));

    let file = app.export().unwrap();
    assert_eq!(file.images[0].annotations[1].segmentation.counts, vec![0, 10, 90]);
}

#[test]
fn test_confirm_without_category_is_predicted() {
    let mut app = app();
    app.set_mode(EditMode::CreateMask).unwrap();
    app.click_image(0, 0, PointerButton::Primary).unwrap();
    let id = app.confirm_mask().unwrap();
    assert_eq!(
        app.image().unwrap().mask(id).unwrap().category_id(),
        crate::model::PREDICTED_CORAL_ID
    );
}

#[test]
fn test_confirm_without_candidate() {
    let mut app = app();
    app.set_mode(EditMode::CreateMask).unwrap();
    assert!(matches!(
        app.confirm_mask(),
        Err(AppError::Editor(EditorError::NoCandidate))
    ));
}

#[test]
fn test_stale_response_rejected() {
    let mut app = app();
    app.set_mode(EditMode::CreateMask).unwrap();
    let token = app.request_token().unwrap();
    app.reset_prompts().unwrap();

    let response = CandidateResponse {
        candidate: Some(vec![0, 10, 90]),
        prompt_history: vec![Prompt::new(0, 0, PromptLabel::Foreground)],
    };
    assert!(matches!(
        app.accept_response(token, response),
        Err(AppError::Editor(EditorError::StaleResponse { current: 0, .. }))
    ));
    assert!(app.editor().session().is_none());
}

#[test]
fn test_delete_mode() {
    let mut app = app();
    app.set_mode(EditMode::Delete).unwrap();
    assert_eq!(
        app.controls(),
        EditControls {
            undo: false,
            reset: false,
            confirm: true
        }
    );

    app.click_image(0, 9, PointerButton::Primary).unwrap();
    assert_eq!(
        app.handle_key(Shortcut::key(Key::Enter)).unwrap(),
        Some(EditorAction::CommitDelete)
    );
    assert!(app.image().unwrap().masks().is_empty());
    assert_eq!(app.statistics().coverage.coral, 0);
    assert_eq!(app.statistics().coverage.non_coral, 100);
}

#[test]
fn test_shortcuts_are_mode_scoped() {
    let mut app = app();
    assert_eq!(app.handle_key(Shortcut::ctrl('z')).unwrap(), None);
    assert_eq!(app.handle_key(Shortcut::key(Key::Space)).unwrap(), None);

    app.set_mode(EditMode::CreateMask).unwrap();
    app.click_image(0, 0, PointerButton::Primary).unwrap();
    assert_eq!(
        app.handle_key(Shortcut::ctrl('z')).unwrap(),
        Some(EditorAction::Undo)
    );
    assert!(app.editor().session().is_none());
}

#[test]
fn test_navigation_keeps_edits() {
    let mut app = app();
    app.click_image(0, 0, PointerButton::Primary).unwrap();
    app.assign_category(3).unwrap();

    assert_eq!(
        app.handle_key(Shortcut::char('d')).unwrap(),
        Some(EditorAction::NextImage)
    );
    assert_eq!(app.image().unwrap().file_name(), "b.jpg");
    assert_eq!(app.project().active_index(), 1);

    // Already on the last image.
    assert_eq!(app.next_image().unwrap(), 1);

    app.handle_key(Shortcut::char('a')).unwrap();
    assert_eq!(app.image().unwrap().mask(0).unwrap().category_id(), 3);
}

#[test]
fn test_navigation_drops_prompt_session() {
    let mut app = app();
    app.set_mode(EditMode::CreateMask).unwrap();
    app.click_image(0, 0, PointerButton::Primary).unwrap();
    app.next_image().unwrap();
    assert_eq!(app.mode(), EditMode::CreateMask);
    assert!(app.editor().session().is_none());
    assert!(app.compositor().edit_layer().is_none());
}

#[test]
fn test_toggle_masks_shortcut() {
    let mut app = app();
    assert!(app.compositor().show_masks());
    app.handle_key(Shortcut::char('s')).unwrap();
    assert!(!app.compositor().show_masks());
}

#[test]
fn test_click_through_canvas() {
    let mut app = app();
    app.resize_canvas(20, 20);
    let base = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
    let frame = app.draw(&base);
    assert_eq!(frame.dimensions(), (20, 20));

    app.click_canvas(19.0, 19.0, PointerButton::Primary).unwrap();
    assert!(app.image().unwrap().selected_ids().is_empty());
    app.click_canvas(1.0, 1.0, PointerButton::Primary).unwrap();
    assert_eq!(app.image().unwrap().selected_ids(), vec![0]);
}

#[test]
fn test_ignore_undefined_toggle() {
    let mut app = app();
    app.set_mode(EditMode::CreateMask).unwrap();
    app.click_image(9, 0, PointerButton::Primary).unwrap();
    app.confirm_mask().unwrap();

    app.set_ignore_undefined(false);
    assert_eq!(app.statistics().coverage.undefined, 10);
    app.set_ignore_undefined(true);
    assert_eq!(app.statistics().coverage.undefined, 0);
}

#[test]
fn test_hidden_category_not_drawn_or_selectable() {
    let mut app = app();
    app.click_image(2, 2, PointerButton::Primary).unwrap();
    assert_eq!(app.image().unwrap().selected_ids(), vec![0]);

    app.set_category_hidden(1, true);
    assert!(!app.image().unwrap().mask(0).unwrap().should_display());
    assert!(app.image().unwrap().selected_ids().is_empty());
    assert!(app.compositor().mask_layer().pixels().all(|p| p.0[3] == 0));

    app.click_image(2, 2, PointerButton::Primary).unwrap();
    assert!(app.image().unwrap().selected_ids().is_empty());
    // Hidden masks still count.
    assert_eq!(app.statistics().coverage.coral, 50);

    app.set_category_hidden(1, false);
    assert_ne!(app.compositor().mask_layer().get_pixel(2, 2).0[3], 0);
    app.click_image(2, 2, PointerButton::Primary).unwrap();
    assert_eq!(app.image().unwrap().selected_ids(), vec![0]);
}

#[test]
fn test_low_confidence_masks_filtered_on_load() {
    let mut taxonomy = Taxonomy::new();
    taxonomy.add_coral_category("Acropora").unwrap();
    let mut project = Project::new();
    project.store_taxonomy(&taxonomy);
    let mut data = ImageData::new(0, "a.jpg", 10, 10);
    data.push_mask(Mask::from_runs(0, 1, vec![0, 50, 50], 10, 10).with_predicted_iou(Some(0.2)));
    data.push_mask(Mask::from_runs(1, 1, vec![50, 50], 10, 10).with_predicted_iou(Some(0.9)));
    project.add_image(ImageRecord::from_image_data(&data));

    let mut config = AppConfig::new();
    config.preferences.display_filter = DisplayFilter {
        min_predicted_iou: Some(0.5),
        ..DisplayFilter::default()
    };
    let mut app = CmatApp::without_backend(config, project).unwrap();
    let shown: Vec<bool> = app.image().unwrap().masks().iter().map(Mask::should_display).collect();
    assert_eq!(shown, vec![false, true]);
    assert_eq!(app.compositor().mask_layer().get_pixel(0, 0).0[3], 0);
    assert_ne!(app.compositor().mask_layer().get_pixel(0, 9).0[3], 0);

    app.click_image(0, 0, PointerButton::Primary).unwrap();
    assert!(app.image().unwrap().selected_ids().is_empty());

    app.set_display_filter(DisplayFilter::default());
    assert!(app.image().unwrap().masks().iter().all(Mask::should_display));
    assert_eq!(app.export().unwrap().images[0].annotations.len(), 2);
}

#[test]
fn test_empty_project() {
    let mut app = CmatApp::without_backend(AppConfig::new(), Project::new()).unwrap();
    assert!(app.image().is_none());
    assert!(matches!(app.set_mode(EditMode::Delete), Err(AppError::NoImage)));
    assert!(matches!(app.open_image(0), Err(AppError::Format(_))));
}

#[test]
fn test_without_backend_prompt_fails_cleanly() {
    let mut app = CmatApp::without_backend(AppConfig::new(), project()).unwrap();
    app.set_mode(EditMode::CreateMask).unwrap();
    assert!(matches!(
        app.click_image(0, 0, PointerButton::Primary),
        Err(AppError::Editor(EditorError::Backend(BackendError::Unavailable(_))))
    ));
    assert!(app.editor().session().is_none());
    assert_eq!(app.mode(), EditMode::CreateMask);
}
