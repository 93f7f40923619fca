//! One annotated image and the masks it owns.

use std::collections::BTreeSet;

use crate::model::category::{CategoryId, PREDICTED_CORAL_ID, PROMPT_CATEGORY_ID};
use crate::model::mask::{Mask, MaskId};
use crate::rle::RlePolicy;

/// An image of the project together with its ordered mask list.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Position of the image in the project
    index: usize,
    /// Image identifier stored in the project file
    image_id: u64,
    /// File name shown to the operator
    file_name: String,
    /// Path or URL of the image file
    path: Option<String>,
    width: u32,
    height: u32,
    /// Decode policy applied to masks added in this session
    rle_policy: RlePolicy,
    masks: Vec<Mask>,
}

impl ImageData {
    /// Create an empty image record.
    pub fn new(index: usize, file_name: &str, width: u32, height: u32) -> Self {
        Self {
            index,
            image_id: index as u64,
            file_name: file_name.to_string(),
            path: None,
            width,
            height,
            rle_policy: RlePolicy::Strict,
            masks: Vec::new(),
        }
    }

    pub fn with_image_id(mut self, image_id: u64) -> Self {
        self.image_id = image_id;
        self
    }

    pub fn with_path(mut self, path: Option<String>) -> Self {
        self.path = path;
        self
    }

    pub fn with_rle_policy(mut self, policy: RlePolicy) -> Self {
        self.rle_policy = policy;
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn image_id(&self) -> u64 {
        self.image_id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total pixel count.
    pub fn image_area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn masks(&self) -> &[Mask] {
        &self.masks
    }

    pub fn masks_mut(&mut self) -> &mut [Mask] {
        &mut self.masks
    }

    pub fn mask(&self, id: MaskId) -> Option<&Mask> {
        self.masks.iter().find(|m| m.id() == id)
    }

    pub fn mask_mut(&mut self, id: MaskId) -> Option<&mut Mask> {
        self.masks.iter_mut().find(|m| m.id() == id)
    }

    /// Append a mask as loaded, keeping its id.
    pub fn push_mask(&mut self, mask: Mask) {
        self.masks.push(mask);
    }

    fn available_mask_id(&self) -> MaskId {
        let used: BTreeSet<MaskId> = self.masks.iter().map(Mask::id).collect();
        (0..).find(|id| !used.contains(id)).unwrap_or_default()
    }

    /// Commit a newly created region under the smallest unused id.
    ///
    /// The prompt sentinel is stored as the predicted sentinel.
    pub fn add_mask(&mut self, runs: Vec<u32>, category_id: CategoryId) -> MaskId {
        let category_id = if category_id == PROMPT_CATEGORY_ID {
            PREDICTED_CORAL_ID
        } else {
            category_id
        };
        let id = self.available_mask_id();
        let mask = Mask::from_runs(id, category_id, runs, self.width, self.height)
            .with_policy(self.rle_policy);
        self.masks.push(mask);
        log::debug!("Added mask {} with category {} to image {}", id, category_id, self.index);
        id
    }

    /// Remove the given masks, returning how many were removed.
    pub fn remove_masks(&mut self, ids: &[MaskId]) -> usize {
        let before = self.masks.len();
        self.masks.retain(|m| !ids.contains(&m.id()));
        before - self.masks.len()
    }

    /// Ids of displayed masks whose region contains the pixel.
    pub fn masks_at(&self, x: u32, y: u32) -> Vec<MaskId> {
        self.masks
            .iter()
            .filter(|m| m.should_display() && m.contains(x, y))
            .map(Mask::id)
            .collect()
    }

    /// Ids of the selected masks, in list order.
    pub fn selected_ids(&self) -> Vec<MaskId> {
        self.masks
            .iter()
            .filter(|m| m.is_selected())
            .map(Mask::id)
            .collect()
    }

    pub fn clear_selection(&mut self) {
        for mask in &mut self.masks {
            mask.set_selected(false);
        }
    }

    /// Check whether any mask references the category.
    pub fn references_category(&self, category_id: CategoryId) -> bool {
        self.masks.iter().any(|m| m.category_id() == category_id)
    }
}
