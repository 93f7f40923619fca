//! The category taxonomy service.
//!
//! Holds every real category of a project, keeps the healthy/bleached pairing
//! of coral species consistent, and derives category colours.

use std::collections::{BTreeMap, BTreeSet};

use crate::color_utils::hex_to_rgb;
use crate::constants::{
    BLEACHED_BORDER_COLOR, COLOR_LIST, DEAD_BORDER_COLOR, DEFAULT_COLOR, DEFAULT_TEXT_COLOR,
    PROMPT_COLOR, TEXT_COLOR_LIST,
};
use crate::error::{BackendError, TaxonomyError};
use crate::model::category::{
    Category, CategoryId, DEAD_CORAL_ID, HealthStatus, PREDICTED_CORAL_ID, PROMPT_CATEGORY_ID,
    SuperCategoryId, bleached_name,
};
use crate::model::image_data::ImageData;

/// Answers whether a category is referenced by any image other than the
/// active one. Implemented by the project store.
pub trait CategoryUsage {
    /// Index of some other image that still references `category_id`, if any.
    fn category_in_use_elsewhere(
        &self,
        category_id: CategoryId,
    ) -> Result<Option<usize>, BackendError>;
}

/// Usage query for a session without other stored images.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOtherImages;

impl CategoryUsage for NoOtherImages {
    fn category_in_use_elsewhere(
        &self,
        _category_id: CategoryId,
    ) -> Result<Option<usize>, BackendError> {
        Ok(None)
    }
}

/// The set of categories of a project.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    categories: BTreeMap<CategoryId, Category>,
    predicted: Category,
    prompt: Category,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::new()
    }
}

impl Taxonomy {
    /// Create a taxonomy holding only the dead-coral category.
    pub fn new() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(DEAD_CORAL_ID, Category::dead());
        Self {
            categories,
            predicted: Category::predicted(),
            prompt: Category::prompt(),
        }
    }

    /// Build a taxonomy from stored categories.
    ///
    /// Sentinel ids in the input are ignored; the dead category is added if missing.
    pub fn from_categories(list: impl IntoIterator<Item = Category>) -> Self {
        let mut taxonomy = Self {
            categories: BTreeMap::new(),
            predicted: Category::predicted(),
            prompt: Category::prompt(),
        };
        for category in list {
            if category.id < 0 {
                log::warn!("Ignoring stored category with reserved id {}", category.id);
                continue;
            }
            taxonomy.categories.insert(category.id, category);
        }
        if !taxonomy.categories.contains_key(&DEAD_CORAL_ID) {
            log::warn!("Stored taxonomy has no dead-coral category, adding it");
            taxonomy.categories.insert(DEAD_CORAL_ID, Category::dead());
        }
        taxonomy
    }

    /// Look up a category, including the two sentinels.
    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        match id {
            PREDICTED_CORAL_ID => Some(&self.predicted),
            PROMPT_CATEGORY_ID => Some(&self.prompt),
            _ => self.categories.get(&id),
        }
    }

    /// Look up a category, failing for unknown ids.
    pub fn require(&self, id: CategoryId) -> Result<&Category, TaxonomyError> {
        self.get(id).ok_or(TaxonomyError::UnknownCategory(id))
    }

    /// All real categories in id order (sentinels excluded).
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    /// Number of real categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Always false: the dead category is always present.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Check whether any category already uses this display name.
    pub fn contains_name(&self, name: &str) -> bool {
        self.categories.values().any(|c| c.name == name)
    }

    /// Members of one super-category.
    pub fn super_category_members(
        &self,
        supercategory_id: SuperCategoryId,
    ) -> impl Iterator<Item = &Category> {
        self.categories
            .values()
            .filter(move |c| c.supercategory_id == supercategory_id)
    }

    /// Categories with the given status, sorted by super-category id.
    pub fn categories_by_status(&self, status: HealthStatus) -> Vec<&Category> {
        let mut list: Vec<&Category> = self
            .categories
            .values()
            .filter(|c| c.status == status)
            .collect();
        list.sort_by_key(|c| (c.supercategory_id, c.id));
        list
    }

    /// The sibling of `category` with `status`, or `category` itself when the
    /// species has no such variant.
    pub fn corresponding_category_by_status<'a>(
        &'a self,
        category: &'a Category,
        status: HealthStatus,
    ) -> &'a Category {
        self.super_category_members(category.supercategory_id)
            .find(|c| c.status == status)
            .unwrap_or(category)
    }

    /// Siblings of `category` with a different status.
    pub fn other_status_of(&self, category: &Category) -> Vec<&Category> {
        self.super_category_members(category.supercategory_id)
            .filter(|c| c.status != category.status)
            .collect()
    }

    fn available_category_id(&self, taken: &BTreeSet<CategoryId>) -> CategoryId {
        (0..)
            .find(|id| !self.categories.contains_key(id) && !taken.contains(id))
            .unwrap_or_default()
    }

    fn available_super_category_id(&self) -> SuperCategoryId {
        let used: BTreeSet<SuperCategoryId> =
            self.categories.values().map(|c| c.supercategory_id).collect();
        (0..).find(|id| !used.contains(id)).unwrap_or_default()
    }

    /// Add a coral species as a healthy + bleached pair sharing a fresh
    /// super-category. Returns the (healthy, bleached) ids.
    pub fn add_coral_category(
        &mut self,
        name: &str,
    ) -> Result<(CategoryId, CategoryId), TaxonomyError> {
        let bleached = bleached_name(name);
        if self.contains_name(name) {
            return Err(TaxonomyError::DuplicateCategoryName(name.to_string()));
        }
        if self.contains_name(&bleached) {
            return Err(TaxonomyError::DuplicateCategoryName(bleached));
        }

        let supercategory_id = self.available_super_category_id();
        let mut taken = BTreeSet::new();
        let healthy_id = self.available_category_id(&taken);
        taken.insert(healthy_id);
        let bleached_id = self.available_category_id(&taken);

        self.categories.insert(
            healthy_id,
            Category::new(healthy_id, name, name, supercategory_id, true, HealthStatus::Healthy),
        );
        self.categories.insert(
            bleached_id,
            Category::new(
                bleached_id,
                &bleached,
                name,
                supercategory_id,
                true,
                HealthStatus::Bleached,
            ),
        );

        log::info!(
            "Added coral species '{}' (healthy {}, bleached {}, super-category {})",
            name,
            healthy_id,
            bleached_id,
            supercategory_id
        );
        Ok((healthy_id, bleached_id))
    }

    /// Add a single category in its own fresh super-category.
    pub fn add_category(
        &mut self,
        name: &str,
        is_coral: bool,
        status: HealthStatus,
    ) -> Result<CategoryId, TaxonomyError> {
        if self.contains_name(name) {
            return Err(TaxonomyError::DuplicateCategoryName(name.to_string()));
        }
        let supercategory_id = self.available_super_category_id();
        let id = self.available_category_id(&BTreeSet::new());
        self.categories.insert(
            id,
            Category::new(id, name, name, supercategory_id, is_coral, status),
        );
        log::info!("Added category '{}' with id {}", name, id);
        Ok(id)
    }

    /// Ids removed together with `category`: both members of a coral pair,
    /// otherwise the category alone.
    fn removal_group(&self, category: &Category) -> Vec<CategoryId> {
        let paired = category.is_coral
            && matches!(category.status, HealthStatus::Healthy | HealthStatus::Bleached);
        if !paired {
            return vec![category.id];
        }
        self.super_category_members(category.supercategory_id)
            .filter(|c| matches!(c.status, HealthStatus::Healthy | HealthStatus::Bleached))
            .map(|c| c.id)
            .collect()
    }

    /// Remove a category (and its paired variant) once no mask references it.
    ///
    /// The active image is scanned directly; every other image is checked
    /// through `usage`. Returns the removed categories.
    pub fn remove_category(
        &mut self,
        id: CategoryId,
        active: &ImageData,
        usage: &dyn CategoryUsage,
    ) -> Result<Vec<Category>, TaxonomyError> {
        if id == DEAD_CORAL_ID {
            return Err(TaxonomyError::ProtectedCategory(id));
        }
        if Category::is_sentinel_id(id) {
            return Err(TaxonomyError::InvalidCategoryState {
                id,
                reason: "sentinel categories cannot be removed".to_string(),
            });
        }
        let category = self.categories.get(&id).ok_or(TaxonomyError::UnknownCategory(id))?;
        let group = self.removal_group(category);

        for &target in &group {
            if active.masks().iter().any(|m| m.category_id() == target) {
                return Err(TaxonomyError::CategoryInUse {
                    category_id: target,
                    image_index: active.index(),
                });
            }
        }
        for &target in &group {
            if let Some(image_index) = usage.category_in_use_elsewhere(target)? {
                return Err(TaxonomyError::CategoryInUse {
                    category_id: target,
                    image_index,
                });
            }
        }

        let removed: Vec<Category> = group
            .iter()
            .filter_map(|target| self.categories.remove(target))
            .collect();
        log::info!(
            "Removed categories {:?}",
            removed.iter().map(|c| c.id).collect::<Vec<_>>()
        );
        Ok(removed)
    }

    /// Rename a species from its healthy representative; the bleached variant
    /// follows with the prefixed name. Non-coral categories are renamed alone.
    pub fn rename_category(&mut self, id: CategoryId, new_name: &str) -> Result<(), TaxonomyError> {
        let category = self.categories.get(&id).ok_or(TaxonomyError::UnknownCategory(id))?;
        if category.is_coral && !category.is_healthy() {
            return Err(TaxonomyError::InvalidCategoryState {
                id,
                reason: format!(
                    "only the healthy variant can be renamed (status is {})",
                    category.status.name()
                ),
            });
        }

        let mut renames: Vec<(CategoryId, String)> = vec![(id, new_name.to_string())];
        if category.is_coral {
            let bleached = self.corresponding_category_by_status(category, HealthStatus::Bleached);
            if bleached.id != id {
                renames.push((bleached.id, bleached_name(new_name)));
            }
        }
        let supercategory_id = category.supercategory_id;

        for (_, name) in &renames {
            let clash = self
                .categories
                .values()
                .any(|c| c.name == *name && c.supercategory_id != supercategory_id);
            if clash {
                return Err(TaxonomyError::DuplicateCategoryName(name.clone()));
            }
        }

        for (target, name) in renames {
            if let Some(c) = self.categories.get_mut(&target) {
                log::debug!("Renaming category {} '{}' -> '{}'", target, c.name, name);
                c.name = name;
                c.supercategory = new_name.to_string();
            }
        }
        Ok(())
    }

    fn palette_index(supercategory_id: SuperCategoryId) -> usize {
        supercategory_id.rem_euclid(COLOR_LIST.len() as i32) as usize
    }

    /// Fill colour of a category.
    pub fn fill_color(&self, id: CategoryId) -> [u8; 3] {
        match id {
            PREDICTED_CORAL_ID => DEFAULT_COLOR,
            PROMPT_CATEGORY_ID => PROMPT_COLOR,
            _ => match self.categories.get(&id) {
                Some(c) => hex_to_rgb(COLOR_LIST[Self::palette_index(c.supercategory_id)])
                    .unwrap_or(DEFAULT_COLOR),
                None => {
                    log::warn!("No colour for unknown category {}", id);
                    DEFAULT_COLOR
                }
            },
        }
    }

    /// Border colour of a category.
    pub fn border_color(&self, id: CategoryId) -> [u8; 3] {
        match id {
            PREDICTED_CORAL_ID => DEFAULT_COLOR,
            PROMPT_CATEGORY_ID => PROMPT_COLOR,
            _ => match self.categories.get(&id).map(|c| c.status) {
                Some(HealthStatus::Bleached) => BLEACHED_BORDER_COLOR,
                Some(HealthStatus::Dead) => DEAD_BORDER_COLOR,
                Some(HealthStatus::Healthy) => self.fill_color(id),
                _ => DEFAULT_COLOR,
            },
        }
    }

    /// Badge text colour of a category.
    pub fn text_color(&self, id: CategoryId) -> [u8; 3] {
        if Category::is_sentinel_id(id) {
            return DEFAULT_TEXT_COLOR;
        }
        self.categories
            .get(&id)
            .and_then(|c| hex_to_rgb(TEXT_COLOR_LIST[Self::palette_index(c.supercategory_id)]))
            .unwrap_or(DEFAULT_TEXT_COLOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mask::Mask;

    struct UsedIn(CategoryId, usize);

    impl CategoryUsage for UsedIn {
        fn category_in_use_elsewhere(
            &self,
            category_id: CategoryId,
        ) -> Result<Option<usize>, BackendError> {
            Ok((category_id == self.0).then_some(self.1))
        }
    }

    struct Offline;

    impl CategoryUsage for Offline {
        fn category_in_use_elsewhere(
            &self,
            _category_id: CategoryId,
        ) -> Result<Option<usize>, BackendError> {
            Err(BackendError::Timeout)
        }
    }

    fn empty_image() -> ImageData {
        ImageData::new(0, "reef.jpg", 4, 4)
    }

    fn assert_pairing(taxonomy: &Taxonomy) {
        for healthy in taxonomy.categories().filter(|c| c.is_coral && c.is_healthy()) {
            let bleached: Vec<_> = taxonomy
                .super_category_members(healthy.supercategory_id)
                .filter(|c| c.is_bleached())
                .collect();
            assert_eq!(bleached.len(), 1, "species {} must have one bleached variant", healthy.name);
            assert_eq!(bleached[0].name, bleached_name(&healthy.name));
        }
    }

    fn assert_unique_ids(taxonomy: &Taxonomy) {
        let ids: BTreeSet<_> = taxonomy.categories().map(|c| c.id).collect();
        assert_eq!(ids.len(), taxonomy.len());
        let healthy_or_single: Vec<SuperCategoryId> = taxonomy
            .categories()
            .filter(|c| !c.is_bleached())
            .map(|c| c.supercategory_id)
            .collect();
        let supers: BTreeSet<_> = healthy_or_single.iter().copied().collect();
        assert_eq!(supers.len(), healthy_or_single.len());
    }

    #[test]
    fn test_add_species_scenario() {
        let mut taxonomy = Taxonomy::new();
        assert_eq!(taxonomy.len(), 1);

        let (healthy, bleached) = taxonomy.add_coral_category("Acropora").unwrap();
        assert_eq!((healthy, bleached), (1, 2));
        assert_eq!(taxonomy.len(), 3);

        let h = taxonomy.get(1).unwrap();
        let b = taxonomy.get(2).unwrap();
        assert_eq!(h.name, "Acropora");
        assert_eq!(h.status, HealthStatus::Healthy);
        assert_eq!(b.name, "Bleached Acropora");
        assert_eq!(b.status, HealthStatus::Bleached);
        assert_eq!(h.supercategory_id, b.supercategory_id);
        assert_ne!(h.supercategory_id, taxonomy.get(0).unwrap().supercategory_id);
    }

    #[test]
    fn test_add_duplicate_name_rejected() {
        let mut taxonomy = Taxonomy::new();
        taxonomy.add_coral_category("Acropora").unwrap();
        assert_eq!(
            taxonomy.add_coral_category("Acropora"),
            Err(TaxonomyError::DuplicateCategoryName("Acropora".to_string()))
        );
        assert!(matches!(
            taxonomy.add_coral_category("Bleached Acropora"),
            Err(TaxonomyError::DuplicateCategoryName(_))
        ));
        assert_eq!(taxonomy.len(), 3);
    }

    #[test]
    fn test_ids_reuse_smallest_free() {
        let mut taxonomy = Taxonomy::new();
        taxonomy.add_coral_category("Acropora").unwrap();
        taxonomy.add_coral_category("Porites").unwrap();
        taxonomy.remove_category(1, &empty_image(), &NoOtherImages).unwrap();

        let (h, b) = taxonomy.add_coral_category("Favia").unwrap();
        assert_eq!((h, b), (1, 2));
        assert_eq!(taxonomy.get(1).unwrap().supercategory_id, 1);
        assert_unique_ids(&taxonomy);
    }

    #[test]
    fn test_protected_removal() {
        let mut taxonomy = Taxonomy::new();
        assert_eq!(
            taxonomy.remove_category(0, &empty_image(), &NoOtherImages),
            Err(TaxonomyError::ProtectedCategory(0))
        );
        assert_eq!(taxonomy.len(), 1);
    }

    #[test]
    fn test_blocked_removal_by_active_image() {
        let mut taxonomy = Taxonomy::new();
        taxonomy.add_coral_category("Acropora").unwrap();
        let mut image = empty_image();
        image.push_mask(Mask::from_runs(0, 1, vec![0, 16], 4, 4));

        let err = taxonomy.remove_category(1, &image, &NoOtherImages).unwrap_err();
        assert_eq!(
            err,
            TaxonomyError::CategoryInUse {
                category_id: 1,
                image_index: 0
            }
        );
        assert!(taxonomy.get(1).is_some());
        assert!(taxonomy.get(2).is_some());
    }

    #[test]
    fn test_blocked_removal_of_pair_via_bleached_use_elsewhere() {
        let mut taxonomy = Taxonomy::new();
        taxonomy.add_coral_category("Acropora").unwrap();

        let err = taxonomy.remove_category(1, &empty_image(), &UsedIn(2, 5)).unwrap_err();
        assert_eq!(
            err,
            TaxonomyError::CategoryInUse {
                category_id: 2,
                image_index: 5
            }
        );
        assert_eq!(taxonomy.len(), 3);
    }

    #[test]
    fn test_removal_query_failure_changes_nothing() {
        let mut taxonomy = Taxonomy::new();
        taxonomy.add_coral_category("Acropora").unwrap();
        assert_eq!(
            taxonomy.remove_category(2, &empty_image(), &Offline),
            Err(TaxonomyError::UsageQuery(BackendError::Timeout))
        );
        assert_eq!(taxonomy.len(), 3);
    }

    #[test]
    fn test_remove_bleached_removes_pair() {
        let mut taxonomy = Taxonomy::new();
        taxonomy.add_coral_category("Acropora").unwrap();
        let removed = taxonomy.remove_category(2, &empty_image(), &NoOtherImages).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(taxonomy.len(), 1);
    }

    #[test]
    fn test_rename_healthy_propagates() {
        let mut taxonomy = Taxonomy::new();
        taxonomy.add_coral_category("Acropora").unwrap();
        taxonomy.rename_category(1, "Montipora").unwrap();
        assert_eq!(taxonomy.get(1).unwrap().name, "Montipora");
        assert_eq!(taxonomy.get(2).unwrap().name, "Bleached Montipora");
        assert_eq!(taxonomy.get(2).unwrap().supercategory, "Montipora");
        assert_pairing(&taxonomy);
    }

    #[test]
    fn test_rename_bleached_or_dead_fails() {
        let mut taxonomy = Taxonomy::new();
        taxonomy.add_coral_category("Acropora").unwrap();
        assert!(matches!(
            taxonomy.rename_category(2, "Other"),
            Err(TaxonomyError::InvalidCategoryState { id: 2, .. })
        ));
        assert!(matches!(
            taxonomy.rename_category(0, "Other"),
            Err(TaxonomyError::InvalidCategoryState { id: 0, .. })
        ));
        assert_eq!(taxonomy.get(1).unwrap().name, "Acropora");
    }

    #[test]
    fn test_rename_to_existing_name_fails() {
        let mut taxonomy = Taxonomy::new();
        taxonomy.add_coral_category("Acropora").unwrap();
        taxonomy.add_coral_category("Porites").unwrap();
        assert!(matches!(
            taxonomy.rename_category(3, "Acropora"),
            Err(TaxonomyError::DuplicateCategoryName(_))
        ));
        assert_eq!(taxonomy.get(3).unwrap().name, "Porites");
        assert_eq!(taxonomy.get(4).unwrap().name, "Bleached Porites");
    }

    #[test]
    fn test_pairing_and_uniqueness_after_mixed_edits() {
        let mut taxonomy = Taxonomy::new();
        let image = empty_image();
        for name in ["A", "B", "C", "D"] {
            taxonomy.add_coral_category(name).unwrap();
        }
        taxonomy.remove_category(3, &image, &NoOtherImages).unwrap();
        taxonomy.rename_category(5, "Cc").unwrap();
        taxonomy.add_category("Sand", false, HealthStatus::Undefined).unwrap();
        taxonomy.add_coral_category("E").unwrap();
        taxonomy.remove_category(8, &image, &NoOtherImages).unwrap();
        taxonomy.add_coral_category("F").unwrap();

        assert_pairing(&taxonomy);
        assert_unique_ids(&taxonomy);
    }

    #[test]
    fn test_corresponding_and_other_status() {
        let mut taxonomy = Taxonomy::new();
        taxonomy.add_coral_category("Acropora").unwrap();
        let healthy = taxonomy.get(1).unwrap().clone();

        let bleached = taxonomy.corresponding_category_by_status(&healthy, HealthStatus::Bleached);
        assert_eq!(bleached.id, 2);
        let dead = taxonomy.corresponding_category_by_status(&healthy, HealthStatus::Dead);
        assert_eq!(dead.id, 1);

        let others = taxonomy.other_status_of(&healthy);
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].id, 2);
    }

    #[test]
    fn test_colors() {
        let mut taxonomy = Taxonomy::new();
        taxonomy.add_coral_category("Acropora").unwrap();
        // super-category 1 -> palette entry 1
        assert_eq!(taxonomy.fill_color(1), [0xF6, 0xC3, 0xCB]);
        assert_eq!(taxonomy.fill_color(2), [0xF6, 0xC3, 0xCB]);
        assert_eq!(taxonomy.border_color(1), [0xF6, 0xC3, 0xCB]);
        assert_eq!(taxonomy.border_color(2), BLEACHED_BORDER_COLOR);
        assert_eq!(taxonomy.border_color(0), DEAD_BORDER_COLOR);
        assert_eq!(taxonomy.text_color(1), [0, 0, 0]);
        assert_eq!(taxonomy.fill_color(PREDICTED_CORAL_ID), DEFAULT_COLOR);
        assert_eq!(taxonomy.fill_color(PROMPT_CATEGORY_ID), PROMPT_COLOR);
        assert_eq!(taxonomy.text_color(PREDICTED_CORAL_ID), DEFAULT_TEXT_COLOR);
    }
}
