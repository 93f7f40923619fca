//! Project management for CMAT.
//!
//! A project holds every image record and the category list. Exactly one
//! image is active at a time; it is materialized as [`ImageData`] with
//! [`Project::open_image`] and written back with [`Project::store_image`]
//! before leaving it.

use std::path::Path;

use crate::error::BackendError;
use crate::format::{CategoryRecord, FormatError, ImageRecord, ProjectFile};
use crate::model::{Category, CategoryId, CategoryUsage, ImageData, Taxonomy};
use crate::rle::RlePolicy;

/// An open project.
#[derive(Debug, Clone, Default)]
pub struct Project {
    categories: Vec<CategoryRecord>,
    images: Vec<ImageRecord>,
    active: usize,
}

impl Project {
    /// Create an empty project.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a project from a parsed file, resuming at its last image.
    ///
    /// The file is validated first, so a hand-built file with an
    /// out-of-range `last_image_idx` is rejected. A project without images
    /// starts at index 0.
    pub fn from_file(file: ProjectFile) -> Result<Self, FormatError> {
        file.validate()?;
        let active = if file.images.is_empty() {
            0
        } else {
            file.last_image_idx
        };
        Ok(Self {
            categories: file.categories,
            images: file.images,
            active,
        })
    }

    /// Snapshot the project as a file.
    pub fn to_file(&self) -> ProjectFile {
        ProjectFile {
            categories: self.categories.clone(),
            images: self.images.clone(),
            last_image_idx: self.active,
            ..ProjectFile::new()
        }
    }

    /// Load a project from a file (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &Path) -> Result<Self, FormatError> {
        let json = std::fs::read_to_string(path)?;
        let project = Self::from_file(ProjectFile::from_json(&json)?)?;
        log::info!(
            "Loaded project {:?}: {} images, {} categories",
            path,
            project.image_count(),
            project.categories.len()
        );
        Ok(project)
    }

    /// Save the project to a file (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self, path: &Path) -> Result<(), FormatError> {
        let json = self.to_file().to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved project to {:?}", path);
        Ok(())
    }

    /// Append an image record.
    pub fn add_image(&mut self, record: ImageRecord) -> usize {
        self.images.push(record);
        self.images.len() - 1
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Index of the active image.
    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn image(&self, index: usize) -> Option<&ImageRecord> {
        self.images.get(index)
    }

    /// Build the taxonomy from the stored category list.
    pub fn taxonomy(&self) -> Taxonomy {
        Taxonomy::from_categories(self.categories.iter().map(Category::from))
    }

    /// Replace the stored category list with the taxonomy's categories.
    pub fn store_taxonomy(&mut self, taxonomy: &Taxonomy) {
        self.categories = taxonomy.categories().map(CategoryRecord::from).collect();
    }

    fn check_index(&self, index: usize) -> Result<(), FormatError> {
        if index < self.images.len() {
            Ok(())
        } else {
            Err(FormatError::ImageIndexOutOfRange {
                index,
                count: self.images.len(),
            })
        }
    }

    /// Make `index` the active image and return its editable state.
    pub fn open_image(&mut self, index: usize, policy: RlePolicy) -> Result<ImageData, FormatError> {
        self.check_index(index)?;
        self.active = index;
        let data = self.images[index].to_image_data(index, policy);
        log::debug!(
            "Opened image {} '{}' with {} masks",
            index,
            data.file_name(),
            data.masks().len()
        );
        Ok(data)
    }

    /// Write an image's masks back into its record.
    pub fn store_image(&mut self, data: &ImageData) -> Result<(), FormatError> {
        self.check_index(data.index())?;
        self.images[data.index()] = ImageRecord::from_image_data(data);
        Ok(())
    }

    /// Index after the active one; stays put on the last image.
    pub fn next_index(&self) -> usize {
        if self.active + 1 < self.images.len() {
            self.active + 1
        } else {
            self.active
        }
    }

    /// Index before the active one; stays put on the first image.
    pub fn prev_index(&self) -> usize {
        self.active.saturating_sub(1)
    }

    /// Validate a jump target.
    pub fn jump_index(&self, index: usize) -> Result<usize, FormatError> {
        self.check_index(index)?;
        Ok(index)
    }
}

impl CategoryUsage for Project {
    /// Scan every stored image except the active one.
    fn category_in_use_elsewhere(
        &self,
        category_id: CategoryId,
    ) -> Result<Option<usize>, BackendError> {
        Ok(self
            .images
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != self.active)
            .find(|(_, record)| {
                record
                    .annotations
                    .iter()
                    .any(|annotation| annotation.category_id == category_id)
            })
            .map(|(index, _)| index))
    }
}
