//! Project file records.
//!
//! These are the serialized shapes of a project: the category list plus one
//! record per image carrying its run-length encoded annotations. They convert
//! to and from the in-memory [`Category`], [`Mask`] and [`ImageData`] types.
//!
//! # Versioning
//!
//! The project format uses semantic versioning (MAJOR.MINOR.PATCH). Version
//! 0.x.x files are unstable: any 0.x file is read, with a warning when the
//! minor version differs.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::format::FormatError;
use crate::model::{Category, CategoryId, HealthStatus, ImageData, Mask, MaskId, SuperCategoryId};
use crate::rle::RlePolicy;

/// Complete project as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Format version for compatibility checking.
    #[serde(default = "current_version")]
    pub version: String,

    /// Category definitions. Sentinels are never stored.
    pub categories: Vec<CategoryRecord>,

    /// Images in project order.
    pub images: Vec<ImageRecord>,

    /// Index of the image that was open when the project was saved.
    #[serde(default)]
    pub last_image_idx: usize,
}

fn current_version() -> String {
    ProjectFile::CURRENT_VERSION.to_string()
}

impl ProjectFile {
    /// Current version of the project file format.
    pub const CURRENT_VERSION: &'static str = "0.1.0";

    /// Major version number for compatibility checking.
    pub const VERSION_MAJOR: u32 = 0;

    /// Minor version number.
    pub const VERSION_MINOR: u32 = 1;

    /// Create an empty project file.
    pub fn new() -> Self {
        Self {
            version: current_version(),
            categories: Vec::new(),
            images: Vec::new(),
            last_image_idx: 0,
        }
    }

    /// Parse a version string into (major, minor, patch) components.
    ///
    /// Returns None if the version string is invalid.
    pub fn parse_version(version: &str) -> Option<(u32, u32, u32)> {
        let parts: Vec<&str> = version.split('.').collect();
        if parts.len() != 3 {
            return None;
        }
        let major = parts[0].parse().ok()?;
        let minor = parts[1].parse().ok()?;
        let patch = parts[2].parse().ok()?;
        Some((major, minor, patch))
    }

    /// Check if a version is fully compatible with the current version.
    ///
    /// For version 0.x.x (unstable), only exact minor version matches are compatible.
    pub fn is_version_compatible(file_version: &str) -> bool {
        let Some((file_major, file_minor, _)) = Self::parse_version(file_version) else {
            return false;
        };
        if Self::VERSION_MAJOR == 0 {
            file_major == 0 && file_minor == Self::VERSION_MINOR
        } else {
            file_major == Self::VERSION_MAJOR
        }
    }

    /// Check if we can attempt to read a file of this version.
    pub fn is_version_readable(file_version: &str) -> bool {
        let Some((file_major, _, _)) = Self::parse_version(file_version) else {
            return false;
        };
        file_major == 0 || file_major == Self::VERSION_MAJOR
    }

    /// Parse and validate a project file.
    pub fn from_json(json: &str) -> Result<Self, FormatError> {
        let file: Self = serde_json::from_str(json)?;

        if !Self::is_version_readable(&file.version) {
            return Err(FormatError::VersionMismatch {
                expected: Self::CURRENT_VERSION.to_string(),
                found: file.version,
            });
        }
        if !Self::is_version_compatible(&file.version) {
            log::warn!(
                "Project version {} differs from {}, reading anyway",
                file.version,
                Self::CURRENT_VERSION
            );
        }

        file.validate()?;
        Ok(file)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, FormatError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check internal consistency: unique non-negative category ids and
    /// annotations that reference defined categories or a sentinel.
    pub fn validate(&self) -> Result<(), FormatError> {
        let mut ids = BTreeSet::new();
        for record in &self.categories {
            if record.id < 0 {
                return Err(FormatError::invalid_format(format!(
                    "category '{}' uses reserved id {}",
                    record.name, record.id
                )));
            }
            if !ids.insert(record.id) {
                return Err(FormatError::invalid_format(format!(
                    "duplicate category id {}",
                    record.id
                )));
            }
        }

        for image in &self.images {
            for annotation in &image.annotations {
                let id = annotation.category_id;
                if !ids.contains(&id) && !Category::is_sentinel_id(id) {
                    return Err(FormatError::UnknownCategory {
                        annotation_id: annotation.id,
                        category_id: id,
                    });
                }
            }
        }

        if !self.images.is_empty() && self.last_image_idx >= self.images.len() {
            return Err(FormatError::ImageIndexOutOfRange {
                index: self.last_image_idx,
                count: self.images.len(),
            });
        }
        Ok(())
    }

    /// Get total annotation count across all images.
    pub fn total_annotations(&self) -> usize {
        self.images.iter().map(|i| i.annotations.len()).sum()
    }
}

impl Default for ProjectFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Category definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: CategoryId,
    pub name: String,
    pub supercategory: String,
    pub supercategory_id: SuperCategoryId,
    pub is_coral: bool,
    /// Integer status code: -1 undefined, 0 healthy, 1 bleached, 2 dead
    pub status: HealthStatus,
}

impl From<&Category> for CategoryRecord {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            supercategory: category.supercategory.clone(),
            supercategory_id: category.supercategory_id,
            is_coral: category.is_coral,
            status: category.status,
        }
    }
}

impl From<&CategoryRecord> for Category {
    fn from(record: &CategoryRecord) -> Self {
        Category::new(
            record.id,
            &record.name,
            &record.supercategory,
            record.supercategory_id,
            record.is_coral,
            record.status,
        )
    }
}

/// Run-length encoded mask in `{size: [h, w], counts}` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RleRecord {
    /// `[height, width]`
    pub size: [u32; 2],
    pub counts: Vec<u32>,
}

impl RleRecord {
    pub fn height(&self) -> u32 {
        self.size[0]
    }

    pub fn width(&self) -> u32 {
        self.size[1]
    }
}

/// One mask annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub id: MaskId,
    #[serde(default)]
    pub image_id: u64,
    pub category_id: CategoryId,
    #[serde(alias = "rle")]
    pub segmentation: RleRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<u64>,
    /// `[x, y, w, h]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub iscrowd: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_iou: Option<f64>,
}

impl AnnotationRecord {
    /// Build the record for a mask. Runs are written exactly as held.
    pub fn from_mask(mask: &Mask, image_id: u64) -> Self {
        Self {
            id: mask.id(),
            image_id,
            category_id: mask.category_id(),
            segmentation: RleRecord {
                size: [mask.height(), mask.width()],
                counts: mask.runs().to_vec(),
            },
            area: Some(mask.area()),
            bbox: Some(mask.bbox()),
            iscrowd: 0,
            predicted_iou: mask.predicted_iou(),
        }
    }

    /// Build the in-memory mask. The runs are not decoded here; a malformed
    /// mask only fails when it is drawn or hit-tested.
    pub fn to_mask(&self, policy: RlePolicy) -> Mask {
        Mask::from_runs(
            self.id,
            self.category_id,
            self.segmentation.counts.clone(),
            self.segmentation.width(),
            self.segmentation.height(),
        )
        .with_policy(policy)
        .with_stored_geometry(self.area, self.bbox)
        .with_predicted_iou(self.predicted_iou)
    }
}

/// An image with its annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: u64,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub annotations: Vec<AnnotationRecord>,
}

impl ImageRecord {
    /// Snapshot an image and its masks.
    pub fn from_image_data(data: &ImageData) -> Self {
        Self {
            id: data.image_id(),
            file_name: data.file_name().to_string(),
            path: data.path().map(str::to_string),
            width: data.width(),
            height: data.height(),
            annotations: data
                .masks()
                .iter()
                .map(|mask| AnnotationRecord::from_mask(mask, data.image_id()))
                .collect(),
        }
    }

    /// Build the editable image state for position `index` in the project.
    pub fn to_image_data(&self, index: usize, policy: RlePolicy) -> ImageData {
        let mut data = ImageData::new(index, &self.file_name, self.width, self.height)
            .with_image_id(self.id)
            .with_path(self.path.clone())
            .with_rle_policy(policy);

        for annotation in &self.annotations {
            let size = annotation.segmentation.size;
            if size != [self.height, self.width] {
                log::warn!(
                    "Annotation {} on '{}' has size {:?}, image is {}x{}",
                    annotation.id,
                    self.file_name,
                    size,
                    self.width,
                    self.height
                );
            }
            data.push_mask(annotation.to_mask(policy));
        }
        data
    }
}
