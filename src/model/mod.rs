//! Data models: categories, the taxonomy service, masks, annotated images and
//! the mask display filter.

pub mod category;
pub mod filter;
pub mod image_data;
pub mod mask;
pub mod taxonomy;

pub use category::{
    Category, CategoryId, DEAD_CORAL_ID, HealthStatus, PREDICTED_CORAL_ID, PROMPT_CATEGORY_ID,
    SuperCategoryId, bleached_name,
};
pub use filter::DisplayFilter;
pub use image_data::ImageData;
pub use mask::{Mask, MaskId};
pub use taxonomy::{CategoryUsage, NoOtherImages, Taxonomy};
