//! Project file format.
//!
//! Projects are stored as a single JSON document holding the category list
//! and, per image, its run-length encoded mask annotations.
//!
//! ```json
//! {
//!   "version": "0.1.0",
//!   "categories": [{"id": 1, "name": "Acropora", "supercategory": "Acropora",
//!                   "supercategory_id": 1, "is_coral": true, "status": 0}],
//!   "images": [{"id": 0, "file_name": "reef.jpg", "width": 640, "height": 480,
//!               "annotations": [{"id": 0, "category_id": 1,
//!                                "segmentation": {"size": [480, 640], "counts": [...]}}]}],
//!   "last_image_idx": 0
//! }
//! ```

mod error;
mod project;

pub use error::FormatError;
pub use project::{AnnotationRecord, CategoryRecord, ImageRecord, ProjectFile, RleRecord};
