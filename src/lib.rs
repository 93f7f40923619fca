//! CMAT - Coral Mask Annotation Tool
//!
//! Core of a reef-survey annotation tool: run-length encoded masks, a coral
//! taxonomy with paired healthy/bleached categories, overlay compositing with
//! pan/zoom, a mode-based editing state machine driven by point prompts, and
//! per-image coverage statistics.

pub mod app;
pub mod color_utils;
pub mod config;
pub mod constants;
pub mod editor;
pub mod error;
pub mod format;
pub mod model;
pub mod project;
pub mod render;
pub mod rle;
pub mod stats;

pub use app::{CmatApp, PointerButton};
pub use config::AppConfig;
pub use error::AppError;
pub use project::Project;
