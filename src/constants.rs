//! Global constants for the CMAT application

/// Super-category fill palette, indexed by `supercategory_id % len`.
pub const COLOR_LIST: [&str; 21] = [
    "#000000", "#F6C3CB", "#EB361C", "#225437", "#F7D941", "#73FBFE", "#9EFCD6", "#2B00F7",
    "#F2AA34", "#EF7C76", "#BADFE5", "#BED966", "#CCE1FD", "#F188E9", "#6CFB45", "#7FCBAC",
    "#C9BFB6", "#163263", "#751608", "#54AFAA", "#5F0F63",
];

/// Badge text colour matching each entry of [`COLOR_LIST`].
pub const TEXT_COLOR_LIST: [&str; 21] = [
    "#FFFFFF", "#000000", "#FFFFFF", "#FFFFFF", "#000000", "#000000", "#000000", "#FFFFFF",
    "#000000", "#000000", "#000000", "#000000", "#000000", "#000000", "#000000", "#000000",
    "#000000", "#FFFFFF", "#FFFFFF", "#FFFFFF", "#FFFFFF",
];

/// Fill colour of a selected mask in select mode.
pub const FOCUS_COLOR: [u8; 3] = [0x00, 0x00, 0xFF];

/// Fill colour of a selected mask in delete mode.
pub const REMOVE_COLOR: [u8; 3] = [0x00, 0xFF, 0x00];

/// Colour of masks on the predicted/undefined coral sentinel.
pub const DEFAULT_COLOR: [u8; 3] = [0xFF, 0x00, 0x00];

/// Colour of the in-progress prompt mask.
pub const PROMPT_COLOR: [u8; 3] = [0x14, 0x91, 0xFF];

/// Text colour used for sentinel categories.
pub const DEFAULT_TEXT_COLOR: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// Border colour of bleached masks.
pub const BLEACHED_BORDER_COLOR: [u8; 3] = [0xD3, 0xD3, 0xD3];

/// Border colour of dead masks.
pub const DEAD_BORDER_COLOR: [u8; 3] = [0x00, 0x00, 0x00];

/// Outline drawn around centroid badges.
pub const BADGE_OUTLINE_COLOR: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// Foreground prompt dot colour.
pub const FOREGROUND_PROMPT_COLOR: [u8; 3] = [0x00, 0x80, 0x00];

/// Background prompt dot colour.
pub const BACKGROUND_PROMPT_COLOR: [u8; 3] = [0xFF, 0x00, 0x00];

/// Name prefix of the bleached variant of a coral species.
pub const BLEACHED_PREFIX: &str = "Bleached ";

/// Border dot radius as a fraction of `min(width, height)`.
pub const BORDER_RADIUS_RATIO: f32 = 0.003;

/// Prompt dot radius as a fraction of `min(width, height)`.
pub const PROMPT_RADIUS_RATIO: f32 = 0.01;

/// Badge font size as a fraction of `min(width, height)`.
pub const BADGE_FONT_RATIO: f32 = 0.04;

/// Largest badge font size in pixels.
pub const MAX_BADGE_FONT_SIZE: u32 = 40;

/// Smallest badge font size in pixels.
pub const MIN_BADGE_FONT_SIZE: u32 = 6;

/// Badge background radius relative to the font size.
pub const BADGE_RADIUS_RATIO: f32 = 0.7;

/// Default opacity of the mask layer.
pub const DEFAULT_MASK_OPACITY: f32 = 0.5;

/// Opacity of the in-progress edit layer.
pub const DEFAULT_EDIT_MASK_OPACITY: f32 = 0.7;

/// Wheel zoom intensity (zoom factor is `exp(±intensity)`).
pub const DEFAULT_ZOOM_INTENSITY: f32 = 0.2;

/// Chart colours for the statistics aggregates.
pub mod chart {
    /// Shallow gray (non-coral and unknown statuses).
    pub const SHALLOW_GRAY: [u8; 3] = [0xD3, 0xD3, 0xD3];
    /// Deep gray (bleached).
    pub const DEEP_GRAY: [u8; 3] = [0x7A, 0x7A, 0x7A];
    /// Green (healthy).
    pub const GREEN: [u8; 3] = [0x28, 0xA7, 0x45];
    /// Black (dead).
    pub const BLACK: [u8; 3] = [0x00, 0x00, 0x00];
    /// Coral coverage slice.
    pub const CORAL: [u8; 3] = [0xEA, 0xB3, 0x08];
}
