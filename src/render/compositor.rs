//! Mask compositor.
//!
//! Rasterizes the masks of the current image into cached RGBA layers and
//! composites them over the base image through the pan/zoom viewport:
//!
//! - the mask layer holds category fills plus bleached borders at full alpha
//! - the glyph layer holds the centroid badges
//! - the edit layer holds the candidate mask and prompt dots while creating
//!
//! Opacity is applied when drawing, so changing it never re-rasterizes.

use image::{Rgba, RgbaImage, imageops};
use web_time::Instant;

use crate::color_utils::opaque;
use crate::constants::{
    BACKGROUND_PROMPT_COLOR, BADGE_FONT_RATIO, BADGE_OUTLINE_COLOR, BADGE_RADIUS_RATIO,
    BORDER_RADIUS_RATIO, DEFAULT_EDIT_MASK_OPACITY, DEFAULT_MASK_OPACITY,
    FOREGROUND_PROMPT_COLOR, MAX_BADGE_FONT_SIZE, MIN_BADGE_FONT_SIZE, PROMPT_RADIUS_RATIO,
};
use crate::editor::{Prompt, PromptLabel};
use crate::model::{Category, HealthStatus, ImageData, Mask, Taxonomy};
use crate::render::glyph::draw_text_centered;
use crate::render::raster::{border_pixels, fill_circle, fill_mask, overlay};
use crate::render::viewport::{CanvasRect, Viewport, canvas_pixel_to_image_pixel};

/// Background colour used where nothing is drawn.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

fn rgba(rgb: [u8; 3]) -> Rgba<u8> {
    Rgba(opaque(rgb))
}

/// Badge font size for an image: 4% of the short side, capped.
pub fn badge_font_size(width: u32, height: u32) -> u32 {
    let size = (width.min(height) as f32 * BADGE_FONT_RATIO).floor() as u32;
    size.clamp(MIN_BADGE_FONT_SIZE, MAX_BADGE_FONT_SIZE)
}

/// Radius of the border dots drawn around bleached masks.
pub fn border_radius(width: u32, height: u32) -> f32 {
    width.min(height) as f32 * BORDER_RADIUS_RATIO
}

/// Radius of prompt dots on the edit layer.
pub fn prompt_radius(width: u32, height: u32) -> f32 {
    width.min(height) as f32 * PROMPT_RADIUS_RATIO
}

/// Rasterized overlay layers for one image plus the viewport they are shown through.
#[derive(Debug, Clone)]
pub struct MaskCompositor {
    width: u32,
    height: u32,
    mask_layer: RgbaImage,
    glyph_layer: RgbaImage,
    edit_layer: RgbaImage,
    has_edit: bool,
    mask_opacity: f32,
    edit_opacity: f32,
    show_masks: bool,
    viewport: Viewport,
    /// Canvas rectangle of the image in the last `draw`
    last_image_rect: Option<CanvasRect>,
}

impl MaskCompositor {
    /// Create empty layers for a `width x height` image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            mask_layer: RgbaImage::new(width, height),
            glyph_layer: RgbaImage::new(width, height),
            edit_layer: RgbaImage::new(width, height),
            has_edit: false,
            mask_opacity: DEFAULT_MASK_OPACITY,
            edit_opacity: DEFAULT_EDIT_MASK_OPACITY,
            show_masks: true,
            viewport: Viewport::identity(),
            last_image_rect: None,
        }
    }

    /// Set the mask and edit layer opacities.
    pub fn with_opacity(mut self, mask_opacity: f32, edit_opacity: f32) -> Self {
        self.mask_opacity = mask_opacity.clamp(0.0, 1.0);
        self.edit_opacity = edit_opacity.clamp(0.0, 1.0);
        self
    }

    /// Reallocate the layers for a new image. The viewport is kept.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.mask_layer = RgbaImage::new(width, height);
        self.glyph_layer = RgbaImage::new(width, height);
        self.edit_layer = RgbaImage::new(width, height);
        self.has_edit = false;
        self.last_image_rect = None;
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn mask_layer(&self) -> &RgbaImage {
        &self.mask_layer
    }

    pub fn glyph_layer(&self) -> &RgbaImage {
        &self.glyph_layer
    }

    pub fn edit_layer(&self) -> Option<&RgbaImage> {
        self.has_edit.then_some(&self.edit_layer)
    }

    pub fn mask_opacity(&self) -> f32 {
        self.mask_opacity
    }

    /// Change the mask opacity. The cached layers are untouched.
    pub fn set_mask_opacity(&mut self, opacity: f32) {
        self.mask_opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn set_show_masks(&mut self, show: bool) {
        self.show_masks = show;
    }

    pub fn show_masks(&self) -> bool {
        self.show_masks
    }

    /// Rebuild the mask and glyph layers from scratch.
    ///
    /// Selected masks are filled with `selection_color` when one is given.
    /// Masks that fail to decode are skipped; the count of skipped masks is
    /// returned.
    pub fn update_masks(
        &mut self,
        data: &ImageData,
        taxonomy: &Taxonomy,
        selection_color: Option<[u8; 3]>,
    ) -> usize {
        let start = Instant::now();
        if (data.width(), data.height()) != (self.width, self.height) {
            self.resize(data.width(), data.height());
        }
        self.mask_layer = RgbaImage::new(self.width, self.height);
        self.glyph_layer = RgbaImage::new(self.width, self.height);

        let mut skipped = 0;
        for mask in data.masks().iter().filter(|m| m.should_display()) {
            let decoded = match mask.decoded() {
                Ok(decoded) => decoded,
                Err(e) => {
                    log::warn!("Skipping mask {}: {}", mask.id(), e);
                    skipped += 1;
                    continue;
                }
            };

            let fill = match selection_color {
                Some(color) if mask.is_selected() => color,
                _ => taxonomy.fill_color(mask.category_id()),
            };
            fill_mask(&mut self.mask_layer, decoded, rgba(fill));

            let category = taxonomy.get(mask.category_id());
            if category.is_some_and(|c| c.status == HealthStatus::Bleached) {
                let radius = border_radius(self.width, self.height);
                let color = rgba(taxonomy.border_color(mask.category_id()));
                for (x, y) in border_pixels(decoded) {
                    fill_circle(&mut self.mask_layer, x as f32 + 0.5, y as f32 + 0.5, radius, color);
                }
            }

            if let Some(category) = category.filter(|c| !c.is_sentinel()) {
                self.draw_badge(mask, category, taxonomy);
            }
        }

        log::debug!(
            "Rebuilt mask layers for {} masks in {:?}",
            data.masks().len(),
            start.elapsed()
        );
        skipped
    }

    fn draw_badge(&mut self, mask: &Mask, category: &Category, taxonomy: &Taxonomy) {
        let Some((mx, my)) = mask.centroid() else {
            return;
        };
        let font_size = badge_font_size(self.width, self.height);
        let radius = font_size as f32 * BADGE_RADIUS_RATIO;
        let cx = mx as f32 + radius / 2.0;
        let cy = my as f32 - radius / 2.0;

        fill_circle(&mut self.glyph_layer, cx, cy, radius + 1.0, rgba(BADGE_OUTLINE_COLOR));
        fill_circle(
            &mut self.glyph_layer,
            cx,
            cy,
            radius,
            rgba(taxonomy.fill_color(category.id)),
        );
        draw_text_centered(
            &mut self.glyph_layer,
            &category.display_code(),
            cx,
            cy,
            font_size,
            rgba(taxonomy.text_color(category.id)),
        );
    }

    /// Rebuild the edit layer from the candidate mask and the prompt points.
    pub fn update_edit_layer(&mut self, candidate: Option<&Mask>, color: [u8; 3], prompts: &[Prompt]) {
        self.edit_layer = RgbaImage::new(self.width, self.height);
        if let Some(candidate) = candidate {
            match candidate.decoded() {
                Ok(decoded) => fill_mask(&mut self.edit_layer, decoded, rgba(color)),
                Err(e) => log::warn!("Candidate mask not drawn: {}", e),
            }
        }

        let radius = prompt_radius(self.width, self.height);
        for prompt in prompts {
            let dot = match prompt.label {
                PromptLabel::Foreground => FOREGROUND_PROMPT_COLOR,
                PromptLabel::Background => BACKGROUND_PROMPT_COLOR,
            };
            fill_circle(
                &mut self.edit_layer,
                prompt.x as f32 + 0.5,
                prompt.y as f32 + 0.5,
                radius,
                rgba(dot),
            );
        }
        self.has_edit = candidate.is_some() || !prompts.is_empty();
    }

    pub fn clear_edit_layer(&mut self) {
        self.edit_layer = RgbaImage::new(self.width, self.height);
        self.has_edit = false;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Fit the image into the canvas.
    pub fn reset_viewpoint(&mut self, canvas_w: u32, canvas_h: u32) {
        self.viewport = Viewport::fit(
            canvas_w as f32,
            canvas_h as f32,
            self.width as f32,
            self.height as f32,
        );
    }

    /// One wheel step at a canvas point.
    pub fn zoom_at(&mut self, delta_y: f32, cursor_x: f32, cursor_y: f32, intensity: f32) {
        self.viewport = self.viewport.wheel(delta_y, cursor_x, cursor_y, intensity);
    }

    /// Drag by a canvas-space delta.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.viewport = self.viewport.pan_by(dx, dy);
    }

    /// Image pixel under a canvas pixel, using the image rectangle of the last draw.
    pub fn canvas_pixel_to_image_pixel(&self, canvas_x: f32, canvas_y: f32) -> Option<(u32, u32)> {
        let rect = self
            .last_image_rect
            .unwrap_or_else(|| self.viewport.image_rect(self.width, self.height));
        canvas_pixel_to_image_pixel(canvas_x, canvas_y, rect, self.width, self.height)
    }

    /// Composite base image, masks (at the mask opacity) and the edit layer in
    /// image space, without the viewport.
    pub fn compose(&self, base: &RgbaImage) -> RgbaImage {
        let mut out = if base.dimensions() == (self.width, self.height) {
            base.clone()
        } else {
            log::warn!(
                "Base image is {:?}, masks are {:?}; resizing base",
                base.dimensions(),
                (self.width, self.height)
            );
            imageops::resize(base, self.width, self.height, imageops::FilterType::Nearest)
        };

        if self.show_masks {
            overlay(&mut out, &self.mask_layer, self.mask_opacity);
            overlay(&mut out, &self.glyph_layer, self.mask_opacity);
        }
        if self.has_edit {
            overlay(&mut out, &self.edit_layer, self.edit_opacity);
        }
        out
    }

    /// Render one frame of `canvas_w x canvas_h` through the viewport.
    ///
    /// Canvas pixels outside the image stay transparent.
    pub fn draw(&mut self, base: &RgbaImage, canvas_w: u32, canvas_h: u32) -> RgbaImage {
        let composed = self.compose(base);
        let mut canvas = RgbaImage::new(canvas_w, canvas_h);
        let viewport = self.viewport;

        for (cx, cy, pixel) in canvas.enumerate_pixels_mut() {
            let (ix, iy) = viewport.canvas_to_image(cx as f32 + 0.5, cy as f32 + 0.5);
            if ix < 0.0 || iy < 0.0 {
                continue;
            }
            let (ix, iy) = (ix.floor() as u32, iy.floor() as u32);
            if ix < self.width && iy < self.height {
                *pixel = *composed.get_pixel(ix, iy);
            }
        }

        self.last_image_rect = Some(viewport.image_rect(self.width, self.height));
        canvas
    }
}
