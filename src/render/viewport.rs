//! Pan/zoom viewport mathematics.
//!
//! A canvas point `c` shows image point `c / scale + origin`, so the image's
//! top-left corner lands at `-origin * scale` on the canvas.

/// Pan/zoom state of the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub origin_x: f32,
    pub origin_y: f32,
}

/// Image rectangle in canvas pixels, as last drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasRect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl CanvasRect {
    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    pub fn height(&self) -> i64 {
        self.bottom - self.top
    }
}

impl Viewport {
    pub fn new(scale: f32, origin_x: f32, origin_y: f32) -> Self {
        Self {
            scale,
            origin_x,
            origin_y,
        }
    }

    /// Scale 1, image at the canvas origin.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Fit the whole image into the canvas, centred.
    pub fn fit(canvas_w: f32, canvas_h: f32, image_w: f32, image_h: f32) -> Self {
        if image_w <= 0.0 || image_h <= 0.0 || canvas_w <= 0.0 || canvas_h <= 0.0 {
            return Self::identity();
        }
        let scale = (canvas_w / image_w).min(canvas_h / image_h);
        let offset_x = (canvas_w - image_w * scale) / 2.0;
        let offset_y = (canvas_h - image_h * scale) / 2.0;
        Self::new(scale, -offset_x / scale, -offset_y / scale)
    }

    /// Zoom factor for one wheel step: scrolling up (negative delta) zooms in.
    pub fn wheel_zoom_factor(delta_y: f32, intensity: f32) -> f32 {
        let wheel = if delta_y < 0.0 { 1.0 } else { -1.0 };
        (wheel * intensity).exp()
    }

    /// Zoom by `zoom` keeping the image point under the cursor fixed.
    ///
    /// The scale is multiplied, never incremented, so repeated steps do not drift.
    pub fn zoom_to_cursor(&self, zoom: f32, cursor_x: f32, cursor_y: f32) -> Viewport {
        let new_scale = self.scale * zoom;
        Viewport {
            scale: new_scale,
            origin_x: self.origin_x - (cursor_x / new_scale - cursor_x / self.scale),
            origin_y: self.origin_y - (cursor_y / new_scale - cursor_y / self.scale),
        }
    }

    /// Apply one mouse-wheel step at the cursor.
    pub fn wheel(&self, delta_y: f32, cursor_x: f32, cursor_y: f32, intensity: f32) -> Viewport {
        self.zoom_to_cursor(Self::wheel_zoom_factor(delta_y, intensity), cursor_x, cursor_y)
    }

    /// Drag the image by a canvas-space delta.
    pub fn pan_by(&self, dx: f32, dy: f32) -> Viewport {
        Viewport {
            scale: self.scale,
            origin_x: self.origin_x - dx / self.scale,
            origin_y: self.origin_y - dy / self.scale,
        }
    }

    /// Image point shown at a canvas point, unrounded.
    pub fn canvas_to_image(&self, canvas_x: f32, canvas_y: f32) -> (f32, f32) {
        (
            canvas_x / self.scale + self.origin_x,
            canvas_y / self.scale + self.origin_y,
        )
    }

    /// Canvas point showing an image point.
    pub fn image_to_canvas(&self, image_x: f32, image_y: f32) -> (f32, f32) {
        (
            (image_x - self.origin_x) * self.scale,
            (image_y - self.origin_y) * self.scale,
        )
    }

    /// Canvas rectangle covered by an `image_w x image_h` image.
    pub fn image_rect(&self, image_w: u32, image_h: u32) -> CanvasRect {
        CanvasRect {
            left: (-self.origin_x * self.scale).floor() as i64,
            top: (-self.origin_y * self.scale).floor() as i64,
            right: ((image_w as f32 - self.origin_x) * self.scale).floor() as i64,
            bottom: ((image_h as f32 - self.origin_y) * self.scale).floor() as i64,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::identity()
    }
}

/// Map a canvas pixel to an image pixel through the last drawn image rectangle.
///
/// Returns `None` outside the image or for a degenerate rectangle.
pub fn canvas_pixel_to_image_pixel(
    canvas_x: f32,
    canvas_y: f32,
    rect: CanvasRect,
    image_w: u32,
    image_h: u32,
) -> Option<(u32, u32)> {
    if rect.width() <= 0 || rect.height() <= 0 {
        return None;
    }
    let x = ((canvas_x - rect.left as f32) / rect.width() as f32 * image_w as f32).floor();
    let y = ((canvas_y - rect.top as f32) / rect.height() as f32 * image_h as f32).floor();
    if x < 0.0 || y < 0.0 || x >= image_w as f32 || y >= image_h as f32 {
        return None;
    }
    Some((x as u32, y as u32))
}
