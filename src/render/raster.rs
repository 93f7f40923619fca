//! Pixel-level drawing primitives on RGBA layers.

use image::{Rgba, RgbaImage};
use ndarray::Array2;

/// Blend `src` over `dst` (source-over), with `src`'s alpha scaled by `opacity`.
pub fn blend_pixel(dst: &mut Rgba<u8>, src: Rgba<u8>, opacity: f32) {
    let alpha = (src[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let dst_alpha = dst[3] as f32 / 255.0;
    let out_alpha = alpha + dst_alpha * (1.0 - alpha);
    if out_alpha <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    for channel in 0..3 {
        let s = src[channel] as f32;
        let d = dst[channel] as f32;
        let value = (s * alpha + d * dst_alpha * (1.0 - alpha)) / out_alpha;
        dst[channel] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Blend a whole layer of the same size over `dst`.
pub fn overlay(dst: &mut RgbaImage, layer: &RgbaImage, opacity: f32) {
    if dst.dimensions() != layer.dimensions() {
        log::warn!(
            "Layer size {:?} does not match target {:?}, skipping",
            layer.dimensions(),
            dst.dimensions()
        );
        return;
    }
    for (d, s) in dst.pixels_mut().zip(layer.pixels()) {
        blend_pixel(d, *s, opacity);
    }
}

/// Paint a filled circle, replacing the pixels it covers.
///
/// A pixel is covered when its centre is within `radius` of `(cx, cy)`; radii
/// below half a pixel still paint the pixel containing the centre.
pub fn fill_circle(layer: &mut RgbaImage, cx: f32, cy: f32, radius: f32, color: Rgba<u8>) {
    let (width, height) = layer.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let radius = radius.max(0.5);
    let r2 = radius * radius;

    let x0 = (cx - radius).floor().max(0.0) as u32;
    let y0 = (cy - radius).floor().max(0.0) as u32;
    let x1 = ((cx + radius).ceil().max(0.0) as u32).min(width - 1);
    let y1 = ((cy + radius).ceil().max(0.0) as u32).min(height - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= r2 {
                layer.put_pixel(x, y, color);
            }
        }
    }
}

/// Whether a foreground pixel touches background (or the image edge) through
/// one of its four neighbours.
pub fn is_border_pixel(mask: &Array2<u8>, row: usize, col: usize) -> bool {
    if mask.get((row, col)).is_none_or(|&v| v == 0) {
        return false;
    }
    let (rows, cols) = mask.dim();
    if row == 0 || col == 0 || row + 1 == rows || col + 1 == cols {
        return true;
    }
    mask[[row - 1, col]] == 0
        || mask[[row + 1, col]] == 0
        || mask[[row, col - 1]] == 0
        || mask[[row, col + 1]] == 0
}

/// All border pixels of a mask as `(x, y)`.
pub fn border_pixels(mask: &Array2<u8>) -> Vec<(u32, u32)> {
    mask.indexed_iter()
        .filter(|&((row, col), _)| is_border_pixel(mask, row, col))
        .map(|((row, col), _)| (col as u32, row as u32))
        .collect()
}

/// Paint every foreground pixel of `mask` with `color`.
pub fn fill_mask(layer: &mut RgbaImage, mask: &Array2<u8>, color: Rgba<u8>) {
    for ((row, col), &value) in mask.indexed_iter() {
        if value == 0 {
            continue;
        }
        if let Some(pixel) = layer.get_pixel_mut_checked(col as u32, row as u32) {
            *pixel = color;
        }
    }
}
