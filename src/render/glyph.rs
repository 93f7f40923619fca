//! Minimal bitmap font for centroid badge codes.
//!
//! Badge codes only ever contain decimal digits and a trailing `B`, so a 3x5
//! cell font scaled by whole pixels is enough.

use image::{Rgba, RgbaImage};

const GLYPH_WIDTH: u32 = 3;
const GLYPH_HEIGHT: u32 = 5;

/// Rows of a glyph, top to bottom; bit 2 is the leftmost column.
fn glyph_rows(c: char) -> Option<[u8; 5]> {
    let rows = match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        _ => return None,
    };
    Some(rows)
}

/// Pixel size of one font cell for a given font size.
fn cell_size(font_size: u32) -> u32 {
    (font_size / GLYPH_HEIGHT).max(1)
}

/// Width and height in pixels of `text` drawn at `font_size`.
pub fn text_extent(text: &str, font_size: u32) -> (u32, u32) {
    let cell = cell_size(font_size);
    let count = text.chars().count() as u32;
    if count == 0 {
        return (0, 0);
    }
    let columns = count * (GLYPH_WIDTH + 1) - 1;
    (columns * cell, GLYPH_HEIGHT * cell)
}

/// Draw `text` centred on `(cx, cy)`. Unsupported characters leave a blank cell.
pub fn draw_text_centered(
    layer: &mut RgbaImage,
    text: &str,
    cx: f32,
    cy: f32,
    font_size: u32,
    color: Rgba<u8>,
) {
    let cell = cell_size(font_size);
    let (text_w, text_h) = text_extent(text, font_size);
    let left = (cx - text_w as f32 / 2.0).round() as i64;
    let top = (cy - text_h as f32 / 2.0).round() as i64;
    let (width, height) = layer.dimensions();

    for (i, c) in text.chars().enumerate() {
        let Some(rows) = glyph_rows(c) else {
            log::debug!("No glyph for {:?}", c);
            continue;
        };
        let glyph_left = left + (i as i64) * ((GLYPH_WIDTH + 1) * cell) as i64;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let x0 = glyph_left + (col * cell) as i64;
                let y0 = top + (row as u32 * cell) as i64;
                for y in y0..y0 + cell as i64 {
                    for x in x0..x0 + cell as i64 {
                        if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                            layer.put_pixel(x as u32, y as u32, color);
                        }
                    }
                }
            }
        }
    }
}
