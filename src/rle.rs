//! Run-length codec for binary masks.
//!
//! A mask is stored as alternating run lengths in row-major raster order,
//! starting with a background (0) run. A mask whose first pixel is foreground
//! therefore begins with a zero-length run.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::RleError;

/// How [`decode_with_policy`] treats runs that do not sum to `width * height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RlePolicy {
    /// Reject the mask with [`RleError::MalformedRunLength`].
    #[default]
    Strict,
    /// Drop pixels past the end and pad a short mask with background.
    Clamp,
}

/// Decode runs into a dense `height x width` buffer of 0/1 values.
///
/// Strict: the runs must cover exactly `width * height` pixels.
pub fn decode(runs: &[u32], width: u32, height: u32) -> Result<Array2<u8>, RleError> {
    decode_with_policy(runs, width, height, RlePolicy::Strict)
}

/// Decode runs into a dense buffer, handling a length mismatch per `policy`.
pub fn decode_with_policy(
    runs: &[u32],
    width: u32,
    height: u32,
    policy: RlePolicy,
) -> Result<Array2<u8>, RleError> {
    let expected = width as usize * height as usize;
    let actual: usize = runs.iter().map(|&r| r as usize).sum();

    if actual != expected {
        match policy {
            RlePolicy::Strict => return Err(RleError::MalformedRunLength { expected, actual }),
            RlePolicy::Clamp => log::warn!(
                "RLE covers {} pixels but mask has {}, clamping",
                actual,
                expected
            ),
        }
    }

    let mut flat = vec![0u8; expected];
    let mut index = 0usize;
    let mut value = 0u8;
    for &run in runs {
        if index >= expected {
            break;
        }
        let end = (index + run as usize).min(expected);
        if value == 1 {
            flat[index..end].fill(1);
        }
        index = end;
        value = 1 - value;
    }

    // Shape is (rows, cols); the length always matches by construction.
    Array2::from_shape_vec((height as usize, width as usize), flat).map_err(|_| {
        RleError::MalformedRunLength { expected, actual }
    })
}

/// Encode a flat row-major 0/1 buffer into runs starting with background.
///
/// Any non-zero value counts as foreground.
pub fn encode(pixels: &[u8]) -> Vec<u32> {
    let mut runs = Vec::new();
    let mut current = 0u8;
    let mut count = 0u32;

    for &pixel in pixels {
        let value = u8::from(pixel != 0);
        if value != current {
            runs.push(count);
            count = 0;
            current = value;
        }
        count += 1;
    }
    runs.push(count);
    runs
}

/// Encode a dense mask (as produced by [`decode`]).
pub fn encode_mask(mask: &Array2<u8>) -> Vec<u32> {
    // Iteration order of a standard-layout Array2 is row-major.
    let flat: Vec<u8> = mask.iter().copied().collect();
    encode(&flat)
}

/// Number of foreground pixels (sum of the odd-indexed runs).
pub fn area(runs: &[u32]) -> u64 {
    runs.iter().skip(1).step_by(2).map(|&r| r as u64).sum()
}

/// Pixel-inclusive bounding box of the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBounds {
    /// Leftmost foreground column
    pub min_x: u32,
    /// Topmost foreground row
    pub min_y: u32,
    /// Rightmost foreground column
    pub max_x: u32,
    /// Bottom foreground row
    pub max_y: u32,
}

impl PixelBounds {
    /// Check whether a pixel lies inside the bounds.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// COCO-style `[x, y, width, height]`.
    pub fn to_xywh(&self) -> [f64; 4] {
        [
            self.min_x as f64,
            self.min_y as f64,
            (self.max_x - self.min_x + 1) as f64,
            (self.max_y - self.min_y + 1) as f64,
        ]
    }
}

/// Bounding box of the foreground computed from the runs without decoding.
///
/// Runs past `width * height` are ignored. Returns `None` for an empty mask.
pub fn bounding_box(runs: &[u32], width: u32, height: u32) -> Option<PixelBounds> {
    if width == 0 || height == 0 {
        return None;
    }
    let width = width as usize;
    let total = width * height as usize;

    let mut bounds: Option<PixelBounds> = None;
    let mut start = 0usize;
    for (i, &run) in runs.iter().enumerate() {
        let run = run as usize;
        if i % 2 == 1 && run > 0 && start < total {
            let end = (start + run).min(total) - 1;
            let (y0, x0) = (start / width, start % width);
            let (y1, x1) = (end / width, end % width);
            // A run wrapping onto another row spans every column in between.
            let (min_x, max_x) = if y0 == y1 { (x0, x1) } else { (0, width - 1) };

            let b = bounds.get_or_insert(PixelBounds {
                min_x: min_x as u32,
                min_y: y0 as u32,
                max_x: max_x as u32,
                max_y: y1 as u32,
            });
            b.min_x = b.min_x.min(min_x as u32);
            b.max_x = b.max_x.max(max_x as u32);
            b.min_y = b.min_y.min(y0 as u32);
            b.max_y = b.max_y.max(y1 as u32);
        }
        start += run;
    }
    bounds
}

/// Normalize runs for comparison: merge zero-length interior runs and drop a
/// trailing zero-length run. A leading zero run is kept since it marks a
/// foreground first pixel.
pub fn normalize(runs: &[u32]) -> Vec<u32> {
    let mut out: Vec<u32> = Vec::with_capacity(runs.len());
    let mut i = 0;
    while i < runs.len() {
        let run = runs[i];
        if run == 0 && i > 0 && i + 1 < runs.len() {
            // A zero run between two runs of the same value joins them.
            if let Some(last) = out.last_mut() {
                *last += runs[i + 1];
            }
            i += 2;
            continue;
        }
        out.push(run);
        i += 1;
    }
    while out.len() > 1 && out.last() == Some(&0) {
        out.pop();
    }
    out
}
