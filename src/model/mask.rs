//! Mask entity: one segmented region of an image and its category.

use std::cell::OnceCell;

use ndarray::Array2;

use crate::error::RleError;
use crate::model::category::CategoryId;
use crate::rle::{self, PixelBounds, RlePolicy};

/// Unique identifier for a mask within one image.
pub type MaskId = u64;

/// A segmented region.
///
/// The run-length form is kept exactly as loaded so export can echo it; the
/// dense buffer is decoded lazily on first access and cached.
#[derive(Debug, Clone)]
pub struct Mask {
    id: MaskId,
    category_id: CategoryId,
    runs: Vec<u32>,
    width: u32,
    height: u32,
    policy: RlePolicy,
    /// Area as stored in the project file, if any
    stored_area: Option<u64>,
    /// `[x, y, w, h]` as stored in the project file, if any
    stored_bbox: Option<[f64; 4]>,
    /// Backend confidence score, passed through on export
    predicted_iou: Option<f64>,
    should_display: bool,
    selected: bool,
    decoded: OnceCell<Result<Array2<u8>, RleError>>,
    bounds: OnceCell<Option<PixelBounds>>,
}

impl Mask {
    /// Create a mask from row-major runs for a `width x height` image.
    pub fn from_runs(
        id: MaskId,
        category_id: CategoryId,
        runs: Vec<u32>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            id,
            category_id,
            runs,
            width,
            height,
            policy: RlePolicy::Strict,
            stored_area: None,
            stored_bbox: None,
            predicted_iou: None,
            should_display: true,
            selected: false,
            decoded: OnceCell::new(),
            bounds: OnceCell::new(),
        }
    }

    /// Set the decode policy used for the dense buffer.
    pub fn with_policy(mut self, policy: RlePolicy) -> Self {
        self.policy = policy;
        self.decoded = OnceCell::new();
        self
    }

    /// Attach the geometry stored alongside the runs.
    pub fn with_stored_geometry(mut self, area: Option<u64>, bbox: Option<[f64; 4]>) -> Self {
        self.stored_area = area;
        self.stored_bbox = bbox;
        self
    }

    /// Attach a backend confidence score.
    pub fn with_predicted_iou(mut self, predicted_iou: Option<f64>) -> Self {
        self.predicted_iou = predicted_iou;
        self
    }

    pub fn id(&self) -> MaskId {
        self.id
    }

    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    /// Reassign the category. Does not touch the region.
    pub fn set_category_id(&mut self, category_id: CategoryId) {
        self.category_id = category_id;
    }

    /// The runs exactly as held.
    pub fn runs(&self) -> &[u32] {
        &self.runs
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn predicted_iou(&self) -> Option<f64> {
        self.predicted_iou
    }

    /// Dense `height x width` buffer of 0/1 values, decoded once.
    pub fn decoded(&self) -> Result<&Array2<u8>, RleError> {
        self.decoded
            .get_or_init(|| rle::decode_with_policy(&self.runs, self.width, self.height, self.policy))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Number of foreground pixels.
    pub fn area(&self) -> u64 {
        self.stored_area.unwrap_or_else(|| rle::area(&self.runs))
    }

    /// Foreground bounds computed from the runs.
    pub fn bounds(&self) -> Option<PixelBounds> {
        *self
            .bounds
            .get_or_init(|| rle::bounding_box(&self.runs, self.width, self.height))
    }

    /// `[x, y, w, h]` bounding box, preferring the stored value.
    pub fn bbox(&self) -> [f64; 4] {
        self.stored_bbox
            .or_else(|| self.bounds().map(|b| b.to_xywh()))
            .unwrap_or([0.0; 4])
    }

    /// Mean foreground pixel position `(x, y)`, rounded down.
    ///
    /// `None` for an empty mask or one that failed to decode.
    pub fn centroid(&self) -> Option<(u32, u32)> {
        let mask = match self.decoded() {
            Ok(mask) => mask,
            Err(e) => {
                log::warn!("Mask {} has no centroid: {}", self.id, e);
                return None;
            }
        };

        let (mut sum_x, mut sum_y, mut count) = (0u64, 0u64, 0u64);
        for ((y, x), &value) in mask.indexed_iter() {
            if value != 0 {
                sum_x += x as u64;
                sum_y += y as u64;
                count += 1;
            }
        }
        if count == 0 {
            return None;
        }
        Some(((sum_x / count) as u32, (sum_y / count) as u32))
    }

    /// Check whether an image pixel is foreground.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        if !self.bounds().is_some_and(|b| b.contains(x, y)) {
            return false;
        }
        match self.decoded() {
            Ok(mask) => mask
                .get((y as usize, x as usize))
                .is_some_and(|&value| value != 0),
            Err(_) => false,
        }
    }

    pub fn should_display(&self) -> bool {
        self.should_display
    }

    /// Set by external filters (confidence, size, category visibility).
    pub fn set_should_display(&mut self, display: bool) {
        self.should_display = display;
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// Flip the selection flag, returning the new state.
    pub fn toggle_selected(&mut self) -> bool {
        self.selected = !self.selected;
        self.selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 4x3 image:
    // . X X .
    // . X X .
    // . . . .
    fn square() -> Mask {
        Mask::from_runs(7, 1, vec![1, 2, 2, 2, 5], 4, 3)
    }

    #[test]
    fn test_decoded_is_cached() {
        let mask = square();
        let first = mask.decoded().unwrap() as *const Array2<u8>;
        let second = mask.decoded().unwrap() as *const Array2<u8>;
        assert_eq!(first, second);
        assert_eq!(mask.decoded().unwrap()[[1, 2]], 1);
    }

    #[test]
    fn test_area_and_bbox() {
        let mask = square();
        assert_eq!(mask.area(), 4);
        assert_eq!(mask.bbox(), [1.0, 0.0, 2.0, 2.0]);

        let stored = square().with_stored_geometry(Some(99), Some([0.0, 0.0, 1.0, 1.0]));
        assert_eq!(stored.area(), 99);
        assert_eq!(stored.bbox(), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_centroid_floors_mean() {
        // mean x = (1+2+1+2)/4 = 1.5, mean y = (0+0+1+1)/4 = 0.5
        assert_eq!(square().centroid(), Some((1, 0)));
    }

    #[test]
    fn test_centroid_empty_mask() {
        let empty = Mask::from_runs(1, 1, vec![12], 4, 3);
        assert_eq!(empty.centroid(), None);
        assert_eq!(empty.area(), 0);
        assert_eq!(empty.bbox(), [0.0; 4]);
    }

    #[test]
    fn test_centroid_malformed_mask() {
        let broken = Mask::from_runs(1, 1, vec![3, 20], 4, 3);
        assert!(broken.decoded().is_err());
        assert_eq!(broken.centroid(), None);
        assert!(!broken.contains(0, 0));
    }

    #[test]
    fn test_contains() {
        let mask = square();
        assert!(mask.contains(1, 0));
        assert!(mask.contains(2, 1));
        assert!(!mask.contains(0, 0));
        assert!(!mask.contains(3, 2));
        assert!(!mask.contains(40, 40));
    }

    #[test]
    fn test_selection_toggle() {
        let mut mask = square();
        assert!(mask.toggle_selected());
        assert!(!mask.toggle_selected());
        assert!(!mask.is_selected());
    }

    #[test]
    fn test_runs_preserved() {
        let runs = vec![0, 1, 0, 3, 8];
        let mask = Mask::from_runs(1, 1, runs.clone(), 4, 3);
        assert_eq!(mask.runs(), runs.as_slice());
    }
}
