//! Display filter: which masks of an image are drawn and hit-tested.
//!
//! A mask is shown when it passes every enabled criterion. Filtering never
//! removes masks; hidden masks are still stored, exported and counted.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::category::CategoryId;
use crate::model::image_data::ImageData;
use crate::model::mask::Mask;

/// Thresholds deciding mask visibility. Every criterion is off by default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayFilter {
    /// Hide masks whose area is not above this fraction of the image area
    #[serde(default)]
    pub min_area_ratio: Option<f64>,

    /// Hide masks whose predicted IoU is not above this value.
    /// Masks without a score pass.
    #[serde(default)]
    pub min_predicted_iou: Option<f64>,

    /// Among masks overlapping by more than this IoU, only the largest is shown
    #[serde(default)]
    pub max_overlap_iou: Option<f64>,

    /// Categories whose masks are hidden
    #[serde(default)]
    pub hidden_categories: BTreeSet<CategoryId>,
}

impl DisplayFilter {
    /// Whether any criterion is enabled.
    pub fn is_active(&self) -> bool {
        self.min_area_ratio.is_some()
            || self.min_predicted_iou.is_some()
            || self.max_overlap_iou.is_some()
            || !self.hidden_categories.is_empty()
    }

    /// Hide or show one category.
    pub fn set_category_hidden(&mut self, category_id: CategoryId, hidden: bool) {
        if hidden {
            self.hidden_categories.insert(category_id);
        } else {
            self.hidden_categories.remove(&category_id);
        }
    }

    /// Set the display flag of every mask in `data`, returning how many are
    /// hidden. Hidden masks are deselected.
    pub fn apply(&self, data: &mut ImageData) -> usize {
        let visible = self.visible_flags(data);
        let mut hidden = 0;
        for (mask, show) in data.masks_mut().iter_mut().zip(visible) {
            mask.set_should_display(show);
            if !show {
                mask.set_selected(false);
                hidden += 1;
            }
        }
        if hidden > 0 {
            log::debug!("Display filter hides {} masks on '{}'", hidden, data.file_name());
        }
        hidden
    }

    fn visible_flags(&self, data: &ImageData) -> Vec<bool> {
        let min_area = self
            .min_area_ratio
            .map(|ratio| ratio * data.image_area() as f64);
        let mut visible: Vec<bool> = data
            .masks()
            .iter()
            .map(|mask| {
                !self.hidden_categories.contains(&mask.category_id())
                    && min_area.is_none_or(|min| mask.area() as f64 > min)
                    && self
                        .min_predicted_iou
                        .is_none_or(|min| mask.predicted_iou().is_none_or(|iou| iou > min))
            })
            .collect();

        if let Some(limit) = self.max_overlap_iou {
            let kept = suppress_overlaps(data.masks(), limit);
            for (show, keep) in visible.iter_mut().zip(kept) {
                *show &= keep;
            }
        }
        visible
    }
}

/// Greedy suppression from the largest mask down: a mask is dropped when its
/// IoU with an already kept mask exceeds `limit`. Masks that fail to decode
/// are never compared.
fn suppress_overlaps(masks: &[Mask], limit: f64) -> Vec<bool> {
    let mut order: Vec<usize> = (0..masks.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(masks[i].area()));

    let mut keep = vec![true; masks.len()];
    let mut kept: Vec<usize> = Vec::new();
    for i in order {
        let suppressed = kept
            .iter()
            .any(|&k| iou(&masks[k], &masks[i]).is_some_and(|value| value > limit));
        if suppressed {
            keep[i] = false;
        } else {
            kept.push(i);
        }
    }
    keep
}

fn iou(a: &Mask, b: &Mask) -> Option<f64> {
    let (a, b) = (a.decoded().ok()?, b.decoded().ok()?);
    if a.dim() != b.dim() {
        return None;
    }
    let (mut intersection, mut union) = (0u64, 0u64);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x != 0, y != 0);
        intersection += u64::from(x && y);
        union += u64::from(x || y);
    }
    (union > 0).then(|| intersection as f64 / union as f64)
}
