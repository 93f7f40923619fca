//! Per-image statistics derived from the mask set.
//!
//! Everything is recomputed from scratch by [`Statistics::compute`]; nothing
//! is maintained incrementally. Overlapping masks are counted once per mask,
//! so remainders saturate at zero.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::color_utils::rgb_to_hex;
use crate::constants::chart;
use crate::model::{
    CategoryId, HealthStatus, ImageData, PREDICTED_CORAL_ID, SuperCategoryId, Taxonomy,
};

/// Label of the remainder slice in coverage charts.
pub const NON_CORAL_LABEL: &str = "Non-Coral";

/// Coral / undefined / non-coral pixel split of one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Coverage {
    /// Pixels under coral masks with a known status
    pub coral: u64,
    /// Pixels under coral masks with undefined status (0 when ignored)
    pub undefined: u64,
    /// Everything else
    pub non_coral: u64,
}

/// Healthy vs bleached area of one species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SpeciesCondition {
    pub healthy: u64,
    pub bleached: u64,
}

/// One slice of a chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartEntry {
    pub label: String,
    pub value: u64,
    /// `#RRGGBB`
    pub color: String,
}

/// Aggregates for one image.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Statistics {
    pub image_area: u64,
    pub ignore_undefined: bool,
    pub coverage: Coverage,
    /// Coral area per super-category
    pub area_by_super_category: BTreeMap<SuperCategoryId, u64>,
    /// Mask count per super-category
    pub colony_counts: BTreeMap<SuperCategoryId, usize>,
    /// Coral area per health status
    pub area_by_status: BTreeMap<HealthStatus, u64>,
    /// Area per category
    pub area_by_category: BTreeMap<CategoryId, u64>,
    /// Display names of the super-categories seen
    pub super_category_names: BTreeMap<SuperCategoryId, String>,
    /// Fill colours of the super-categories seen
    super_category_colors: BTreeMap<SuperCategoryId, [u8; 3]>,
}

impl Statistics {
    /// Compute every aggregate for `data`.
    ///
    /// With `ignore_undefined`, masks on undefined coral categories only count
    /// toward the non-coral remainder.
    pub fn compute(data: &ImageData, taxonomy: &Taxonomy, ignore_undefined: bool) -> Self {
        let mut stats = Statistics {
            image_area: data.image_area(),
            ignore_undefined,
            ..Default::default()
        };
        if stats.image_area == 0 {
            log::warn!("Image {} has zero area", data.index());
        }

        let mut coral = 0u64;
        let mut undefined = 0u64;
        for mask in data.masks() {
            let area = mask.area();
            let Some(category) = taxonomy.get(mask.category_id()) else {
                log::warn!(
                    "Mask {} has unknown category {}, counted as non-coral",
                    mask.id(),
                    mask.category_id()
                );
                continue;
            };
            *stats.area_by_category.entry(category.id).or_default() += area;
            if !category.is_coral {
                continue;
            }

            let is_undefined = category.status == HealthStatus::Undefined;
            if is_undefined {
                undefined += area;
            } else {
                coral += area;
            }
            if is_undefined && ignore_undefined {
                continue;
            }

            let super_id = category.supercategory_id;
            *stats.area_by_super_category.entry(super_id).or_default() += area;
            *stats.colony_counts.entry(super_id).or_default() += 1;
            *stats.area_by_status.entry(category.status).or_default() += area;
            stats
                .super_category_names
                .entry(super_id)
                .or_insert_with(|| category.supercategory.clone());
            stats
                .super_category_colors
                .entry(super_id)
                .or_insert_with(|| taxonomy.fill_color(category.id));
        }

        stats.coverage = if ignore_undefined {
            Coverage {
                coral,
                undefined: 0,
                non_coral: stats.image_area.saturating_sub(coral),
            }
        } else {
            Coverage {
                coral,
                undefined,
                non_coral: stats.image_area.saturating_sub(coral + undefined),
            }
        };
        log::debug!("Statistics for image {}: {:?}", data.index(), stats.coverage);
        stats
    }

    /// Coral coverage chart.
    pub fn coverage_chart(&self) -> Vec<ChartEntry> {
        let mut entries = vec![ChartEntry {
            label: "Coral".to_string(),
            value: self.coverage.coral,
            color: rgb_to_hex(chart::CORAL),
        }];
        if !self.ignore_undefined {
            entries.push(ChartEntry {
                label: "Undefined Coral".to_string(),
                value: self.coverage.undefined,
                color: rgb_to_hex(crate::constants::DEFAULT_COLOR),
            });
        }
        entries.push(ChartEntry {
            label: NON_CORAL_LABEL.to_string(),
            value: self.coverage.non_coral,
            color: rgb_to_hex(chart::SHALLOW_GRAY),
        });
        entries
    }

    fn super_category_entry(&self, super_id: SuperCategoryId, value: u64) -> ChartEntry {
        ChartEntry {
            label: self
                .super_category_names
                .get(&super_id)
                .cloned()
                .unwrap_or_else(|| super_id.to_string()),
            value,
            color: rgb_to_hex(
                self.super_category_colors
                    .get(&super_id)
                    .copied()
                    .unwrap_or(chart::SHALLOW_GRAY),
            ),
        }
    }

    /// Colony (mask) count per species.
    pub fn colony_chart(&self) -> Vec<ChartEntry> {
        self.colony_counts
            .iter()
            .map(|(&super_id, &count)| self.super_category_entry(super_id, count as u64))
            .collect()
    }

    /// Area per species plus the non-coral remainder.
    pub fn species_coverage(&self) -> Vec<ChartEntry> {
        let mut entries: Vec<ChartEntry> = self
            .area_by_super_category
            .iter()
            .map(|(&super_id, &area)| self.super_category_entry(super_id, area))
            .collect();
        let covered: u64 = self.area_by_super_category.values().sum();
        entries.push(ChartEntry {
            label: NON_CORAL_LABEL.to_string(),
            value: self.image_area.saturating_sub(covered),
            color: rgb_to_hex(chart::SHALLOW_GRAY),
        });
        entries
    }

    /// Area per health status plus the non-coral remainder.
    pub fn status_coverage(&self) -> Vec<ChartEntry> {
        let mut entries: Vec<ChartEntry> = self
            .area_by_status
            .iter()
            .map(|(&status, &area)| ChartEntry {
                label: status.name().to_string(),
                value: area,
                color: rgb_to_hex(status_chart_color(status)),
            })
            .collect();
        let covered: u64 = self.area_by_status.values().sum();
        entries.push(ChartEntry {
            label: NON_CORAL_LABEL.to_string(),
            value: self.image_area.saturating_sub(covered),
            color: rgb_to_hex(chart::SHALLOW_GRAY),
        });
        entries
    }

    /// Healthy vs bleached area of the species with `supercategory_id`.
    pub fn species_condition(
        &self,
        taxonomy: &Taxonomy,
        supercategory_id: SuperCategoryId,
    ) -> SpeciesCondition {
        let mut condition = SpeciesCondition::default();
        for category in taxonomy.super_category_members(supercategory_id) {
            let area = self.area_by_category.get(&category.id).copied().unwrap_or(0);
            match category.status {
                HealthStatus::Healthy => condition.healthy += area,
                HealthStatus::Bleached => condition.bleached += area,
                _ => {}
            }
        }
        condition
    }

    /// Species condition for every coral species of the taxonomy.
    pub fn all_species_conditions(
        &self,
        taxonomy: &Taxonomy,
    ) -> Vec<(SuperCategoryId, String, SpeciesCondition)> {
        taxonomy
            .categories()
            .filter(|c| c.is_coral && c.is_healthy())
            .map(|c| {
                (
                    c.supercategory_id,
                    c.supercategory.clone(),
                    self.species_condition(taxonomy, c.supercategory_id),
                )
            })
            .collect()
    }

    /// Area on the predicted sentinel (always tracked, even when ignored).
    pub fn predicted_area(&self) -> u64 {
        self.area_by_category
            .get(&PREDICTED_CORAL_ID)
            .copied()
            .unwrap_or(0)
    }
}

/// Chart colour of a health status.
pub fn status_chart_color(status: HealthStatus) -> [u8; 3] {
    match status {
        HealthStatus::Healthy => chart::GREEN,
        HealthStatus::Bleached => chart::DEEP_GRAY,
        HealthStatus::Dead => chart::BLACK,
        HealthStatus::Undefined => chart::SHALLOW_GRAY,
    }
}
