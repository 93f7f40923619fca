//! Category data model for coral taxonomy categories.

use serde::{Deserialize, Serialize};

/// Category identifier. Real categories are non-negative; the two negative
/// values are reserved sentinels.
pub type CategoryId = i32;

/// Super-category identifier, shared by the health variants of one species.
pub type SuperCategoryId = i32;

/// The dead-coral category, a global singleton shared by every species.
pub const DEAD_CORAL_ID: CategoryId = 0;

/// Sentinel for a coral mask that has not been labelled yet.
pub const PREDICTED_CORAL_ID: CategoryId = -1;

/// Sentinel for the in-progress prompt mask.
pub const PROMPT_CATEGORY_ID: CategoryId = -2;

/// Health status of a category.
///
/// Serialized as the integer codes used by project files
/// (-1 undefined, 0 healthy, 1 bleached, 2 dead).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum HealthStatus {
    /// Status unknown or not applicable
    Undefined,
    /// Living coral
    Healthy,
    /// Bleached coral
    Bleached,
    /// Dead coral
    Dead,
}

impl HealthStatus {
    /// Integer code used in project files.
    pub fn code(self) -> i32 {
        match self {
            HealthStatus::Undefined => -1,
            HealthStatus::Healthy => 0,
            HealthStatus::Bleached => 1,
            HealthStatus::Dead => 2,
        }
    }

    /// Display name for statistics and legends.
    pub fn name(self) -> &'static str {
        match self {
            HealthStatus::Undefined => "Undefined",
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Bleached => "Bleached",
            HealthStatus::Dead => "Dead",
        }
    }

    /// All statuses in code order.
    pub fn all() -> &'static [HealthStatus] {
        &[
            HealthStatus::Undefined,
            HealthStatus::Healthy,
            HealthStatus::Bleached,
            HealthStatus::Dead,
        ]
    }
}

impl TryFrom<i32> for HealthStatus {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            -1 => Ok(HealthStatus::Undefined),
            0 => Ok(HealthStatus::Healthy),
            1 => Ok(HealthStatus::Bleached),
            2 => Ok(HealthStatus::Dead),
            other => Err(format!("invalid health status code {}", other)),
        }
    }
}

impl From<HealthStatus> for i32 {
    fn from(status: HealthStatus) -> Self {
        status.code()
    }
}

/// A taxonomy category: one species in one health state, or a non-coral class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Unique identifier
    pub id: CategoryId,
    /// Display name (bleached variants carry the "Bleached " prefix)
    pub name: String,
    /// Name of the species / group
    pub supercategory: String,
    /// Group id linking health variants of one species
    pub supercategory_id: SuperCategoryId,
    /// Whether this category describes coral
    pub is_coral: bool,
    /// Health status
    pub status: HealthStatus,
}

impl Category {
    /// Create a category.
    pub fn new(
        id: CategoryId,
        name: &str,
        supercategory: &str,
        supercategory_id: SuperCategoryId,
        is_coral: bool,
        status: HealthStatus,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            supercategory: supercategory.to_string(),
            supercategory_id,
            is_coral,
            status,
        }
    }

    /// The built-in dead-coral category.
    pub fn dead() -> Self {
        Self::new(DEAD_CORAL_ID, "Dead Coral", "Dead Coral", 0, true, HealthStatus::Dead)
    }

    /// The predicted/unassigned coral sentinel.
    pub fn predicted() -> Self {
        Self::new(
            PREDICTED_CORAL_ID,
            "Undefined Coral",
            "Undefined Coral",
            PREDICTED_CORAL_ID,
            true,
            HealthStatus::Undefined,
        )
    }

    /// The active-prompt sentinel.
    pub fn prompt() -> Self {
        Self::new(
            PROMPT_CATEGORY_ID,
            "Prompt",
            "Prompt",
            PROMPT_CATEGORY_ID,
            true,
            HealthStatus::Undefined,
        )
    }

    /// Whether the id is one of the reserved sentinels.
    pub fn is_sentinel_id(id: CategoryId) -> bool {
        id == PREDICTED_CORAL_ID || id == PROMPT_CATEGORY_ID
    }

    /// Whether this category is a reserved sentinel.
    pub fn is_sentinel(&self) -> bool {
        Self::is_sentinel_id(self.id)
    }

    /// Whether the status is healthy.
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    /// Whether the status is bleached.
    pub fn is_bleached(&self) -> bool {
        self.status == HealthStatus::Bleached
    }

    /// Whether the status is dead.
    pub fn is_dead(&self) -> bool {
        self.status == HealthStatus::Dead
    }

    /// Short badge code: the super-category id, with a trailing `B` for
    /// bleached variants (e.g. `"3"`, `"3B"`).
    pub fn display_code(&self) -> String {
        if self.is_bleached() {
            format!("{}B", self.supercategory_id)
        } else {
            self.supercategory_id.to_string()
        }
    }
}

/// Name of the bleached variant of a species.
pub fn bleached_name(healthy_name: &str) -> String {
    format!("{}{}", crate::constants::BLEACHED_PREFIX, healthy_name)
}
