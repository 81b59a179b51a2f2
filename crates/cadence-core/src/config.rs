use serde::{Deserialize, Serialize};

use crate::conflict::ConflictConfig;

/// Limits and defaults shared by every engine operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hard cap on occurrences returned by a single expansion
    pub max_occurrences: usize,
    /// Candidate steps the navigator takes before giving up
    pub navigation_ceiling: usize,
    /// Window length used when a caller gives no explicit end
    pub default_window_days: i64,
    /// Look-ahead for occurrence previews
    pub preview_days: i64,
    pub conflict: ConflictConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_occurrences: 500,
            navigation_ceiling: crate::recurrence::navigator::NAVIGATION_CEILING,
            default_window_days: 30,
            preview_days: 365,
            conflict: ConflictConfig::default(),
        }
    }
}
