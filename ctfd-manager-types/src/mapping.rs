//! Display-name lookup for category and difficulty tokens.

use crate::challenge::ChallengeSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const UNCATEGORIZED: &str = "Uncategorized";
const UNKNOWN_DIFFICULTY: &str = "Unknown Difficulty";

/// Optional translation table from authored tokens to display names.
///
/// Absent entries fall back to the raw token, so an empty table is always
/// valid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingTable {
    pub categories: BTreeMap<String, String>,
    pub difficulties: BTreeMap<String, String>,
    /// Difficulties that override the category entirely (e.g. "intro").
    #[serde(rename = "difficulty-categories")]
    pub difficulty_categories: BTreeMap<String, String>,
}

impl MappingTable {
    /// Category shown for a challenge.
    pub fn category_name(&self, challenge: &ChallengeSpec) -> String {
        if challenge.category.is_empty() {
            return UNCATEGORIZED.to_string();
        }

        self.difficulty_categories
            .get(&challenge.difficulty)
            .or_else(|| self.categories.get(&challenge.category))
            .cloned()
            .unwrap_or_else(|| challenge.category.clone())
    }

    /// Difficulty shown for a challenge.
    pub fn difficulty_name(&self, challenge: &ChallengeSpec) -> String {
        if challenge.difficulty.is_empty() {
            return UNKNOWN_DIFFICULTY.to_string();
        }

        self.difficulties
            .get(&challenge.difficulty)
            .cloned()
            .unwrap_or_else(|| challenge.difficulty.clone())
    }
}
