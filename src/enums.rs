//! Closed enumerations used throughout the sheet model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of interactive field an element is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Number,
    Checkbox,
    String,
    Options,
}

impl ElementType {
    /// Name as it appears in sheet files and in the rule snapshot.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Number => "number",
            ElementType::Checkbox => "checkbox",
            ElementType::String => "string",
            ElementType::Options => "options",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a ruleset's win/lose conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    Won,
    Lost,
    Undecided,
}
