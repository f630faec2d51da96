//! Conversion option types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Speed/compression trade-off profile for a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OptimizeLevel {
    /// Favor encode speed over output size
    Fast,
    /// Middle ground, the default
    #[default]
    Balanced,
    /// Favor smallest output size
    Max,
}

/// Error returned when parsing an unknown optimization level.
#[derive(Debug, Clone, Error)]
#[error("Optimization level '{0}' is not supported. Supported levels: fast, balanced, max")]
pub struct UnknownOptimizeLevel(pub String);

impl OptimizeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizeLevel::Fast => "fast",
            OptimizeLevel::Balanced => "balanced",
            OptimizeLevel::Max => "max",
        }
    }
}

impl FromStr for OptimizeLevel {
    type Err = UnknownOptimizeLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(OptimizeLevel::Fast),
            "balanced" => Ok(OptimizeLevel::Balanced),
            "max" => Ok(OptimizeLevel::Max),
            other => Err(UnknownOptimizeLevel(other.to_string())),
        }
    }
}

impl fmt::Display for OptimizeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
