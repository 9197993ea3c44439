//! Enumeration types for the province game.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Player actions
// ---------------------------------------------------------------------------

/// The two actions a player can cast against a province.
///
/// Each action increments exactly one counter of exactly one province by 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ActionKind {
    /// Push the province towards destruction (`attack_count += 1`).
    Attack,
    /// Protect the province (`support_count += 1`).
    Support,
}

impl ActionKind {
    /// Name of the persisted counter column this action increments.
    pub const fn counter_column(self) -> &'static str {
        match self {
            Self::Attack => "attack_count",
            Self::Support => "support_count",
        }
    }

    /// Lowercase wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::Support => "support",
        }
    }
}

impl core::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attack" => Ok(Self::Attack),
            "support" => Ok(Self::Support),
            other => Err(ValidationError::UnknownAction(other.to_owned())),
        }
    }
}
