//! Core entity structs: provinces and their colour codes.
//!
//! The serialized field names match the web client
//! (`ID`, `province_name`, `province_color_hex`, `attack_count`,
//! `support_count`, `destroyment_round`).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::ids::ProvinceId;

// ---------------------------------------------------------------------------
// ColorHex
// ---------------------------------------------------------------------------

/// A six-digit RGB colour code, stored as `#RRGGBB` in upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColorHex(String);

impl ColorHex {
    /// Validate and normalize a colour code.
    ///
    /// Accepts exactly six hex digits, optionally prefixed with `#`.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidColor(raw.to_owned()));
        }
        Ok(Self(format!("#{}", digits.to_ascii_uppercase())))
    }

    /// The normalized `#RRGGBB` form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ColorHex {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ColorHex> for String {
    fn from(value: ColorHex) -> Self {
        value.0
    }
}

impl core::fmt::Display for ColorHex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Province
// ---------------------------------------------------------------------------

/// A named territory with attack/support tallies; the unit of competition.
///
/// Counters only ever move by +1 per player action and return to 0 only at a
/// round transition. `destroyment_round` is the last round in which this
/// province ranked worst, or `None` if it never has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Province {
    /// Stable identifier, assigned at creation.
    #[serde(rename = "ID")]
    pub id: ProvinceId,
    /// Display name (never empty).
    #[serde(rename = "province_name")]
    pub name: String,
    /// Map colour.
    #[serde(rename = "province_color_hex")]
    #[ts(as = "String")]
    pub color_hex: ColorHex,
    /// Number of attacks cast this round.
    #[ts(type = "number")]
    pub attack_count: u64,
    /// Number of supports cast this round.
    #[ts(type = "number")]
    pub support_count: u64,
    /// Round index in which this province was last destroyed.
    pub destroyment_round: Option<u32>,
}

impl Province {
    /// Build a fresh province with zeroed counters from validated input.
    pub fn from_new(id: ProvinceId, new: NewProvince) -> Self {
        Self {
            id,
            name: new.name,
            color_hex: new.color_hex,
            attack_count: 0,
            support_count: 0,
            destroyment_round: None,
        }
    }

    /// The ranking key: `attack_count - support_count`.
    ///
    /// Saturates instead of overflowing for counters beyond `i64::MAX`.
    pub fn score_differential(&self) -> i64 {
        score_differential(self.attack_count, self.support_count)
    }

    /// Whether the province has been destroyed in any round so far.
    pub const fn is_destroyed(&self) -> bool {
        self.destroyment_round.is_some()
    }
}

/// Saturating `attack - support` over unsigned counters.
pub fn score_differential(attack_count: u64, support_count: u64) -> i64 {
    let attack = i64::try_from(attack_count).unwrap_or(i64::MAX);
    let support = i64::try_from(support_count).unwrap_or(i64::MAX);
    attack.saturating_sub(support)
}

// ---------------------------------------------------------------------------
// NewProvince
// ---------------------------------------------------------------------------

/// Validated input for creating a province.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProvince {
    /// Display name, trimmed and non-empty.
    pub name: String,
    /// Map colour.
    pub color_hex: ColorHex,
}

impl NewProvince {
    /// Validate a name and colour pair.
    pub fn new(name: &str, color_hex: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(Self {
            name: name.to_owned(),
            color_hex: ColorHex::parse(color_hex)?,
        })
    }
}
