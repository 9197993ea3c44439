//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Provinces are keyed by UUID v7 (time-ordered) so that identifiers minted
//! by the application and by `PostgreSQL` index the same way. Identifiers
//! arriving over the wire are parsed with [`ProvinceId::parse`], which is the
//! only place a malformed identifier is rejected.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique, immutable identifier of a province.
    ProvinceId
}

impl ProvinceId {
    /// Parse a province identifier from its textual form.
    ///
    /// Surrounding whitespace is ignored. An empty string and anything that
    /// is not a UUID are rejected.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingId);
        }
        trimmed
            .parse::<Uuid>()
            .map(Self)
            .map_err(|e| ValidationError::InvalidId(format!("{trimmed}: {e}")))
    }
}

impl FromStr for ProvinceId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
