//! Shared type definitions for the Nuclick province game.
//!
//! This crate is the single source of truth for the domain values passed
//! between the store, the round engine, and the HTTP surface. Types defined
//! here flow downstream to `TypeScript` via `ts-rs` for the web client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for province identifiers
//! - [`enums`] -- Player action kinds
//! - [`structs`] -- `Province`, `NewProvince`, and `ColorHex`
//! - [`error`] -- Validation errors for untrusted input

pub mod enums;
pub mod error;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::ActionKind;
pub use error::ValidationError;
pub use ids::ProvinceId;
pub use structs::{ColorHex, NewProvince, Province, score_differential};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the web client.

    #[test]
    fn export_bindings() {
        // The files are written to the `bindings/` directory relative to
        // the crate root.
        use ts_rs::TS;

        let _ = crate::ids::ProvinceId::export_all();
        let _ = crate::enums::ActionKind::export_all();
        let _ = crate::structs::Province::export_all();
    }
}
