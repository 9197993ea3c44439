//! Validation errors raised while parsing untrusted input into domain types.

/// Input that cannot be turned into a domain value.
///
/// These are user-fixable and are resolved at the HTTP boundary; they never
/// reach the round engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// No province identifier was supplied.
    #[error("province id is required")]
    MissingId,

    /// The province identifier is not in the store's key format.
    #[error("invalid province id format: {0}")]
    InvalidId(String),

    /// A province name was empty or whitespace.
    #[error("province name must not be empty")]
    EmptyName,

    /// A colour code was not exactly six hex digits.
    #[error("invalid colour hex {0:?}: expected 6 hex digits, optionally prefixed with '#'")]
    InvalidColor(String),

    /// An action kind other than `attack` or `support`.
    #[error("unknown action kind {0:?}")]
    UnknownAction(String),
}
