//! Row identifiers with a one-character notification state tag.
//!
//! The first character is the state ('U' = not yet notified, 'N' = already
//! notified), the remainder is a UUID. The transition is one-directional,
//! U→N, and keeps the token intact, which is what lets the register scans
//! re-run without re-notifying anyone.

use uuid::Uuid;

pub const UNNOTIFIED_PREFIX: char = 'U';
pub const NOTIFIED_PREFIX: char = 'N';

/// Freshly generated identifier carrying the given state prefix.
pub fn generate(prefix: char) -> String {
    format!("{prefix}{}", Uuid::new_v4())
}

/// A new identifier in the "not yet notified" state.
pub fn generate_unnotified() -> String {
    generate(UNNOTIFIED_PREFIX)
}

pub fn is_notified(id: &str) -> bool {
    id.starts_with(NOTIFIED_PREFIX)
}

/// The identifier with its state flipped to "notified"; the token part is
/// unchanged. Ids without a recognized prefix are tagged as-is.
pub fn mark_notified(id: &str) -> String {
    format!("{NOTIFIED_PREFIX}{}", token(id))
}

/// The identifier minus its one-character state prefix. This is what gets
/// embedded in callback buttons, so acting on a row is independent of its
/// notification state.
pub fn token(id: &str) -> &str {
    let mut chars = id.chars();
    match chars.next() {
        Some(UNNOTIFIED_PREFIX) | Some(NOTIFIED_PREFIX) => chars.as_str(),
        _ => id,
    }
}
