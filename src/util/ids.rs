//! Run identifiers for log and side-channel correlation.

use uuid::Uuid;

/// Identifier tying together everything one run emits.
pub type RunId = Uuid;

/// Generate a fresh run identifier.
#[must_use]
pub fn new_run_id() -> RunId {
    Uuid::new_v4()
}
