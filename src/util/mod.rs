//! Shared utilities.

pub mod clock;
pub mod ids;
pub mod telemetry;

pub use clock::now_ms;
pub use ids::{new_run_id, RunId};
pub use telemetry::init_tracing;
