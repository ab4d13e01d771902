//! Configuration models for concurrency limits.

pub mod throttle;

pub use throttle::{ThrottleConfig, MAX_IN_FLIGHT_ENV};
