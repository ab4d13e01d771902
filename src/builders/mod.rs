//! Builders to construct throttles from configuration.

pub mod throttle_builder;

pub use throttle_builder::build_throttle;

#[cfg(feature = "tokio-runtime")]
pub use throttle_builder::build_tokio_throttle;
