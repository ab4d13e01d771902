//! Core scheduling engine: admission, dispatch, aggregation, assembly.

pub mod discard;
pub mod error;
pub mod executor;
pub mod gate;
pub mod throttle;

#[cfg(not(target_arch = "wasm32"))]
pub mod blocking;

mod outcome;

pub use discard::{
    build_discarded_outcome, DiscardSink, DiscardedOutcome, InMemoryDiscardSink,
};
pub use error::{AppResult, ThrottleError};
pub use executor::ItemExecutor;
pub use gate::{Acquire, Admission, AdmissionGate};
pub use throttle::{Concurrency, Spawn, Throttle};

#[cfg(feature = "tokio-runtime")]
pub use throttle::run_limited;

#[cfg(not(target_arch = "wasm32"))]
pub use blocking::run_limited_blocking;
