//! # Prometheus Throttle
//!
//! Bounded-concurrency task mapping for AI agent workloads.
//!
//! This library runs an async task over every element of a collection with a
//! cap on how many run at once, and returns the results in the collection's
//! original order. It is the fan-out primitive behind batched inference calls,
//! embedding jobs, and bulk HTTP/file operations anywhere the Prometheus
//! platform has to hit a rate or resource ceiling.
//!
//! ## Core Problem Solved
//!
//! Fanning work out naively has two failure modes:
//!
//! - **Unbounded fan-out**: mapping a 10k-element batch straight onto spawned
//!   tasks floods the upstream service (or the GPU) with 10k concurrent
//!   requests
//! - **Serial fallback**: awaiting each element in turn wastes all available
//!   parallelism
//!
//! The throttle sits between the two: dispatch stays in input order, at most
//! `limit` elements are in flight at any moment, and the first failure ends
//! the run immediately instead of burning capacity on work whose result will
//! be thrown away.
//!
//! ## Key Features
//!
//! - **Admission control**: a closeable FIFO counting semaphore bounds
//!   in-flight tasks
//! - **Order-preserving assembly**: results come back positionally, however
//!   tasks interleaved
//! - **Fail-fast**: the first settled error wins; nothing further is
//!   dispatched, and late sibling errors can be observed through an optional
//!   side-channel
//! - **Runtime-agnostic core**: the engine spawns through a small `Spawn`
//!   seam; a tokio adapter ships behind the default `tokio-runtime` feature
//! - **Blocking variant**: the same semantics for synchronous closures on
//!   scoped worker threads (native targets)
//!
//! ## Throttled mapping
//!
//! ```rust,ignore
//! use prometheus_throttle::core::run_limited;
//!
//! let bodies = run_limited(
//!     urls,
//!     |url, _index| async move { fetch(url).await },
//!     8,
//! )
//! .await?;
//! ```
//!
//! ## Reusable runner with configuration
//!
//! ```rust,ignore
//! use prometheus_throttle::builders::build_tokio_throttle;
//! use prometheus_throttle::config::ThrottleConfig;
//!
//! let throttle = build_tokio_throttle(&ThrottleConfig::from_env()?)?;
//! let results = throttle.run(items, |item, index| work(item, index)).await?;
//! ```
//!
//! For complete examples, see:
//! - `tests/throttle_test.rs` - Full integration tests
//! - `README.md` - Comprehensive documentation

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling engine: admission gate, dispatch, aggregation, assembly.
pub mod core;
/// Configuration models for concurrency limits.
pub mod config;
/// Builders to construct throttles from configuration.
pub mod builders;
/// Runtime adapters implementing the spawn seam.
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
/// Shared utilities.
pub mod util;
