//! Struct-based task execution seam.
//!
//! Closures cover most uses of [`Throttle::run`]; an executor type is the
//! better fit when the per-item work carries its own state — a client handle,
//! a connection pool, tuning parameters — or when the work is defined far from
//! the call site.

use async_trait::async_trait;

use crate::core::throttle::{Spawn, Throttle};

/// Abstraction for running one collection element and producing a result.
///
/// The executor is cloned once per dispatched element, so implementations are
/// typically cheap handles (an `Arc` around the real state).
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_throttle::core::ItemExecutor;
///
/// #[derive(Clone)]
/// struct FetchExecutor {
///     client: reqwest::Client,
/// }
///
/// #[async_trait]
/// impl ItemExecutor<String, String, reqwest::Error> for FetchExecutor {
///     async fn execute(&self, url: String, _index: usize) -> Result<String, reqwest::Error> {
///         self.client.get(&url).send().await?.text().await
///     }
/// }
/// ```
#[async_trait]
pub trait ItemExecutor<T, R, E>: Send + Sync + Clone + 'static {
    /// Run one element.
    ///
    /// # Arguments
    ///
    /// * `value` - The collection element to process
    /// * `index` - The element's position in the input collection
    async fn execute(&self, value: T, index: usize) -> Result<R, E>;
}

impl<S: Spawn> Throttle<S> {
    /// Run an [`ItemExecutor`] over every element of `collection`.
    ///
    /// Same contract as [`Throttle::run`]; the executor is cloned per element.
    pub async fn run_executor<C, T, R, E, X>(&self, collection: C, executor: X) -> Result<Vec<R>, E>
    where
        C: IntoIterator<Item = T>,
        T: Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
        X: ItemExecutor<T, R, E>,
    {
        self.run(collection, move |value, index| {
            let executor = executor.clone();
            async move { executor.execute(value, index).await }
        })
        .await
    }
}
