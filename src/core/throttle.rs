//! Concurrency-limited task mapping.
//!
//! The engine runs one async task per input element, keeps at most a fixed
//! number of them in flight, and hands results back in input order. Dispatch is
//! a single sequential loop: take the next element, wait for admission, start
//! the task without awaiting it, repeat. Each task reports its settlement to
//! the shared run state, which releases capacity, detects completion, and on
//! the first failure ends the run immediately — tasks already in flight keep
//! running, but their outcomes are discarded.

use std::future::Future;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{fmt, mem};

use futures::FutureExt;
use parking_lot::Mutex;

use crate::core::discard::{build_discarded_outcome, DiscardSink};
use crate::core::gate::{Admission, AdmissionGate};
use crate::core::outcome::{OutcomeCell, Settled};
use crate::util::ids::{new_run_id, RunId};

use super::error::ThrottleError;

/// How many tasks may be in flight at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// No cap: every task starts immediately.
    Unlimited,
    /// At most this many tasks run concurrently.
    Limited(NonZeroUsize),
}

impl Concurrency {
    /// Convert a raw signed value, as found in configuration files or
    /// environment variables. Negative values are rejected; zero means no cap.
    ///
    /// # Examples
    ///
    /// ```
    /// use prometheus_throttle::core::Concurrency;
    ///
    /// assert!(Concurrency::from_raw(-1).is_err());
    /// assert!(Concurrency::from_raw(0).unwrap().is_unlimited());
    /// assert_eq!(Concurrency::from_raw(8).unwrap().slots(), Some(8));
    /// ```
    pub fn from_raw(raw: i64) -> Result<Self, ThrottleError> {
        let slots = usize::try_from(raw).map_err(|_| ThrottleError::InvalidLimit(raw))?;
        Ok(Self::from(slots))
    }

    /// Whether this setting applies no cap.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// The cap, or `None` when unlimited.
    #[must_use]
    pub const fn slots(&self) -> Option<usize> {
        match self {
            Self::Unlimited => None,
            Self::Limited(n) => Some(n.get()),
        }
    }
}

impl From<usize> for Concurrency {
    /// Zero maps to [`Concurrency::Unlimited`].
    fn from(slots: usize) -> Self {
        NonZeroUsize::new(slots).map_or(Self::Unlimited, Self::Limited)
    }
}

impl From<Option<usize>> for Concurrency {
    fn from(slots: Option<usize>) -> Self {
        slots.map_or(Self::Unlimited, Self::from)
    }
}

impl From<NonZeroUsize> for Concurrency {
    fn from(slots: NonZeroUsize) -> Self {
        Self::Limited(slots)
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => write!(f, "unlimited"),
            Self::Limited(n) => write!(f, "{n}"),
        }
    }
}

/// Abstraction for spawning task execution on a runtime.
pub trait Spawn {
    /// Spawn an async task that returns a future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// State shared between the dispatcher, every spawned task, and the caller.
struct RunShared<R, E> {
    run_id: RunId,
    /// Number of input elements; the run completes at this many successes.
    expected: usize,
    /// Terminal flag, observed by the dispatcher before each draw.
    done: AtomicBool,
    /// Admission gate; absent in unlimited mode.
    gate: Option<AdmissionGate>,
    /// Successful results in completion order.
    entries: Mutex<Vec<(usize, R)>>,
    outcome: OutcomeCell<E>,
    /// Optional side-channel for errors settling after the terminal state.
    discard: Option<Mutex<Box<dyn DiscardSink<E>>>>,
}

impl<R, E> RunShared<R, E> {
    fn task_completed(&self, index: usize, value: R) {
        if self.done.load(Ordering::Acquire) {
            tracing::debug!(
                "run {} item {index} completed after terminal state; result dropped",
                self.run_id
            );
            return;
        }
        let recorded = {
            let mut entries = self.entries.lock();
            entries.push((index, value));
            entries.len()
        };
        if let Some(gate) = &self.gate {
            gate.release();
        }
        if recorded == self.expected {
            self.done.store(true, Ordering::Release);
            if let Some(gate) = &self.gate {
                gate.close();
            }
            if self.outcome.settle(Settled::Complete).is_some() {
                tracing::debug!("run {} already settled", self.run_id);
            }
        }
    }

    fn task_failed(&self, index: usize, error: E) {
        if self.done.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                "run {} item {index} failed after terminal state; error discarded",
                self.run_id
            );
            if let Some(sink) = &self.discard {
                sink.lock()
                    .record(build_discarded_outcome(self.run_id, index, error));
            }
            return;
        }
        tracing::debug!("run {} failed at item {index}", self.run_id);
        if let Some(gate) = &self.gate {
            gate.close();
        }
        if let Some(Settled::Failed(error)) = self.outcome.settle(Settled::Failed(error)) {
            // Lost a settle race; treat like any other late error.
            if let Some(sink) = &self.discard {
                sink.lock()
                    .record(build_discarded_outcome(self.run_id, index, error));
            }
        }
    }

    fn task_panicked(&self, index: usize, panic: Box<dyn std::any::Any + Send>) {
        if self.done.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                "run {} item {index} panicked after terminal state; payload dropped",
                self.run_id
            );
            return;
        }
        tracing::debug!("run {} panicked at item {index}", self.run_id);
        if let Some(gate) = &self.gate {
            gate.close();
        }
        let _ = self.outcome.settle(Settled::Panicked(panic));
    }
}

/// Concurrency-limited runner over a spawner.
///
/// One `Throttle` can be reused for any number of runs; every run gets its own
/// gate, result store, and terminal state.
pub struct Throttle<S> {
    limit: Concurrency,
    spawner: S,
}

#[cfg(feature = "tokio-runtime")]
impl Throttle<crate::runtime::TokioSpawner> {
    /// Create a throttle that spawns on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime context.
    pub fn new(limit: impl Into<Concurrency>) -> Self {
        Self::with_spawner(limit, crate::runtime::TokioSpawner::current())
    }
}

impl<S: Spawn> Throttle<S> {
    /// Create a throttle over an explicit spawner.
    pub fn with_spawner(limit: impl Into<Concurrency>, spawner: S) -> Self {
        Self {
            limit: limit.into(),
            spawner,
        }
    }

    /// The configured concurrency cap.
    #[must_use]
    pub const fn limit(&self) -> Concurrency {
        self.limit
    }

    /// Run `task` over every element of `collection`, at most `limit` in
    /// flight, and return the results in input order.
    ///
    /// `task` is invoked only after its element is admitted, so with a cap of
    /// one, element `i + 1` is not touched until element `i` has settled. On
    /// the first failed settlement the run ends with that error: nothing
    /// further is dispatched, in-flight siblings run to completion in the
    /// background, and their outcomes are discarded. An empty collection
    /// resolves to an empty `Vec` without invoking `task` at all.
    ///
    /// A panicking task ends the run the same way and the panic is resumed on
    /// the caller.
    pub async fn run<C, T, F, Fut, R, E>(&self, collection: C, task: F) -> Result<Vec<R>, E>
    where
        C: IntoIterator<Item = T>,
        F: FnMut(T, usize) -> Fut,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        self.run_inner(collection, task, None).await
    }

    /// Like [`Throttle::run`], with a sink receiving errors that settle after
    /// the run is already terminal and would otherwise only be logged.
    pub async fn run_observed<C, T, F, Fut, R, E>(
        &self,
        collection: C,
        task: F,
        sink: impl DiscardSink<E> + 'static,
    ) -> Result<Vec<R>, E>
    where
        C: IntoIterator<Item = T>,
        F: FnMut(T, usize) -> Fut,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        self.run_inner(collection, task, Some(Mutex::new(Box::new(sink) as Box<dyn DiscardSink<E>>)))
            .await
    }

    async fn run_inner<C, T, F, Fut, R, E>(
        &self,
        collection: C,
        mut task: F,
        discard: Option<Mutex<Box<dyn DiscardSink<E>>>>,
    ) -> Result<Vec<R>, E>
    where
        C: IntoIterator<Item = T>,
        F: FnMut(T, usize) -> Fut,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        let items: Vec<T> = collection.into_iter().collect();
        let expected = items.len();
        if expected == 0 {
            return Ok(Vec::new());
        }

        let run_id = new_run_id();
        let shared = Arc::new(RunShared {
            run_id,
            expected,
            done: AtomicBool::new(false),
            gate: self.limit.slots().map(AdmissionGate::new),
            entries: Mutex::new(Vec::with_capacity(expected)),
            outcome: OutcomeCell::new(),
            discard,
        });

        tracing::debug!("run {run_id} started: {expected} items, limit {}", self.limit);

        for (index, value) in items.into_iter().enumerate() {
            if shared.done.load(Ordering::Acquire) {
                tracing::debug!("run {run_id} terminal; dispatch stopped before item {index}");
                break;
            }
            if let Some(gate) = &shared.gate {
                if gate.acquire().await == Admission::Closed {
                    tracing::debug!("run {run_id} gate closed; dispatch stopped at item {index}");
                    break;
                }
            }
            // The task fn runs only once its element is admitted.
            let fut = task(value, index);
            let shared = Arc::clone(&shared);
            self.spawner.spawn(async move {
                match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(Ok(value)) => shared.task_completed(index, value),
                    Ok(Err(error)) => shared.task_failed(index, error),
                    Err(panic) => shared.task_panicked(index, panic),
                }
            });
        }

        match shared.outcome.wait().await {
            Settled::Complete => {
                let mut entries = mem::take(&mut *shared.entries.lock());
                entries.sort_unstable_by_key(|&(index, _)| index);
                tracing::debug!("run {run_id} completed: {expected} results");
                Ok(entries.into_iter().map(|(_, value)| value).collect())
            }
            Settled::Failed(error) => Err(error),
            Settled::Panicked(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Run `task` over `collection` on the current tokio runtime, at most `limit`
/// tasks in flight, returning results in input order.
///
/// A `limit` of zero or `None` applies no cap. See [`Throttle::run`] for the
/// full contract.
///
/// # Examples
///
/// ```rust,ignore
/// use prometheus_throttle::core::run_limited;
///
/// let doubled = run_limited(
///     vec![1u32, 2, 3],
///     |n, _index| async move { Ok::<_, std::io::Error>(n * 2) },
///     2,
/// )
/// .await?;
/// assert_eq!(doubled, vec![2, 4, 6]);
/// ```
#[cfg(feature = "tokio-runtime")]
pub async fn run_limited<C, T, F, Fut, R, E>(
    collection: C,
    task: F,
    limit: impl Into<Concurrency>,
) -> Result<Vec<R>, E>
where
    C: IntoIterator<Item = T>,
    F: FnMut(T, usize) -> Fut,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    Throttle::new(limit).run(collection, task).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_from_usize() {
        assert_eq!(Concurrency::from(0), Concurrency::Unlimited);
        assert_eq!(Concurrency::from(3).slots(), Some(3));
    }

    #[test]
    fn test_concurrency_from_option() {
        assert_eq!(Concurrency::from(None), Concurrency::Unlimited);
        assert_eq!(Concurrency::from(Some(5)).slots(), Some(5));
        assert_eq!(Concurrency::from(Some(0)), Concurrency::Unlimited);
    }

    #[test]
    fn test_concurrency_rejects_negative_raw() {
        assert!(matches!(
            Concurrency::from_raw(-1),
            Err(ThrottleError::InvalidLimit(-1))
        ));
        assert_eq!(Concurrency::from_raw(0).unwrap(), Concurrency::Unlimited);
        assert_eq!(Concurrency::from_raw(4).unwrap().slots(), Some(4));
    }

    #[test]
    fn test_concurrency_display() {
        assert_eq!(Concurrency::Unlimited.to_string(), "unlimited");
        assert_eq!(Concurrency::from(8).to_string(), "8");
    }
}
