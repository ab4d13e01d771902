//! Side-channel for outcomes that settle after a run is already terminal.
//!
//! A fail-fast run surfaces exactly one error. Sibling tasks still in flight
//! when the run fails keep executing, and whatever they produce afterwards is
//! dropped. Attaching a [`DiscardSink`] lets callers observe those dropped
//! errors for logging or metrics without changing the first-error-wins
//! contract.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::util::clock::now_ms;
use crate::util::ids::RunId;

/// An error that settled after its run had already reached a terminal state.
#[derive(Debug)]
pub struct DiscardedOutcome<E> {
    /// The run this outcome belonged to.
    pub run_id: RunId,
    /// Input position of the task that produced it.
    pub index: usize,
    /// Timestamp in milliseconds since epoch.
    pub at_ms: u128,
    /// The error, carried verbatim.
    pub error: E,
}

/// Sink for discarded late errors.
pub trait DiscardSink<E>: Send {
    /// Record one discarded outcome.
    fn record(&mut self, outcome: DiscardedOutcome<E>);
}

/// Shared handles to a sink record through the inner sink.
///
/// This lets a caller hand one clone of an `Arc<Mutex<_>>` to a run and keep
/// another to inspect afterwards.
impl<E, S> DiscardSink<E> for Arc<Mutex<S>>
where
    S: DiscardSink<E>,
{
    fn record(&mut self, outcome: DiscardedOutcome<E>) {
        self.lock().record(outcome);
    }
}

/// In-memory sink with a bounded buffer, for testing and dev.
pub struct InMemoryDiscardSink<E> {
    outcomes: VecDeque<DiscardedOutcome<E>>,
    max_outcomes: usize,
}

impl<E> InMemoryDiscardSink<E> {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_outcomes: usize) -> Self {
        Self {
            outcomes: VecDeque::with_capacity(max_outcomes),
            max_outcomes,
        }
    }

    /// Number of recorded outcomes.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Take all recorded outcomes out of the sink.
    pub fn drain(&mut self) -> Vec<DiscardedOutcome<E>> {
        self.outcomes.drain(..).collect()
    }
}

impl<E: Send> DiscardSink<E> for InMemoryDiscardSink<E> {
    fn record(&mut self, outcome: DiscardedOutcome<E>) {
        if self.outcomes.len() >= self.max_outcomes {
            self.outcomes.pop_front();
        }
        self.outcomes.push_back(outcome);
    }
}

/// Build a discard record stamped with the current time.
pub fn build_discarded_outcome<E>(run_id: RunId, index: usize, error: E) -> DiscardedOutcome<E> {
    DiscardedOutcome {
        run_id,
        index,
        at_ms: now_ms(),
        error,
    }
}
