//! Single-assignment terminal state for one run.
//!
//! The cell is written exactly once, by whichever completion settles the run,
//! and read exactly once, by the caller awaiting the run's result. Later writes
//! lose and are reported back to the writer so the discarded outcome can be
//! routed to logging or a side-channel.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

/// Terminal state of a run.
pub(crate) enum Settled<E> {
    /// Every task completed; the result store holds all entries.
    Complete,
    /// A task failed; the run ends with this error.
    Failed(E),
    /// A task panicked; the payload is resumed on the caller.
    Panicked(Box<dyn Any + Send>),
}

struct CellState<E> {
    terminal: Option<Settled<E>>,
    /// Waker of the caller awaiting the run, if it has polled already.
    waker: Option<Waker>,
}

/// Write-once cell carrying the terminal state to the awaiting caller.
pub(crate) struct OutcomeCell<E> {
    state: Mutex<CellState<E>>,
}

impl<E> OutcomeCell<E> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(CellState {
                terminal: None,
                waker: None,
            }),
        }
    }

    /// Record the terminal state and wake the caller. Returns the value back
    /// if the cell was already settled, so exactly one write ever lands.
    pub(crate) fn settle(&self, settled: Settled<E>) -> Option<Settled<E>> {
        let mut state = self.state.lock();
        if state.terminal.is_some() {
            return Some(settled);
        }
        state.terminal = Some(settled);
        if let Some(waker) = state.waker.take() {
            waker.wake();
        }
        None
    }

    /// Await the terminal state. Intended for a single caller; the value is
    /// taken out of the cell when it resolves.
    pub(crate) fn wait(&self) -> Wait<'_, E> {
        Wait { cell: self }
    }
}

/// Future returned by [`OutcomeCell::wait`].
pub(crate) struct Wait<'a, E> {
    cell: &'a OutcomeCell<E>,
}

impl<E> Future for Wait<'_, E> {
    type Output = Settled<E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.cell.state.lock();
        if let Some(settled) = state.terminal.take() {
            return Poll::Ready(settled);
        }
        state.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::task::noop_waker;
    use std::pin::pin;

    fn poll_once<F: Future>(fut: Pin<&mut F>) -> Poll<F::Output> {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        fut.poll(&mut cx)
    }

    #[test]
    fn test_wait_resolves_after_settle() {
        let cell: OutcomeCell<String> = OutcomeCell::new();
        let mut wait = pin!(cell.wait());
        assert!(matches!(poll_once(wait.as_mut()), Poll::Pending));

        assert!(cell.settle(Settled::Complete).is_none());
        assert!(matches!(
            poll_once(wait.as_mut()),
            Poll::Ready(Settled::Complete)
        ));
    }

    #[test]
    fn test_first_write_wins() {
        let cell: OutcomeCell<&str> = OutcomeCell::new();
        assert!(cell.settle(Settled::Failed("first")).is_none());

        // The losing write comes back to the writer.
        let lost = cell.settle(Settled::Failed("second"));
        assert!(matches!(lost, Some(Settled::Failed("second"))));

        let mut wait = pin!(cell.wait());
        assert!(matches!(
            poll_once(wait.as_mut()),
            Poll::Ready(Settled::Failed("first"))
        ));
    }
}
