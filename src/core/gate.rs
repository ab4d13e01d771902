//! Admission gate: a closeable counting semaphore for suspension-based waiting.
//!
//! The gate bounds how many tasks are in flight at once. `acquire()` suspends the
//! caller until a slot is free; `release()` returns a slot and wakes the oldest
//! waiter. Closing the gate wakes every waiter and makes all pending and future
//! acquisitions resolve immediately without consuming a slot, so a dispatch loop
//! blocked on admission unwinds promptly once a run has reached a terminal state.
//!
//! Waiters are served strictly in registration order. A new `acquire()` only takes
//! the fast path when no earlier waiter is queued, so a free slot can never be
//! stolen from a task that has been waiting longer.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

/// Outcome of waiting on an [`AdmissionGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A slot was claimed; the holder owns one unit of capacity until `release()`.
    Granted,
    /// The gate closed; no slot was consumed and none will ever be granted.
    Closed,
}

/// A suspended acquisition waiting for a slot.
struct Waiter {
    key: u64,
    waker: Waker,
}

/// State shared by all handles to one gate.
struct GateState {
    /// Free slots. Never exceeds the construction-time capacity.
    available: usize,
    /// Once set, never cleared; the gate does not reopen.
    closed: bool,
    /// Key generator for waiter bookkeeping.
    next_key: u64,
    /// Suspended acquisitions in registration order.
    waiters: VecDeque<Waiter>,
    /// Keys whose slot was handed over by `release()` but not yet observed.
    granted: Vec<u64>,
}

impl GateState {
    /// Hand free slots to the oldest waiters and wake them.
    fn grant_ready(&mut self) {
        while self.available > 0 {
            let Some(waiter) = self.waiters.pop_front() else {
                break;
            };
            self.available -= 1;
            self.granted.push(waiter.key);
            waiter.waker.wake();
        }
    }
}

/// Counting semaphore with FIFO waiters and a terminal "closed" state.
///
/// # Examples
///
/// ```rust,ignore
/// use prometheus_throttle::core::{Admission, AdmissionGate};
///
/// let gate = AdmissionGate::new(2);
/// assert_eq!(gate.acquire().await, Admission::Granted);
/// gate.release();
/// gate.close();
/// assert_eq!(gate.acquire().await, Admission::Closed);
/// ```
pub struct AdmissionGate {
    state: Mutex<GateState>,
}

impl AdmissionGate {
    /// Create a gate with `slots` units of capacity.
    pub fn new(slots: usize) -> Self {
        Self {
            state: Mutex::new(GateState {
                available: slots,
                closed: false,
                next_key: 0,
                waiters: VecDeque::new(),
                granted: Vec::new(),
            }),
        }
    }

    /// Wait for a slot. Resolves to [`Admission::Granted`] once a slot is
    /// claimed, or [`Admission::Closed`] as soon as the gate closes.
    ///
    /// The returned future is cancel-safe: dropping it deregisters the waiter,
    /// and a slot that was granted but never observed is returned to the pool.
    pub fn acquire(&self) -> Acquire<'_> {
        Acquire {
            gate: self,
            key: None,
            finished: false,
        }
    }

    /// Return one slot and wake the oldest waiter, if any.
    pub fn release(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.available += 1;
        state.grant_ready();
    }

    /// Close the gate permanently and wake every waiter.
    ///
    /// Pending and future `acquire()` calls resolve to [`Admission::Closed`],
    /// including acquisitions that were granted a slot but had not observed it.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        for waiter in state.waiters.drain(..) {
            waiter.waker.wake();
        }
    }

    /// Whether the gate has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Free slots right now. Diagnostic only; the value may be stale by the
    /// time the caller looks at it.
    pub fn available(&self) -> usize {
        self.state.lock().available
    }
}

/// Future returned by [`AdmissionGate::acquire`].
pub struct Acquire<'a> {
    gate: &'a AdmissionGate,
    /// Waiter key once registered.
    key: Option<u64>,
    /// Set when poll returned `Ready`; suppresses the drop handler.
    finished: bool,
}

impl Future for Acquire<'_> {
    type Output = Admission;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut state = this.gate.state.lock();

        // Closure takes precedence over a pending grant: once the run is
        // terminal nothing may be admitted, even if a slot was already handed
        // to this waiter.
        if state.closed {
            if let Some(key) = this.key.take() {
                if let Some(pos) = state.granted.iter().position(|k| *k == key) {
                    state.granted.swap_remove(pos);
                }
            }
            this.finished = true;
            return Poll::Ready(Admission::Closed);
        }

        match this.key {
            None => {
                // Fast path only when no earlier waiter is queued.
                if state.waiters.is_empty() && state.available > 0 {
                    state.available -= 1;
                    this.finished = true;
                    return Poll::Ready(Admission::Granted);
                }
                let key = state.next_key;
                state.next_key += 1;
                state.waiters.push_back(Waiter {
                    key,
                    waker: cx.waker().clone(),
                });
                this.key = Some(key);
                Poll::Pending
            }
            Some(key) => {
                if let Some(pos) = state.granted.iter().position(|k| *k == key) {
                    state.granted.swap_remove(pos);
                    this.key = None;
                    this.finished = true;
                    return Poll::Ready(Admission::Granted);
                }
                if let Some(waiter) = state.waiters.iter_mut().find(|w| w.key == key) {
                    waiter.waker.clone_from(cx.waker());
                }
                Poll::Pending
            }
        }
    }
}

impl Drop for Acquire<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let Some(key) = self.key else {
            return;
        };
        let mut state = self.gate.state.lock();
        if let Some(pos) = state.waiters.iter().position(|w| w.key == key) {
            state.waiters.remove(pos);
        } else if let Some(pos) = state.granted.iter().position(|k| *k == key) {
            // Granted but never observed: the slot goes back to the pool.
            state.granted.swap_remove(pos);
            state.available += 1;
            state.grant_ready();
        }
    }
}
