//! Blocking variant of the throttled runner for synchronous closures.
//!
//! Same semantics as the async engine — input-order dispatch, bounded
//! concurrency, fail-fast on the first error, results assembled in input
//! order — carried by scoped worker threads instead of spawned futures.
//! Workers draw indexed elements from a shared queue and report settlements
//! over a channel to the calling thread, which acts as the aggregator.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use parking_lot::Mutex;

use crate::core::throttle::Concurrency;

/// Settlement of one element, reported by a worker.
enum WorkerOutcome<R, E> {
    Completed(R),
    Failed(E),
    Panicked(Box<dyn std::any::Any + Send>),
}

/// Run `task` over every element of `items` on worker threads, at most
/// `limit` elements in flight, and return the results in input order.
///
/// Elements are drawn strictly in input order. The first error (in settlement
/// order) ends the run: workers stop drawing, elements already being processed
/// finish and their outcomes are discarded, and that error is returned. A
/// panicking task ends the run the same way and the panic is resumed on the
/// caller. An empty input returns an empty `Vec` without invoking `task`.
///
/// With [`Concurrency::Unlimited`] one worker is started per element.
pub fn run_limited_blocking<T, R, E, F>(
    items: Vec<T>,
    task: F,
    limit: impl Into<Concurrency>,
) -> Result<Vec<R>, E>
where
    T: Send,
    R: Send,
    E: Send,
    F: Fn(T, usize) -> Result<R, E> + Sync,
{
    let limit = limit.into();
    let expected = items.len();
    if expected == 0 {
        return Ok(Vec::new());
    }

    let workers = match limit {
        Concurrency::Limited(n) => n.get().min(expected),
        Concurrency::Unlimited => expected,
    };
    tracing::debug!("blocking run started: {expected} items, {workers} workers, limit {limit}");

    let queue: Mutex<VecDeque<(usize, T)>> = Mutex::new(items.into_iter().enumerate().collect());
    let done = AtomicBool::new(false);
    let (tx, rx) = crossbeam_channel::unbounded::<(usize, WorkerOutcome<R, E>)>();

    let (mut entries, terminal) = thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let queue = &queue;
            let done = &done;
            let task = &task;
            scope.spawn(move || loop {
                if done.load(Ordering::Acquire) {
                    break;
                }
                let Some((index, value)) = queue.lock().pop_front() else {
                    break;
                };
                let outcome = match catch_unwind(AssertUnwindSafe(|| task(value, index))) {
                    Ok(Ok(value)) => WorkerOutcome::Completed(value),
                    Ok(Err(error)) => {
                        done.store(true, Ordering::Release);
                        WorkerOutcome::Failed(error)
                    }
                    Err(panic) => {
                        done.store(true, Ordering::Release);
                        WorkerOutcome::Panicked(panic)
                    }
                };
                if tx.send((index, outcome)).is_err() {
                    break;
                }
            });
        }
        drop(tx);

        // Aggregate on the calling thread; the first failed settlement wins.
        let mut entries: Vec<(usize, R)> = Vec::with_capacity(expected);
        let mut terminal: Option<WorkerOutcome<R, E>> = None;
        for (index, outcome) in rx {
            match outcome {
                WorkerOutcome::Completed(value) => {
                    entries.push((index, value));
                    if entries.len() == expected {
                        break;
                    }
                }
                WorkerOutcome::Failed(_) | WorkerOutcome::Panicked(_) => {
                    tracing::debug!("blocking run failed at item {index}");
                    terminal = Some(outcome);
                    break;
                }
            }
        }
        (entries, terminal)
    });

    match terminal {
        Some(WorkerOutcome::Failed(error)) => Err(error),
        Some(WorkerOutcome::Panicked(panic)) => std::panic::resume_unwind(panic),
        Some(WorkerOutcome::Completed(_)) | None => {
            entries.sort_unstable_by_key(|&(index, _)| index);
            Ok(entries.into_iter().map(|(_, value)| value).collect())
        }
    }
}
