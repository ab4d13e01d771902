//! Integration tests for the blocking runner.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use prometheus_throttle::config::ThrottleConfig;
use prometheus_throttle::core::run_limited_blocking;

#[test]
fn test_config_driven_blocking_run() {
    let cfg = ThrottleConfig::from_json_str(r#"{"max_in_flight": 3}"#).unwrap();
    let limit = cfg.concurrency().unwrap();

    let active = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);

    let out = run_limited_blocking(
        (0..12u64).collect::<Vec<_>>(),
        |n, _index| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(15));
            active.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, String>(n * 10)
        },
        limit,
    )
    .unwrap();

    assert_eq!(out, (0..12u64).map(|n| n * 10).collect::<Vec<_>>());
    assert!(peak.load(Ordering::SeqCst) <= 3, "cap exceeded");
}

#[test]
fn test_blocking_fail_fast_returns_first_settled_error() {
    let calls = AtomicUsize::new(0);

    let err = run_limited_blocking(
        vec![1u32, 2, 3, 4],
        |n, index| {
            calls.fetch_add(1, Ordering::SeqCst);
            if n == 2 {
                Err(format!("item {index} rejected"))
            } else {
                Ok(n)
            }
        },
        1,
    )
    .unwrap_err();

    assert_eq!(err, "item 1 rejected");
    // Single worker, strict order: items 3 and 4 are never drawn.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
