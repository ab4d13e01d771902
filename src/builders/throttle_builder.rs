//! Builders to construct throttles from configuration.

use crate::config::ThrottleConfig;
use crate::core::error::ThrottleError;
use crate::core::throttle::{Spawn, Throttle};

/// Build a throttle from validated configuration and a spawner.
pub fn build_throttle<S>(cfg: &ThrottleConfig, spawner: S) -> Result<Throttle<S>, ThrottleError>
where
    S: Spawn,
{
    cfg.validate().map_err(ThrottleError::Config)?;
    let limit = cfg.concurrency()?;
    Ok(Throttle::with_spawner(limit, spawner))
}

/// Build a throttle from configuration, spawning on the current tokio runtime.
///
/// # Panics
///
/// Panics when called outside a tokio runtime context.
#[cfg(feature = "tokio-runtime")]
pub fn build_tokio_throttle(
    cfg: &ThrottleConfig,
) -> Result<Throttle<crate::runtime::TokioSpawner>, ThrottleError> {
    build_throttle(cfg, crate::runtime::TokioSpawner::current())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;

    #[derive(Clone)]
    struct NoOpSpawner;

    impl Spawn for NoOpSpawner {
        fn spawn<F>(&self, _fut: F)
        where
            F: Future<Output = ()> + Send + 'static,
        {
        }
    }

    #[test]
    fn test_build_from_valid_config() {
        let cfg = ThrottleConfig { max_in_flight: 4 };
        let throttle = build_throttle(&cfg, NoOpSpawner).unwrap();
        assert_eq!(throttle.limit().slots(), Some(4));
    }

    #[test]
    fn test_build_rejects_negative_limit() {
        let cfg = ThrottleConfig { max_in_flight: -3 };
        assert!(build_throttle(&cfg, NoOpSpawner).is_err());
    }

    #[test]
    fn test_build_zero_is_unlimited() {
        let cfg = ThrottleConfig { max_in_flight: 0 };
        let throttle = build_throttle(&cfg, NoOpSpawner).unwrap();
        assert!(throttle.limit().is_unlimited());
    }
}
