//! Throttle configuration structures.

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::error::{AppResult, ThrottleError};
use crate::core::throttle::Concurrency;

/// Environment variable consulted by [`ThrottleConfig::from_env`].
pub const MAX_IN_FLIGHT_ENV: &str = "THROTTLE_MAX_IN_FLIGHT";

/// Throttle configuration.
///
/// The limit is carried as a signed integer because configuration files and
/// environment variables can hold any value; [`ThrottleConfig::validate`]
/// rejects negative limits before they reach the engine, where a negative
/// availability counter could never grant a slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Maximum in-flight tasks. Zero means no cap.
    pub max_in_flight: i64,
}

impl Default for ThrottleConfig {
    /// No cap by default.
    fn default() -> Self {
        Self { max_in_flight: 0 }
    }
}

impl ThrottleConfig {
    /// A cap matching the number of logical CPUs, for CPU-bound work.
    #[must_use]
    pub fn cpu_bound() -> Self {
        Self {
            max_in_flight: i64::try_from(num_cpus::get()).unwrap_or(i64::MAX),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_in_flight < 0 {
            return Err(format!(
                "max_in_flight must not be negative (got {})",
                self.max_in_flight
            ));
        }
        Ok(())
    }

    /// The validated concurrency setting for the engine.
    pub fn concurrency(&self) -> Result<Concurrency, ThrottleError> {
        Concurrency::from_raw(self.max_in_flight)
    }

    /// Parse throttle configuration from a JSON string and validate.
    ///
    /// # Examples
    ///
    /// ```
    /// use prometheus_throttle::config::ThrottleConfig;
    ///
    /// let cfg = ThrottleConfig::from_json_str(r#"{"max_in_flight": 4}"#).unwrap();
    /// assert_eq!(cfg.max_in_flight, 4);
    /// assert!(ThrottleConfig::from_json_str(r#"{"max_in_flight": -1}"#).is_err());
    /// ```
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the environment, honoring a `.env` file.
    ///
    /// A missing [`MAX_IN_FLIGHT_ENV`] falls back to the default (no cap).
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        let cfg = match std::env::var(MAX_IN_FLIGHT_ENV) {
            Ok(raw) => Self {
                max_in_flight: raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{MAX_IN_FLIGHT_ENV} is not an integer: {raw}"))?,
            },
            Err(std::env::VarError::NotPresent) => Self::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("{MAX_IN_FLIGHT_ENV} is not valid unicode"))
            }
        };
        cfg.validate().map_err(ThrottleError::Config)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_negative() {
        let cfg = ThrottleConfig { max_in_flight: -2 };
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("must not be negative"));
        assert!(cfg.concurrency().is_err());
    }

    #[test]
    fn test_zero_means_no_cap() {
        let cfg = ThrottleConfig { max_in_flight: 0 };
        assert!(cfg.validate().is_ok());
        assert!(cfg.concurrency().unwrap().is_unlimited());
    }

    #[test]
    fn test_from_json_str() {
        let cfg = ThrottleConfig::from_json_str(r#"{"max_in_flight": 8}"#).unwrap();
        assert_eq!(cfg.max_in_flight, 8);
        assert_eq!(cfg.concurrency().unwrap().slots(), Some(8));

        assert!(ThrottleConfig::from_json_str(r#"{"max_in_flight": -1}"#).is_err());
        assert!(ThrottleConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_cpu_bound_is_positive() {
        let cfg = ThrottleConfig::cpu_bound();
        assert!(cfg.max_in_flight > 0);
        assert!(cfg.validate().is_ok());
    }
}
