//! Runtime configuration for the session core.
//!
//! Values come from defaults, then an optional TOML file, then `ROSTER_*`
//! environment variables, and are validated once before the coordinators are
//! built.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::{Result, RosterError};
use crate::types::MAX_AUTOMATIC_RETRIES;

const ENV_PREFIX: &str = "ROSTER_";

/// Timings and limits for the bootstrapper and the role switch coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Delay before automatic retry `n`, one entry per automatic retry
    pub retry_delays_ms: Vec<u64>,
    /// Silent refresh period while the session is ready
    pub refresh_interval_ms: u64,
    /// Bound on every gateway call
    pub fetch_timeout_ms: u64,
    /// Role switch countdown length
    pub countdown_ms: u64,
    /// Countdown progress update period
    pub countdown_tick_ms: u64,
    /// Buffered toasts per subscriber
    pub toast_capacity: usize,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            retry_delays_ms: vec![1_500, 3_000, 5_000],
            refresh_interval_ms: 60_000,
            fetch_timeout_ms: 8_000,
            countdown_ms: 8_000,
            countdown_tick_ms: 100,
            toast_capacity: 16,
        }
    }
}

impl RosterConfig {
    /// Parse a TOML document. Missing fields keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| RosterError::invalid(format!("invalid config: {e}")))
    }

    /// Load a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RosterError::invalid(format!("failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Apply `ROSTER_*` overrides from the process environment.
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply `ROSTER_*` overrides from an arbitrary variable source.
    pub fn merge_with_vars<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();
            match name {
                "RETRY_DELAYS_MS" => {
                    self.retry_delays_ms = value
                        .split(',')
                        .map(|part| parse_u64(name, part))
                        .collect::<Result<_>>()?;
                }
                "REFRESH_INTERVAL_MS" => self.refresh_interval_ms = parse_u64(name, value)?,
                "FETCH_TIMEOUT_MS" => self.fetch_timeout_ms = parse_u64(name, value)?,
                "COUNTDOWN_MS" => self.countdown_ms = parse_u64(name, value)?,
                "COUNTDOWN_TICK_MS" => self.countdown_tick_ms = parse_u64(name, value)?,
                "TOAST_CAPACITY" => {
                    self.toast_capacity = value.parse().map_err(|e| {
                        RosterError::invalid(format!("{ENV_PREFIX}{name}: {e}"))
                    })?;
                }
                other => tracing::debug!(key = %other, "ignoring unknown roster override"),
            }
        }
        Ok(())
    }

    /// Reject configurations the coordinators cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.retry_delays_ms.len() != usize::from(MAX_AUTOMATIC_RETRIES) {
            return Err(RosterError::invalid(format!(
                "retry_delays_ms must list exactly {MAX_AUTOMATIC_RETRIES} delays, got {}",
                self.retry_delays_ms.len()
            )));
        }
        for (name, value) in [
            ("refresh_interval_ms", self.refresh_interval_ms),
            ("fetch_timeout_ms", self.fetch_timeout_ms),
            ("countdown_ms", self.countdown_ms),
            ("countdown_tick_ms", self.countdown_tick_ms),
        ] {
            if value == 0 {
                return Err(RosterError::invalid(format!("{name} must be greater than 0")));
            }
        }
        if self.countdown_tick_ms > self.countdown_ms {
            return Err(RosterError::invalid(format!(
                "countdown_tick_ms ({}) cannot exceed countdown_ms ({})",
                self.countdown_tick_ms, self.countdown_ms
            )));
        }
        if self.toast_capacity == 0 {
            return Err(RosterError::invalid("toast_capacity must be greater than 0"));
        }
        Ok(())
    }

    /// Delay before automatic retry `attempt` (zero-based), `None` once exhausted.
    pub fn retry_delay(&self, attempt: u8) -> Option<Duration> {
        self.retry_delays_ms
            .get(usize::from(attempt))
            .copied()
            .map(Duration::from_millis)
    }

    /// Silent refresh period.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Gateway call bound.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Countdown length.
    pub fn countdown(&self) -> Duration {
        Duration::from_millis(self.countdown_ms)
    }

    /// Countdown progress period.
    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }
}

fn parse_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|e| RosterError::invalid(format!("{ENV_PREFIX}{name}: {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_timings() {
        let config = RosterConfig::default();
        config.validate().unwrap();
        assert_eq!(config.retry_delay(0), Some(Duration::from_millis(1_500)));
        assert_eq!(config.retry_delay(1), Some(Duration::from_secs(3)));
        assert_eq!(config.retry_delay(2), Some(Duration::from_secs(5)));
        assert_eq!(config.retry_delay(3), None);
        assert_eq!(config.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(8));
        assert_eq!(config.countdown(), Duration::from_secs(8));
        assert_eq!(config.countdown_tick(), Duration::from_millis(100));
    }

    #[test]
    fn toml_overrides_keep_unspecified_defaults() {
        let config = RosterConfig::from_toml_str(
            r#"
            countdown_ms = 5000
            "#,
        )
        .unwrap();
        assert_eq!(config.countdown_ms, 5_000);
        assert_eq!(config.refresh_interval_ms, 60_000);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fetch_timeout_ms = 2000").unwrap();
        let config = RosterConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.fetch_timeout_ms, 2_000);
    }

    #[test]
    fn env_overrides_apply_and_ignore_foreign_keys() {
        let mut config = RosterConfig::default();
        config
            .merge_with_vars([
                ("ROSTER_RETRY_DELAYS_MS", "100, 200,300"),
                ("ROSTER_COUNTDOWN_MS", "4000"),
                ("HOME", "/root"),
                ("ROSTER_SOMETHING_ELSE", "1"),
            ])
            .unwrap();
        assert_eq!(config.retry_delays_ms, vec![100, 200, 300]);
        assert_eq!(config.countdown_ms, 4_000);
    }

    #[test]
    fn env_override_with_bad_number_is_rejected() {
        let mut config = RosterConfig::default();
        let err = config
            .merge_with_vars([("ROSTER_FETCH_TIMEOUT_MS", "soon")])
            .unwrap_err();
        assert!(matches!(err, RosterError::Invalid { .. }));
    }

    #[test]
    fn validation_rejects_unusable_values() {
        let short_schedule = RosterConfig {
            retry_delays_ms: vec![1_000],
            ..RosterConfig::default()
        };
        assert!(short_schedule.validate().is_err());

        let zero_timeout = RosterConfig {
            fetch_timeout_ms: 0,
            ..RosterConfig::default()
        };
        assert!(zero_timeout.validate().is_err());

        let coarse_tick = RosterConfig {
            countdown_tick_ms: 9_000,
            ..RosterConfig::default()
        };
        assert!(coarse_tick.validate().is_err());
    }
}
