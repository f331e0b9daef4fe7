//! Service configuration.

use crate::error::{AutoupdateError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Autoupdate configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoupdateConfig {
    /// How often old topic events are pruned.
    /// Default: 1 minute
    pub prune_interval: Duration,

    /// How long a topic id stays valid. A client that takes longer to come
    /// back gets a full resync. Longer means more memory.
    /// Default: 10 minutes
    pub prune_retention: Duration,

    /// How often the datastore cache is reset. Every reset forces all
    /// connections to recompute their data, so short values mean more load
    /// and long values mean a bigger, staler cache.
    /// Default: 10 seconds
    pub cache_reset_interval: Duration,
}

impl Default for AutoupdateConfig {
    fn default() -> Self {
        Self {
            prune_interval: Duration::from_secs(60),
            prune_retention: Duration::from_secs(10 * 60),
            // TODO: raise to an hour once cache-reset bugs stop showing up in
            // development.
            cache_reset_interval: Duration::from_secs(10),
        }
    }
}

impl AutoupdateConfig {
    /// Reject zero durations.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("prune_interval", self.prune_interval),
            ("prune_retention", self.prune_retention),
            ("cache_reset_interval", self.cache_reset_interval),
        ];

        for (name, value) in fields {
            if value.is_zero() {
                return Err(AutoupdateError::InvalidConfig(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AutoupdateConfig::default();
        config.validate().unwrap();
        assert!(config.cache_reset_interval < config.prune_interval);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = AutoupdateConfig {
            cache_reset_interval: Duration::ZERO,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AutoupdateError::InvalidConfig(_)));
        assert!(err.to_string().contains("cache_reset_interval"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: AutoupdateConfig =
            serde_json::from_str(r#"{"prune_retention": {"secs": 30, "nanos": 0}}"#).unwrap();
        assert_eq!(config.prune_retention, Duration::from_secs(30));
        assert_eq!(config.prune_interval, Duration::from_secs(60));
    }
}
