// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Runtime configuration
//!
//! Lane concurrency caps, run TTL and queue diagnostics thresholds.
//! Values come from the environment with sensible defaults, so a fleet
//! can be tuned per deployment without a config file.

use std::time::Duration;

use crate::domain::run::LaneName;

/// Per-lane concurrency caps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneConcurrency {
    pub main: usize,
    pub subagent: usize,
    pub cron: usize,
    pub nested: usize,
}

impl LaneConcurrency {
    pub fn for_lane(&self, lane: LaneName) -> usize {
        let cap = match lane {
            LaneName::Main => self.main,
            LaneName::Subagent => self.subagent,
            LaneName::Cron => self.cron,
            LaneName::Nested => self.nested,
        };
        // A zero cap would stall the lane forever.
        cap.max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub lanes: LaneConcurrency,
    /// Default lifetime of a run without an explicit timeout.
    pub run_ttl: Duration,
    /// Queue wait beyond this threshold is logged as a warning.
    pub queue_wait_warn: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            lanes: LaneConcurrency {
                main: 8,
                subagent: 16,
                cron: 4,
                nested: 16,
            },
            run_ttl: Duration::from_secs(600),
            queue_wait_warn: Duration::from_secs(10),
        }
    }
}

impl RuntimeConfig {
    /// Loads configuration from the environment, falling back to defaults
    /// for missing or unparsable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lanes: LaneConcurrency {
                main: env_usize("AEGIS_LANE_MAIN_CONCURRENCY", defaults.lanes.main),
                subagent: env_usize("AEGIS_LANE_SUBAGENT_CONCURRENCY", defaults.lanes.subagent),
                cron: env_usize("AEGIS_LANE_CRON_CONCURRENCY", defaults.lanes.cron),
                nested: env_usize("AEGIS_LANE_NESTED_CONCURRENCY", defaults.lanes.nested),
            },
            run_ttl: env_millis("AEGIS_RUN_TTL_MS", defaults.run_ttl),
            queue_wait_warn: env_millis("AEGIS_QUEUE_WAIT_WARN_MS", defaults.queue_wait_warn),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_cap_is_clamped() {
        let mut config = RuntimeConfig::default();
        config.lanes.cron = 0;
        assert_eq!(config.lanes.for_lane(LaneName::Cron), 1);
        assert_eq!(config.lanes.for_lane(LaneName::Main), 8);
    }

    #[test]
    fn defaults_are_reasonable() {
        let config = RuntimeConfig::default();
        assert_eq!(config.run_ttl, Duration::from_secs(600));
        assert!(config.lanes.subagent >= config.lanes.main);
    }
}
