// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Run sweeper - background task expiring stale runs
//!
//! Periodically sweeps the run registry for runs past their deadline so a
//! task that never settles (e.g. an in-flight call that ignored its
//! cancellation signal) cannot leak its registry entry forever.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{debug, info};

use crate::application::config::RuntimeConfig;
use crate::application::run_registry::RunRegistry;

pub struct RunSweeper {
    registry: Arc<RunRegistry>,
    sweep_interval: Duration,
    shutdown_token: tokio_util::sync::CancellationToken,
}

impl RunSweeper {
    pub fn new(registry: Arc<RunRegistry>, config: &RuntimeConfig) -> Self {
        // Sweep at half the TTL, but never tighter than once a second.
        let sweep_interval = (config.run_ttl / 2).max(Duration::from_secs(1));
        Self::with_interval(registry, sweep_interval)
    }

    pub fn with_interval(registry: Arc<RunRegistry>, sweep_interval: Duration) -> Self {
        Self {
            registry,
            sweep_interval,
            shutdown_token: tokio_util::sync::CancellationToken::new(),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> tokio_util::sync::CancellationToken {
        self.shutdown_token.clone()
    }

    /// Start the sweeper background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        info!(
            sweep_interval_ms = self.sweep_interval.as_millis() as u64,
            "Starting run sweeper background task"
        );

        let mut tick = interval(self.sweep_interval);
        // The first tick fires immediately; skip it so a fresh runtime
        // does not sweep before anything could expire.
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    debug!("Running sweep cycle");
                    let swept = self.registry.sweep_expired();
                    if swept > 0 {
                        info!(swept, "Sweep cycle expired runs");
                    }
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping run sweeper");
                    break;
                }
            }
        }
    }
}
