// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Run metadata - identifiers and bookkeeping for trackable, cancelable runs

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Global concurrency lane a run executes in. Each lane has its own
/// configurable concurrency cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneName {
    Main,
    Subagent,
    Cron,
    Nested,
}

impl LaneName {
    pub fn as_str(&self) -> &'static str {
        match self {
            LaneName::Main => "main",
            LaneName::Subagent => "subagent",
            LaneName::Cron => "cron",
            LaneName::Nested => "nested",
        }
    }

    pub const ALL: [LaneName; 4] = [
        LaneName::Main,
        LaneName::Subagent,
        LaneName::Cron,
        LaneName::Nested,
    ];
}

impl std::fmt::Display for LaneName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path admitted the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunSource {
    Chat,
    Integration,
    Task,
    Handoff,
}

impl RunSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunSource::Chat => "chat",
            RunSource::Integration => "integration",
            RunSource::Task => "task",
            RunSource::Handoff => "handoff",
        }
    }
}

impl std::fmt::Display for RunSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admission options for one run.
///
/// The cancellation token created here is the run's cancellation handle;
/// clone it into the task body so the task can observe cancellation
/// cooperatively.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub run_id: RunId,
    pub session_key: String,
    pub conversation_id: String,
    pub execution_id: Option<String>,
    pub global_lane: LaneName,
    pub source: RunSource,
    pub tenant_id: String,
    pub user_id: String,
    /// Per-run deadline; falls back to the configured run TTL.
    pub timeout: Option<Duration>,
    pub token: CancellationToken,
}

impl RunSpec {
    pub fn new(
        run_id: RunId,
        session_key: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            run_id,
            session_key: session_key.into(),
            conversation_id: conversation_id.into(),
            execution_id: None,
            global_lane: LaneName::Main,
            source: RunSource::Chat,
            tenant_id: String::new(),
            user_id: String::new(),
            timeout: None,
            token: CancellationToken::new(),
        }
    }

    pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = Some(execution_id.into());
        self
    }

    pub fn with_lane(mut self, lane: LaneName) -> Self {
        self.global_lane = lane;
        self
    }

    pub fn with_source(mut self, source: RunSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.tenant_id = tenant_id.into();
        self.user_id = user_id.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Metadata for one active run.
///
/// Invariant: a `Run` (and its cancellation token) exists in the registry
/// exactly as long as the run is active - created at queue admission,
/// removed once the task settles.
#[derive(Debug, Clone)]
pub struct Run {
    pub run_id: RunId,
    pub session_key: String,
    pub conversation_id: String,
    pub execution_id: Option<String>,
    pub lane: LaneName,
    pub source: RunSource,
    pub tenant_id: String,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub token: CancellationToken,
}
