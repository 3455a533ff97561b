// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Error taxonomy for the runtime core
//!
//! Infrastructure-level failures (transport, scoped lookups) are recovered
//! or degraded by their callers; validation failures surface to the
//! immediate operation; a canceled run settles as `Aborted`, which is an
//! expected outcome and not a system failure.

use std::time::Duration;

use thiserror::Error;

use crate::domain::run::RunId;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Malformed resume payload or wire frame.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Produced by caller-level timing races, never by the core itself.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("broadcast transport failure: {0}")]
    Transport(String),

    /// Expected settlement of a canceled run.
    #[error("run aborted: {reason}")]
    Aborted { reason: String },

    /// Programming-contract violation: the run id is already registered.
    #[error("run {0} is already registered")]
    DuplicateRun(RunId),

    #[error("execution queue is draining, not accepting new tasks")]
    Draining,

    #[error("internal: {0}")]
    Internal(String),
}

impl RuntimeError {
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}
