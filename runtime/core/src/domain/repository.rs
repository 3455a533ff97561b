// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;

use crate::domain::error::RuntimeError;
use crate::domain::execution_record::{ExecutionRecord, ExecutionRecordId, ExecutionRecordPatch};

/// Tenant scope for record lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordScope {
    pub tenant_id: String,
    pub organization_id: Option<String>,
}

/// External persistence contract for execution records.
///
/// `update` performs a scoped lookup first and falls back to a lookup by
/// id alone before reporting `NotFound` - records written by another
/// scope (e.g. a system-level parent run) must still reach a terminal
/// status.
#[async_trait]
pub trait ExecutionRecordRepository: Send + Sync {
    async fn create(&self, record: ExecutionRecord) -> Result<ExecutionRecord, RuntimeError>;

    async fn update(
        &self,
        scope: &RecordScope,
        id: ExecutionRecordId,
        patch: ExecutionRecordPatch,
    ) -> Result<ExecutionRecord, RuntimeError>;

    async fn find_by_id(
        &self,
        id: ExecutionRecordId,
    ) -> Result<Option<ExecutionRecord>, RuntimeError>;
}
