// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod config;
pub mod session_key;
pub mod run_registry;
pub mod run_sweeper;
pub mod execution_queue;
pub mod cancel_broadcaster;
pub mod execution_runtime;
pub mod cancel_orchestrator;
pub mod interrupt_resume;
pub mod node_execution;

// Re-export the main entry points for convenience
pub use cancel_orchestrator::{CancelOrchestrator, CancelOutcome, CancelRunCommand};
pub use execution_queue::{ExecutionQueue, LaneStats};
pub use execution_runtime::ExecutionRuntime;
pub use run_registry::RunRegistry;
