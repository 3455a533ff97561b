// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod cancel_channel;
pub mod checkpoint;
pub mod progress;
pub mod repositories;

pub use cancel_channel::InProcessCancelChannel;
pub use checkpoint::{CheckpointSuspension, InMemoryCheckpointer};
pub use progress::{BroadcastProgressPublisher, NoopProgressPublisher};
pub use repositories::InMemoryExecutionRecordRepository;
