// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod run;
pub mod error;
pub mod message;
pub mod checkpoint;
pub mod execution_record;
pub mod repository;
pub mod events;
pub mod cancellation;
