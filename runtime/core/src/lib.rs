// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! AEGIS agent runtime core
//!
//! Run coordination primitives for a horizontally-scaled agent fleet:
//! tracking active runs, session-ordered execution, distributed
//! cancellation, durable interrupt/resume for client-side tools, and
//! uniform workflow-node execution recording.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Implements the run registry, execution queue,
//!   cancellation protocol and interrupt/resume contract

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
