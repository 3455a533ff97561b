// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Session key resolution
//!
//! Derives the stable key grouping runs that must execute sequentially
//! relative to one another. Pure and deterministic: the same identity
//! always resolves to the same key.

use crate::domain::run::RunId;

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionKeyResolver;

impl SessionKeyResolver {
    /// Key serializing all runs of one conversation thread.
    pub fn conversation_key(&self, conversation_id: &str) -> String {
        format!("chat:conversation:{conversation_id}")
    }

    /// Fallback key for runs admitted without a session - each run gets
    /// its own lane and is only serialized with itself.
    pub fn run_key(&self, run_id: RunId) -> String {
        format!("run:{run_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_keys_are_deterministic() {
        let resolver = SessionKeyResolver;
        assert_eq!(
            resolver.conversation_key("c1"),
            resolver.conversation_key("c1")
        );
        assert_eq!(resolver.conversation_key("c1"), "chat:conversation:c1");
        assert_ne!(
            resolver.conversation_key("c1"),
            resolver.conversation_key("c2")
        );
    }

    #[test]
    fn run_keys_embed_the_run_id() {
        let resolver = SessionKeyResolver;
        let run_id = RunId::new();
        assert_eq!(resolver.run_key(run_id), format!("run:{run_id}"));
    }
}
