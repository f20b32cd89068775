//! Dedup registries for blocks and canvas images.
//!
//! The scroll loop sees the same blocks on every pass; these registries are
//! what make re-scanning idempotent. Both live for exactly one extraction
//! session and only ever grow.

use std::collections::{HashMap, HashSet};

/// Identities of blocks that have already been emitted.
///
/// Admission is the single source of truth for "is this block new": a block
/// contributes to the pass's new-block count only when [`admit`] returns
/// `true`, which happens at most once per identity.
///
/// [`admit`]: AppearRegistry::admit
#[derive(Debug, Default)]
pub struct AppearRegistry {
    seen: HashSet<String>,
}

impl AppearRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit an identity. Returns `true` the first time, `false` ever after.
    pub fn admit(&mut self, id: &str) -> bool {
        self.seen.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Per-canvas capture state: captured flag plus failed-attempt count.
///
/// Canvas blocks bypass the scan-level suppression so capture can be retried
/// until the renderer has actually painted the canvas. This registry keeps
/// that retrying bounded and the output deduplicated.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    captured: HashSet<String>,
    attempts: HashMap<String, u32>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the image for this identity has been persisted and referenced.
    pub fn is_captured(&self, id: &str) -> bool {
        self.captured.contains(id)
    }

    /// Mark the identity as captured. Later passes skip it entirely.
    pub fn mark_captured(&mut self, id: &str) {
        self.captured.insert(id.to_string());
        self.attempts.remove(id);
    }

    /// Record one failed capture attempt and return the new total.
    pub fn record_attempt(&mut self, id: &str) -> u32 {
        let n = self.attempts.entry(id.to_string()).or_insert(0);
        *n += 1;
        *n
    }

    /// Failed attempts recorded so far for this identity.
    pub fn attempts(&self, id: &str) -> u32 {
        self.attempts.get(id).copied().unwrap_or(0)
    }

    pub fn captured_count(&self) -> usize {
        self.captured.len()
    }
}
