//! Line-state cache: the context stack and lexer carry at the end of each
//! line already formatted, so later requests resume instead of rescanning.

use std::collections::BTreeMap;
use std::hash::Hasher;

use cindent_common::carry::CarryState;
use rustc_hash::FxHasher;
use serde::Serialize;

use crate::context::ContextStack;

/// State at the end of one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub stack: ContextStack,
    pub carry: CarryState,
    /// Document revision the snapshot was computed at.
    pub revision: u64,
    /// Fingerprint of the line text, see [`line_hash`].
    pub text_hash: u64,
}

/// Fingerprint of a line's text, used to detect snapshots made stale by an
/// edit nobody reported.
pub fn line_hash(text: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(text.as_bytes());
    hasher.finish()
}

/// Snapshots keyed by zero-based line number.
#[derive(Debug, Default)]
pub struct LineStateCache {
    snapshots: BTreeMap<usize, Snapshot>,
}

impl LineStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, line: usize) -> Option<&Snapshot> {
        self.snapshots.get(&line)
    }

    pub fn put(&mut self, line: usize, snapshot: Snapshot) {
        self.snapshots.insert(line, snapshot);
    }

    /// Drop every snapshot at or after `line`.
    pub fn invalidate_from(&mut self, line: usize) {
        let dropped = self.snapshots.split_off(&line);
        if !dropped.is_empty() {
            tracing::debug!(line, dropped = dropped.len(), "invalidated line states");
        }
    }

    /// The snapshot with the greatest line number strictly below `line`.
    pub fn nearest_before(&self, line: usize) -> Option<(usize, &Snapshot)> {
        self.snapshots
            .range(..line)
            .next_back()
            .map(|(&line, snapshot)| (line, snapshot))
    }

    /// Keep only snapshots computed at `revision`. Returns how many were
    /// dropped.
    pub fn retain_revision(&mut self, revision: u64) -> usize {
        let before = self.snapshots.len();
        self.snapshots.retain(|_, snapshot| snapshot.revision == revision);
        before - self.snapshots.len()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}
