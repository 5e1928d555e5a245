//! Host-facing change notifications.
//!
//! Every grid operation that mutates layout publishes exactly one
//! [`LayoutCommit`] after all of its changes are applied, so a host renderer
//! never observes a half-maximized or half-restored grid. Commits carry the
//! post-change state of each touched item or track, in application order.

use std::sync::Mutex;
use std::time::SystemTime;

use serde::Serialize;

use crate::error::TrackAxis;
use crate::layout::{GridSize, ItemId, Placement};

/// Operation that produced a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStage {
    /// Column and row tracks were created.
    CellsDefined,
    /// An item was auto-placed.
    ItemPlaced,
    /// A placeholder region was reserved.
    CellMerged,
    /// Track sizing modes changed.
    CellFormatted,
    /// A host-driven visibility change.
    VisibilityChanged,
    /// One item was expanded over the grid and the rest hidden.
    Maximized,
    /// The pre-maximize layout was written back.
    Restored,
    /// Deferred visibility toggle ran.
    Refreshed,
}

/// Post-change state of one item or track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayoutChange {
    Item {
        id: ItemId,
        placement: Placement,
        visible: bool,
    },
    Track {
        axis: TrackAxis,
        index: usize,
        size: GridSize,
    },
}

/// One atomic batch of layout changes.
#[derive(Debug, Clone)]
pub struct LayoutCommit {
    pub timestamp: SystemTime,
    pub stage: CommitStage,
    pub changes: Vec<LayoutChange>,
}

impl LayoutCommit {
    pub fn new(stage: CommitStage, changes: Vec<LayoutChange>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            changes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Item changes only, skipping track updates.
    pub fn items(&self) -> impl Iterator<Item = (ItemId, Placement, bool)> + '_ {
        self.changes.iter().filter_map(|change| match change {
            LayoutChange::Item {
                id,
                placement,
                visible,
            } => Some((*id, *placement, *visible)),
            LayoutChange::Track { .. } => None,
        })
    }
}

/// Trait implemented by anything that re-renders from committed changes.
pub trait LayoutObserver: Send + Sync {
    fn commit(&self, commit: &LayoutCommit);
}

/// Default no-op implementation used when no host is attached.
#[derive(Debug, Default)]
pub struct NullLayoutObserver;

impl LayoutObserver for NullLayoutObserver {
    fn commit(&self, _commit: &LayoutCommit) {}
}

/// Buffers every commit; useful for hosts that poll and for tests.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    commits: Mutex<Vec<LayoutCommit>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commits(&self) -> Vec<LayoutCommit> {
        self.commits
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn take(&self) -> Vec<LayoutCommit> {
        self.commits
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default()
    }

    pub fn stages(&self) -> Vec<CommitStage> {
        self.commits().iter().map(|commit| commit.stage).collect()
    }
}

impl LayoutObserver for RecordingObserver {
    fn commit(&self, commit: &LayoutCommit) {
        if let Ok(mut guard) = self.commits.lock() {
            guard.push(commit.clone());
        }
    }
}
