//! Raw event model consumed by the aggregator.
//!
//! Events arrive from the monitoring collaborator already tagged with a
//! stable identity token. Paths are informational only; listing indices
//! always come from the translator, never from the event itself.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of an observed item, independent of its path or index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ItemId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of a raw file system event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawEventKind {
    Created,
    Removed,
    Modified,
    Renamed,
}

/// A single raw event delivered by the monitoring collaborator for one
/// observation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub item: ItemId,
    pub kind: RawEventKind,
    /// Path before the event, when the notification layer knows it.
    pub old_path: Option<PathBuf>,
    /// Path after the event, when the notification layer knows it.
    pub new_path: Option<PathBuf>,
}

impl RawEvent {
    pub fn created(item: ItemId) -> Self {
        Self::with_kind(item, RawEventKind::Created)
    }

    pub fn removed(item: ItemId) -> Self {
        Self::with_kind(item, RawEventKind::Removed)
    }

    pub fn modified(item: ItemId) -> Self {
        Self::with_kind(item, RawEventKind::Modified)
    }

    pub fn renamed(item: ItemId) -> Self {
        Self::with_kind(item, RawEventKind::Renamed)
    }

    fn with_kind(item: ItemId, kind: RawEventKind) -> Self {
        Self {
            item,
            kind,
            old_path: None,
            new_path: None,
        }
    }

    pub fn old_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.old_path = Some(path.into());
        self
    }

    pub fn new_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.new_path = Some(path.into());
        self
    }
}
