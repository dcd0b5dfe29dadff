//! Error and diagnostic types for change-set aggregation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::{ItemId, RawEventKind};

/// Which listing snapshot an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingSide {
    Old,
    New,
}

impl fmt::Display for ListingSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Old => f.write_str("old"),
            Self::New => f.write_str("new"),
        }
    }
}

/// Contract violations on the change-set mutation surface.
///
/// A rejected mutation leaves the change set untouched.
// Implemented by hand rather than via `thiserror` because the derive treats
// the spec-mandated `source` field of `ConflictingMovement` as an error
// source, which `usize` cannot be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangesError {
    IndexOutOfBounds {
        index: usize,
        len: usize,
        listing: ListingSide,
    },

    /// The pair reuses the source or destination of a different movement
    /// recorded in the same cycle.
    ConflictingMovement { source: usize, destination: usize },
}

impl fmt::Display for ChangesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfBounds {
                index,
                len,
                listing,
            } => write!(
                f,
                "index {index} out of bounds for {listing} listing of length {len}"
            ),
            Self::ConflictingMovement {
                source,
                destination,
            } => write!(
                f,
                "movement ({source}, {destination}) overlaps an already recorded movement"
            ),
        }
    }
}

impl std::error::Error for ChangesError {}

pub type Result<T, E = ChangesError> = std::result::Result<T, E>;

/// Recoverable conditions encountered while aggregating one cycle.
///
/// Diagnostics never abort the cycle; the offending event is dropped and the
/// remaining events still produce a valid change set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// An event referenced an identity absent from both listings.
    UnresolvedIdentity { item: ItemId, kind: RawEventKind },

    /// A listing contained the same identity twice; the lowest index wins.
    DuplicateIdentity {
        item: ItemId,
        listing: ListingSide,
        kept_index: usize,
        duplicate_index: usize,
    },

    /// Degenerate events produced a movement overlapping an earlier one.
    ConflictingMovement {
        item: ItemId,
        source: usize,
        destination: usize,
    },
}
