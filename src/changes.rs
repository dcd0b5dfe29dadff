//! The change-set value object and its internal mutation surface.
//!
//! Consumers only ever see the finalized, immutable [`ItemListChanges`];
//! all mutation goes through [`ItemListChangesBuilder`], which the
//! aggregator holds for the duration of one observation cycle.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{ChangesError, ListingSide, Result};

/// A single item relocation between the old and new listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    /// Index in the old listing.
    pub source: usize,
    /// Index in the new listing.
    pub destination: usize,
}

/// Finalized, indexed diff between two listing snapshots for one
/// observation cycle.
///
/// Deletion indices refer to the old listing; insertion and modification
/// indices refer to the new listing. Movements are kept in detection order
/// so consumers can apply them as a deterministic batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemListChanges {
    deletions: BTreeSet<usize>,
    insertions: BTreeSet<usize>,
    modifications: BTreeSet<usize>,
    movements: Vec<Movement>,
}

impl ItemListChanges {
    /// Old-listing positions that were removed.
    pub fn deletion_indices(&self) -> &BTreeSet<usize> {
        &self.deletions
    }

    /// New-listing positions that were added.
    pub fn insertion_indices(&self) -> &BTreeSet<usize> {
        &self.insertions
    }

    /// New-listing positions whose content changed without a position shift.
    pub fn modification_indices(&self) -> &BTreeSet<usize> {
        &self.modifications
    }

    /// Relocations in detection order.
    pub fn movements(&self) -> &[Movement] {
        &self.movements
    }

    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty()
            && self.insertions.is_empty()
            && self.modifications.is_empty()
            && self.movements.is_empty()
    }
}

/// Mutation surface for one observation cycle.
///
/// Mutators are idempotent and bounds-checked; a rejected call leaves the
/// accumulated state unchanged. Cross-category conflicts (the same item
/// reported as both deleted and moved, say) are the aggregator's job to
/// prevent; the builder only polices bounds, duplicates and overlapping
/// movement pairs.
#[derive(Debug)]
pub(crate) struct ItemListChangesBuilder {
    old_len: usize,
    new_len: usize,
    changes: ItemListChanges,
}

impl ItemListChangesBuilder {
    pub(crate) fn new(old_len: usize, new_len: usize) -> Self {
        Self {
            old_len,
            new_len,
            changes: ItemListChanges::default(),
        }
    }

    /// Record `index` as deleted from the old listing.
    pub(crate) fn add_deletion_index(&mut self, index: usize) -> Result<()> {
        self.check_old(index)?;
        self.changes.deletions.insert(index);
        Ok(())
    }

    /// Record `index` as inserted into the new listing.
    pub(crate) fn add_insertion_index(&mut self, index: usize) -> Result<()> {
        self.check_new(index)?;
        self.changes.insertions.insert(index);
        Ok(())
    }

    /// Record `index` as modified in place.
    pub(crate) fn add_modification_index(&mut self, index: usize) -> Result<()> {
        self.check_new(index)?;
        self.changes.modifications.insert(index);
        Ok(())
    }

    /// Record a relocation from `source` in the old listing to
    /// `destination` in the new one.
    ///
    /// Re-adding an identical pair is a no-op. A pair sharing its source or
    /// destination with a *different* recorded movement is rejected, since
    /// applying both as a batch would be ambiguous.
    pub(crate) fn add_movement(&mut self, source: usize, destination: usize) -> Result<()> {
        self.check_old(source)?;
        self.check_new(destination)?;

        let movement = Movement {
            source,
            destination,
        };

        if self.changes.movements.contains(&movement) {
            return Ok(());
        }

        if self
            .changes
            .movements
            .iter()
            .any(|m| m.source == source || m.destination == destination)
        {
            return Err(ChangesError::ConflictingMovement {
                source,
                destination,
            });
        }

        self.changes.movements.push(movement);
        Ok(())
    }

    /// Finalize into the immutable change set handed to consumers.
    pub(crate) fn finish(self) -> ItemListChanges {
        self.changes
    }

    fn check_old(&self, index: usize) -> Result<()> {
        if index >= self.old_len {
            return Err(ChangesError::IndexOutOfBounds {
                index,
                len: self.old_len,
                listing: ListingSide::Old,
            });
        }
        Ok(())
    }

    fn check_new(&self, index: usize) -> Result<()> {
        if index >= self.new_len {
            return Err(ChangesError::IndexOutOfBounds {
                index,
                len: self.new_len,
                listing: ListingSide::New,
            });
        }
        Ok(())
    }
}
