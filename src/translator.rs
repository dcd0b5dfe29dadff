//! Identity-to-index translation for one observation cycle.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::warn;

use crate::error::{Diagnostic, ListingSide};
use crate::event::ItemId;

/// Per-cycle lookup from item identity to its position in the old and new
/// listings. Built once in O(n), resolved in O(1) per event.
#[derive(Debug)]
pub(crate) struct ListingIndices {
    old: HashMap<ItemId, usize>,
    new: HashMap<ItemId, usize>,
    old_len: usize,
    new_len: usize,
}

impl ListingIndices {
    pub(crate) fn new(
        old_listing: &[ItemId],
        new_listing: &[ItemId],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            old: index_listing(old_listing, ListingSide::Old, diagnostics),
            new: index_listing(new_listing, ListingSide::New, diagnostics),
            old_len: old_listing.len(),
            new_len: new_listing.len(),
        }
    }

    pub(crate) fn old_index(&self, item: &ItemId) -> Option<usize> {
        self.old.get(item).copied()
    }

    pub(crate) fn new_index(&self, item: &ItemId) -> Option<usize> {
        self.new.get(item).copied()
    }

    pub(crate) fn resolve(&self, item: &ItemId) -> (Option<usize>, Option<usize>) {
        (self.old_index(item), self.new_index(item))
    }

    pub(crate) fn old_len(&self) -> usize {
        self.old_len
    }

    pub(crate) fn new_len(&self) -> usize {
        self.new_len
    }
}

/// Identities are expected to be unique within a listing; a repeated one is
/// corrupt input, so the lowest index wins and a diagnostic is recorded.
fn index_listing(
    listing: &[ItemId],
    side: ListingSide,
    diagnostics: &mut Vec<Diagnostic>,
) -> HashMap<ItemId, usize> {
    let mut indices = HashMap::with_capacity(listing.len());

    for (index, item) in listing.iter().enumerate() {
        match indices.entry(*item) {
            Entry::Vacant(entry) => {
                entry.insert(index);
            }
            Entry::Occupied(entry) => {
                let kept_index = *entry.get();
                warn!(
                    %item,
                    %side,
                    kept_index,
                    duplicate_index = index,
                    "Duplicate identity in listing, keeping lowest index",
                );
                diagnostics.push(Diagnostic::DuplicateIdentity {
                    item: *item,
                    listing: side,
                    kept_index,
                    duplicate_index: index,
                });
            }
        }
    }

    indices
}
