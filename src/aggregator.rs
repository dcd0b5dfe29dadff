//! Folds one observation cycle's raw events into a finalized change set.
//!
//! Events are collapsed per identity first (the terminal state wins when an
//! item has several events in one cycle), then resolved against the listing
//! indices. A removal and a creation sharing the same identity are paired
//! into a single movement, the same way the platform watchers pair a
//! remove/create seen for one inode into a rename.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};

use crate::changes::{ItemListChanges, ItemListChangesBuilder};
use crate::error::{ChangesError, Diagnostic, Result};
use crate::event::{ItemId, RawEvent, RawEventKind};
use crate::translator::ListingIndices;

/// Result of aggregating one observation cycle: the finalized change set
/// plus any recoverable diagnostics encountered along the way.
#[derive(Debug, Clone)]
pub struct CycleOutput {
    pub changes: ItemListChanges,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Aggregator;

impl Aggregator {
    /// Aggregate one cycle.
    ///
    /// Never fails: degenerate input degrades to diagnostics and a valid,
    /// possibly empty, change set.
    pub fn aggregate(
        old_listing: &[ItemId],
        new_listing: &[ItemId],
        events: &[RawEvent],
    ) -> CycleOutput {
        let mut diagnostics = Vec::new();
        let indices = ListingIndices::new(old_listing, new_listing, &mut diagnostics);
        let mut builder = ItemListChangesBuilder::new(indices.old_len(), indices.new_len());

        // Collapse events per identity, keeping first-seen order so movement
        // emission stays deterministic.
        let mut pending: HashMap<ItemId, PendingItem> = HashMap::with_capacity(events.len());
        let mut order: Vec<ItemId> = Vec::with_capacity(events.len());
        for event in events {
            trace!(?event, "Folding raw event");
            pending
                .entry(event.item)
                .or_insert_with(|| {
                    order.push(event.item);
                    PendingItem::default()
                })
                .record(event.kind);
        }

        let mut actions: Vec<(ItemId, Action)> = Vec::with_capacity(order.len());
        let mut repositioned: HashSet<ItemId> = HashSet::new();
        for item in order {
            if let Some(action) = classify_item(item, &pending[&item], &indices, &mut diagnostics)
            {
                if matches!(
                    action,
                    Action::Delete { .. } | Action::Insert { .. } | Action::Move { .. }
                ) {
                    repositioned.insert(item);
                }
                actions.push((item, action));
            }
        }

        // Rank every surviving common item by its relative order among the
        // other survivors. An item shifted only by insertions or deletions at
        // lower indices keeps its rank; a rank change means it actually moved.
        let old_ranks = common_ranks(old_listing, &indices, &repositioned, true);
        let new_ranks = common_ranks(new_listing, &indices, &repositioned, false);

        // Settle the modified items that may also have changed position, so
        // the sweep below ranks the remaining items without them.
        for (item, action) in &mut actions {
            if let Action::ModifyOrMove {
                source,
                destination,
            } = *action
            {
                *action = if old_ranks.get(item) == new_ranks.get(item) {
                    Action::Modify { destination }
                } else {
                    // The item changed position as well, so consumers must
                    // see a movement rather than an in-place edit with a
                    // stale index.
                    repositioned.insert(*item);
                    Action::Move {
                        source,
                        destination,
                    }
                };
            }
        }

        let old_ranks = common_ranks(old_listing, &indices, &repositioned, true);
        let new_ranks = common_ranks(new_listing, &indices, &repositioned, false);

        for (item, action) in actions {
            match action {
                Action::Delete { source } => {
                    apply(builder.add_deletion_index(source), item);
                }
                Action::Insert { destination } => {
                    apply(builder.add_insertion_index(destination), item);
                }
                Action::Modify { destination } => {
                    apply(builder.add_modification_index(destination), item);
                }
                Action::Move {
                    source,
                    destination,
                } => {
                    apply_movement(&mut builder, item, source, destination, &mut diagnostics);
                }
                Action::ModifyOrMove { .. } => unreachable!("settled above"),
            }
        }

        // Items with no event at all can still have moved, observable purely
        // from the two listings (e.g. a position swap).
        for (source, item) in old_listing.iter().enumerate() {
            if pending.contains_key(item) || indices.old_index(item) != Some(source) {
                continue;
            }
            let (Some(old_rank), Some(new_rank)) = (old_ranks.get(item), new_ranks.get(item))
            else {
                continue;
            };
            if old_rank != new_rank {
                let Some(destination) = indices.new_index(item) else {
                    continue;
                };
                trace!(%item, source, destination, "Detected implicit movement");
                apply_movement(&mut builder, *item, source, destination, &mut diagnostics);
            }
        }

        let changes = builder.finish();

        debug!(
            deletions = changes.deletion_indices().len(),
            insertions = changes.insertion_indices().len(),
            modifications = changes.modification_indices().len(),
            movements = changes.movements().len(),
            diagnostics = diagnostics.len(),
            "Aggregated observation cycle",
        );

        CycleOutput {
            changes,
            diagnostics,
        }
    }
}

/// The two terminal event kinds compete by recency when both were seen for
/// one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminal {
    Removed,
    Renamed,
}

/// Collapsed raw events for one identity.
#[derive(Debug, Default)]
struct PendingItem {
    created: bool,
    removed: bool,
    modified: bool,
    renamed: bool,
    last_terminal: Option<Terminal>,
}

impl PendingItem {
    fn record(&mut self, kind: RawEventKind) {
        match kind {
            RawEventKind::Created => self.created = true,
            RawEventKind::Modified => self.modified = true,
            RawEventKind::Removed => {
                self.removed = true;
                self.last_terminal = Some(Terminal::Removed);
            }
            RawEventKind::Renamed => {
                self.renamed = true;
                self.last_terminal = Some(Terminal::Renamed);
            }
        }
    }

    /// Dominance order: movement/deletion > modification > insertion.
    fn classify(&self) -> Classification {
        if self.removed && self.created {
            // The same identity vanished and reappeared within one cycle:
            // an atomic rename observed as a remove/create pair.
            Classification::Movement {
                explicit: self.renamed,
            }
        } else if self.removed && self.renamed {
            match self.last_terminal {
                Some(Terminal::Renamed) => Classification::Movement { explicit: true },
                _ => Classification::Deletion,
            }
        } else if self.renamed {
            Classification::Movement { explicit: true }
        } else if self.removed {
            Classification::Deletion
        } else if self.created {
            Classification::Insertion
        } else {
            Classification::Modification
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    Deletion,
    Insertion,
    Modification,
    Movement { explicit: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Delete { source: usize },
    Insert { destination: usize },
    Modify { destination: usize },
    Move { source: usize, destination: usize },
    /// Modified item that may also have changed position; settled by the
    /// rank comparison once all repositioning events are known.
    ModifyOrMove { source: usize, destination: usize },
}

fn classify_item(
    item: ItemId,
    state: &PendingItem,
    indices: &ListingIndices,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Action> {
    let (old_index, new_index) = indices.resolve(&item);

    match state.classify() {
        Classification::Movement { explicit } => match (old_index, new_index) {
            (Some(source), Some(destination)) if source == destination => {
                // Renamed or recreated without changing position: the row
                // content changed in place.
                Some(Action::Modify { destination })
            }
            (Some(source), Some(destination)) => Some(Action::Move {
                source,
                destination,
            }),
            (None, Some(destination)) => Some(Action::Insert { destination }),
            (Some(source), None) => Some(Action::Delete { source }),
            (None, None) => {
                // Created then removed within one cycle leaves no trace in
                // either listing; only the diagnostic survives.
                unresolved(
                    item,
                    if explicit {
                        RawEventKind::Renamed
                    } else {
                        RawEventKind::Removed
                    },
                    diagnostics,
                );
                None
            }
        },
        Classification::Deletion => match old_index {
            Some(source) => Some(Action::Delete { source }),
            None if new_index.is_none() => {
                unresolved(item, RawEventKind::Removed, diagnostics);
                None
            }
            None => {
                trace!(%item, "Dropping removal for item absent from old listing");
                None
            }
        },
        Classification::Insertion => match new_index {
            Some(destination) => Some(Action::Insert { destination }),
            None if old_index.is_none() => {
                unresolved(item, RawEventKind::Created, diagnostics);
                None
            }
            None => {
                trace!(%item, "Dropping creation for item absent from new listing");
                None
            }
        },
        Classification::Modification => match (old_index, new_index) {
            (Some(source), Some(destination)) if source == destination => {
                Some(Action::Modify { destination })
            }
            (Some(source), Some(destination)) => Some(Action::ModifyOrMove {
                source,
                destination,
            }),
            // Modified but only present in the new listing: the creation
            // event was missed, the terminal state is an insertion.
            (None, Some(destination)) => Some(Action::Insert { destination }),
            // Modified but gone from the new listing: the terminal state is
            // a removal.
            (Some(source), None) => Some(Action::Delete { source }),
            (None, None) => {
                unresolved(item, RawEventKind::Modified, diagnostics);
                None
            }
        },
    }
}

/// Rank of each common, non-repositioned item among its peers, in the order
/// of the given listing. Duplicate occurrences beyond the one the translator
/// kept are skipped.
fn common_ranks(
    listing: &[ItemId],
    indices: &ListingIndices,
    repositioned: &HashSet<ItemId>,
    old_side: bool,
) -> HashMap<ItemId, usize> {
    let mut ranks = HashMap::new();

    for (index, item) in listing.iter().enumerate() {
        let (kept, other_side) = if old_side {
            (indices.old_index(item), indices.new_index(item))
        } else {
            (indices.new_index(item), indices.old_index(item))
        };

        if kept == Some(index) && other_side.is_some() && !repositioned.contains(item) {
            let rank = ranks.len();
            ranks.insert(*item, rank);
        }
    }

    ranks
}

fn unresolved(item: ItemId, kind: RawEventKind, diagnostics: &mut Vec<Diagnostic>) {
    warn!(%item, ?kind, "Dropping event for identity absent from both listings");
    diagnostics.push(Diagnostic::UnresolvedIdentity { item, kind });
}

/// Indices handed to the builder come from the translator, so bounds
/// rejections are unreachable here; they are still drained without panicking.
fn apply(result: Result<()>, item: ItemId) {
    if let Err(e) = result {
        warn!(%item, %e, "Dropping change rejected by change set");
    }
}

/// Movement indices also come from the translator, one position per identity
/// and side, so the conflict branch is not reachable from
/// [`Aggregator::aggregate`]; it still drains to a diagnostic rather than
/// panicking.
fn apply_movement(
    builder: &mut ItemListChangesBuilder,
    item: ItemId,
    source: usize,
    destination: usize,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match builder.add_movement(source, destination) {
        Ok(()) => {}
        Err(ChangesError::ConflictingMovement {
            source,
            destination,
        }) => {
            warn!(%item, source, destination, "Dropping movement overlapping an earlier one");
            diagnostics.push(Diagnostic::ConflictingMovement {
                item,
                source,
                destination,
            });
        }
        Err(e) => {
            warn!(%item, %e, "Dropping movement rejected by change set");
        }
    }
}
