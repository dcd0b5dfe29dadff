//! End-to-end aggregation scenarios through the public API.

use std::collections::BTreeSet;

use fs_changeset::{
    Aggregator, CycleOutput, Diagnostic, ItemId, ListingSide, Movement, RawEvent, RawEventKind,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

fn ids(n: usize) -> Vec<ItemId> {
    (0..n).map(|_| ItemId::new()).collect()
}

fn indices(set: &BTreeSet<usize>) -> Vec<usize> {
    set.iter().copied().collect()
}

/// Movement sources must be disjoint from deletions (old-listing space);
/// movement destinations must be disjoint from insertions and
/// modifications (new-listing space).
fn assert_disjoint(output: &CycleOutput) {
    let changes = &output.changes;

    for movement in changes.movements() {
        assert!(
            !changes.deletion_indices().contains(&movement.source),
            "movement source {} also recorded as deletion",
            movement.source
        );
        assert!(
            !changes.insertion_indices().contains(&movement.destination),
            "movement destination {} also recorded as insertion",
            movement.destination
        );
        assert!(
            !changes.modification_indices().contains(&movement.destination),
            "movement destination {} also recorded as modification",
            movement.destination
        );
    }

    assert!(changes
        .insertion_indices()
        .is_disjoint(changes.modification_indices()));
}

#[test]
fn position_swap_with_no_events_yields_two_movements() {
    init_tracing();
    let listing = ids(3);
    let (a, b, c) = (listing[0], listing[1], listing[2]);

    let output = Aggregator::aggregate(&[a, b, c], &[b, a, c], &[]);

    assert!(output.diagnostics.is_empty());
    assert!(output.changes.deletion_indices().is_empty());
    assert!(output.changes.insertion_indices().is_empty());
    assert!(output.changes.modification_indices().is_empty());
    assert_eq!(
        output.changes.movements(),
        &[
            Movement {
                source: 0,
                destination: 1
            },
            Movement {
                source: 1,
                destination: 0
            },
        ]
    );
    assert_disjoint(&output);
}

#[test]
fn distinct_remove_and_create_stay_separate() {
    init_tracing();
    let a = ItemId::new();
    let b = ItemId::new();
    let c = ItemId::new();

    let output = Aggregator::aggregate(
        &[a, b],
        &[a, c],
        &[RawEvent::removed(b), RawEvent::created(c)],
    );

    assert!(output.diagnostics.is_empty());
    assert_eq!(indices(output.changes.deletion_indices()), vec![1]);
    assert_eq!(indices(output.changes.insertion_indices()), vec![1]);
    assert!(output.changes.movements().is_empty());
    assert_disjoint(&output);
}

#[test]
fn in_place_modification_is_reported_at_its_new_index() {
    init_tracing();
    let a = ItemId::new();

    let output = Aggregator::aggregate(&[a], &[a], &[RawEvent::modified(a)]);

    assert!(output.diagnostics.is_empty());
    assert_eq!(indices(output.changes.modification_indices()), vec![0]);
    assert!(output.changes.deletion_indices().is_empty());
    assert!(output.changes.insertion_indices().is_empty());
    assert!(output.changes.movements().is_empty());
}

#[test]
fn remove_create_pair_sharing_identity_becomes_one_movement() {
    init_tracing();
    let listing = ids(3);
    let (a, b, c) = (listing[0], listing[1], listing[2]);

    // a was atomically renamed, observed by the notification layer as a
    // remove at index 0 plus a create at index 2
    let output = Aggregator::aggregate(
        &[a, b, c],
        &[b, c, a],
        &[
            RawEvent::removed(a).old_path("watched/a"),
            RawEvent::created(a).new_path("watched/zz-a"),
        ],
    );

    assert!(output.diagnostics.is_empty());
    assert!(output.changes.deletion_indices().is_empty());
    assert!(output.changes.insertion_indices().is_empty());
    assert_eq!(
        output.changes.movements(),
        &[Movement {
            source: 0,
            destination: 2
        }]
    );
    assert_disjoint(&output);
}

#[test]
fn explicit_rename_event_becomes_a_movement() {
    init_tracing();
    let listing = ids(3);
    let (a, b, c) = (listing[0], listing[1], listing[2]);

    let output = Aggregator::aggregate(
        &[a, b, c],
        &[b, c, a],
        &[RawEvent::renamed(a)
            .old_path("watched/a")
            .new_path("watched/zz-a")],
    );

    assert_eq!(
        output.changes.movements(),
        &[Movement {
            source: 0,
            destination: 2
        }]
    );
    assert!(output.changes.deletion_indices().is_empty());
    assert!(output.changes.insertion_indices().is_empty());
    assert_disjoint(&output);
}

#[test]
fn modification_with_position_change_is_reported_as_movement() {
    init_tracing();
    let listing = ids(3);
    let (a, b, c) = (listing[0], listing[1], listing[2]);

    // a changed content and sorted past b and c, with no explicit rename
    let output = Aggregator::aggregate(&[a, b, c], &[b, c, a], &[RawEvent::modified(a)]);

    assert!(output.changes.modification_indices().is_empty());
    assert_eq!(
        output.changes.movements(),
        &[Movement {
            source: 0,
            destination: 2
        }]
    );
    assert_disjoint(&output);
}

#[test]
fn insertion_shift_does_not_fabricate_movements() {
    init_tracing();
    let a = ItemId::new();
    let b = ItemId::new();
    let x = ItemId::new();

    // x lands at the front; a and b shift down without moving relative to
    // each other
    let output = Aggregator::aggregate(&[a, b], &[x, a, b], &[RawEvent::created(x)]);

    assert!(output.diagnostics.is_empty());
    assert_eq!(indices(output.changes.insertion_indices()), vec![0]);
    assert!(output.changes.movements().is_empty());
    assert!(output.changes.modification_indices().is_empty());
}

#[test]
fn deletion_shift_does_not_fabricate_movements() {
    init_tracing();
    let listing = ids(3);
    let (a, b, c) = (listing[0], listing[1], listing[2]);

    let output = Aggregator::aggregate(&[a, b, c], &[b, c], &[RawEvent::removed(a)]);

    assert_eq!(indices(output.changes.deletion_indices()), vec![0]);
    assert!(output.changes.movements().is_empty());
}

#[test]
fn unresolved_identity_is_dropped_with_a_diagnostic() {
    init_tracing();
    let a = ItemId::new();
    let stranger = ItemId::new();

    let output = Aggregator::aggregate(&[a], &[a], &[RawEvent::modified(stranger)]);

    assert!(output.changes.is_empty());
    assert_eq!(
        output.diagnostics,
        vec![Diagnostic::UnresolvedIdentity {
            item: stranger,
            kind: RawEventKind::Modified,
        }]
    );
}

#[test]
fn fully_unresolvable_cycle_yields_an_empty_change_set() {
    init_tracing();
    let strangers = ids(2);

    let output = Aggregator::aggregate(
        &[],
        &[],
        &[
            RawEvent::modified(strangers[0]),
            RawEvent::renamed(strangers[1]),
        ],
    );

    assert!(output.changes.is_empty());
    assert_eq!(output.diagnostics.len(), 2);
}

#[test]
fn duplicate_identity_in_listing_keeps_lowest_index() {
    init_tracing();
    let a = ItemId::new();
    let b = ItemId::new();

    let output = Aggregator::aggregate(&[a, a, b], &[a, b], &[RawEvent::removed(a)]);

    // the kept occurrence of a is index 0, and it is still present in the
    // new listing, so the removal resolves against index 0
    assert_eq!(indices(output.changes.deletion_indices()), vec![0]);
    assert_eq!(
        output.diagnostics,
        vec![Diagnostic::DuplicateIdentity {
            item: a,
            listing: ListingSide::Old,
            kept_index: 0,
            duplicate_index: 1,
        }]
    );
}

#[test]
fn duplicate_events_for_one_identity_do_not_duplicate_entries() {
    init_tracing();
    let a = ItemId::new();
    let b = ItemId::new();

    let output = Aggregator::aggregate(
        &[a, b],
        &[a],
        &[RawEvent::removed(b), RawEvent::removed(b), RawEvent::removed(b)],
    );

    assert_eq!(indices(output.changes.deletion_indices()), vec![1]);
    assert!(output.diagnostics.is_empty());
}

#[test]
fn mixed_cycle_produces_a_consistent_batch() {
    init_tracing();
    let listing = ids(5);
    let (a, b, c, d, e) = (listing[0], listing[1], listing[2], listing[3], listing[4]);
    let x = ItemId::new();

    // old: [a, b, c, d, e]
    // new: [x, a, c, e, d]  -- b removed, x inserted, c modified in place,
    //                          d and e swapped
    let output = Aggregator::aggregate(
        &[a, b, c, d, e],
        &[x, a, c, e, d],
        &[
            RawEvent::removed(b),
            RawEvent::created(x),
            RawEvent::modified(c),
        ],
    );

    assert!(output.diagnostics.is_empty());
    assert_eq!(indices(output.changes.deletion_indices()), vec![1]);
    assert_eq!(indices(output.changes.insertion_indices()), vec![0]);
    assert_eq!(indices(output.changes.modification_indices()), vec![2]);
    assert_eq!(
        output.changes.movements(),
        &[
            Movement {
                source: 3,
                destination: 4
            },
            Movement {
                source: 4,
                destination: 3
            },
        ]
    );
    assert_disjoint(&output);
}
