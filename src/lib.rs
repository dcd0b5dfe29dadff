//! Change-set aggregation for directory observation.
//!
//! Folds the raw file-system events collected during one observation cycle
//! into a consistent, indexed diff between two listing snapshots: which
//! positions were deleted, inserted or modified in place, and which items
//! moved. Consumers apply the finished [`ItemListChanges`] as one batched
//! update to their own presentation of the listing, animated or not.
//!
//! The OS notification mechanism, path-to-identity resolution and the
//! listing snapshot cache are external collaborators: input arrives here
//! already tagged with stable [`ItemId`] tokens, either as a plain batch
//! handed to [`Aggregator::aggregate`] or streamed through a
//! [`ChangeObserver`].

mod aggregator;
mod changes;
mod error;
mod event;
mod observer;
mod translator;

pub use aggregator::{Aggregator, CycleOutput};
pub use changes::{ItemListChanges, Movement};
pub use error::{ChangesError, Diagnostic, ListingSide};
pub use event::{ItemId, RawEvent, RawEventKind};
pub use observer::{ChangeObserver, ObservedCycle, ObserverError};
