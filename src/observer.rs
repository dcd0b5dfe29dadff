//! Cycle delivery loop.
//!
//! The monitoring collaborator delivers one [`ObservedCycle`] per
//! observation interval; a background task aggregates cycles strictly one
//! at a time and publishes each finalized [`CycleOutput`] on an outbound
//! channel. No two cycles are ever interleaved into the same change set.

use std::pin::pin;

use async_channel as chan;
use futures::StreamExt;
use futures_concurrency::stream::Merge;
use thiserror::Error;
use tokio::{spawn, task::JoinHandle};
use tracing::{debug, error, trace};

use crate::aggregator::{Aggregator, CycleOutput};
use crate::event::{ItemId, RawEvent};

/// One observation cycle's input: the two listing snapshots and the raw
/// events collected between them.
#[derive(Debug, Clone)]
pub struct ObservedCycle {
    pub old_listing: Vec<ItemId>,
    pub new_listing: Vec<ItemId>,
    pub events: Vec<RawEvent>,
}

#[derive(Error, Debug)]
pub enum ObserverError {
    #[error("change observer is no longer running")]
    Stopped,
}

/// Handle to a running cycle-processing task.
#[derive(Debug)]
pub struct ChangeObserver {
    cycles_tx: chan::Sender<ObservedCycle>,
    stop_tx: chan::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl ChangeObserver {
    /// Spawn the processing task and return the handle plus the channel on
    /// which finalized change sets are published.
    pub fn new() -> (Self, chan::Receiver<CycleOutput>) {
        let (cycles_tx, cycles_rx) = chan::unbounded();
        let (output_tx, output_rx) = chan::unbounded();
        let (stop_tx, stop_rx) = chan::bounded(1);

        let handle = spawn(async move {
            while let Err(e) = spawn(run_cycle_loop(
                cycles_rx.clone(),
                output_tx.clone(),
                stop_rx.clone(),
            ))
            .await
            {
                if e.is_panic() {
                    error!(?e, "Cycle processing task panicked, restarting;");
                } else {
                    trace!("Change observer received shutdown signal and will exit...");
                    break;
                }
            }

            debug!("Change observer gracefully shutdown");
        });

        (
            Self {
                cycles_tx,
                stop_tx,
                handle: Some(handle),
            },
            output_rx,
        )
    }

    /// Enqueue one cycle for aggregation. Cycles are processed in delivery
    /// order.
    pub async fn deliver(&self, cycle: ObservedCycle) -> Result<(), ObserverError> {
        self.cycles_tx
            .send(cycle)
            .await
            .map_err(|_| ObserverError::Stopped)
    }
}

impl Drop for ChangeObserver {
    fn drop(&mut self) {
        // FIXME: change this Drop to async drop in the future
        if let Some(handle) = self.handle.take() {
            let stop_tx = self.stop_tx.clone();
            spawn(async move {
                if stop_tx.send(()).await.is_err() {
                    trace!("Change observer already stopped");
                }

                if let Err(e) = handle.await {
                    error!(?e, "Failed to join cycle processing task;");
                }
            });
        }
    }
}

async fn run_cycle_loop(
    cycles_rx: chan::Receiver<ObservedCycle>,
    output_tx: chan::Sender<CycleOutput>,
    stop_rx: chan::Receiver<()>,
) {
    enum StreamMessage {
        NewCycle(ObservedCycle),
        Stop,
    }

    let mut msg_stream = pin!((
        cycles_rx.map(StreamMessage::NewCycle),
        stop_rx.map(|()| StreamMessage::Stop),
    )
        .merge());

    while let Some(msg) = msg_stream.next().await {
        match msg {
            StreamMessage::NewCycle(cycle) => {
                trace!(
                    old_len = cycle.old_listing.len(),
                    new_len = cycle.new_listing.len(),
                    events = cycle.events.len(),
                    "Received observation cycle",
                );

                let output = Aggregator::aggregate(
                    &cycle.old_listing,
                    &cycle.new_listing,
                    &cycle.events,
                );

                if output_tx.send(output).await.is_err() {
                    error!("Tried to publish a change set to a closed channel;");
                    break;
                }
            }

            StreamMessage::Stop => {
                debug!("Stopping change observer cycle loop");
                break;
            }
        }
    }
}
