//! Collector: assembles gathered generations off the compute path.
//!
//! Workers post their bands here and move straight on to the next
//! generation. The collector places each band at its global offset and
//! forwards a generation to the engine driver as soon as its last band
//! arrives, so a slow sink never stalls the halo exchange.

use std::sync::Arc;

use acton_reactive::prelude::*;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, trace};

use crate::error::TransferError;
use crate::messages::{PartitionSnapshot, WorkerFault};
use crate::snapshot::{Gather, GenerationSnapshot};

/// Generations each rank has delivered to the collector, keyed by rank.
///
/// Shared with the engine driver so a timeout can name the lagging worker.
pub type WorkerProgress = Arc<DashMap<usize, u64>>;

/// What the collector reports to the engine driver.
#[derive(Debug, Clone)]
pub enum CollectorEvent {
    /// Every band of a generation has arrived.
    Gathered(GenerationSnapshot),
    /// A worker or band failed; the run cannot continue.
    Fault(TransferError),
}

/// Actor state for the collector.
#[derive(Default, Clone)]
pub struct CollectorState {
    /// Per-generation assembly buffers
    gather: Gather,
    /// Channel to the engine driver
    tx: Option<mpsc::Sender<CollectorEvent>>,
    /// Delivery count per rank
    progress: WorkerProgress,
    /// Generations released so far
    released: u64,
}

impl std::fmt::Debug for CollectorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorState")
            .field("in_flight", &self.gather.in_flight())
            .field("released", &self.released)
            .field("has_tx", &self.tx.is_some())
            .finish()
    }
}

/// Gathers bands from every worker into full-grid snapshots.
pub struct Collector {
    gather: Gather,
    tx: mpsc::Sender<CollectorEvent>,
    progress: WorkerProgress,
}

impl Collector {
    pub fn new(gather: Gather, tx: mpsc::Sender<CollectorEvent>, progress: WorkerProgress) -> Self {
        Self {
            gather,
            tx,
            progress,
        }
    }

    /// Spawn the collector in the given runtime.
    pub async fn spawn(self, runtime: &mut ActorRuntime) -> ActorHandle {
        let mut actor = runtime.new_actor_with_name::<CollectorState>("Collector".to_string());

        actor.model.gather = self.gather;
        actor.model.tx = Some(self.tx);
        actor.model.progress = self.progress;

        configure_collector(&mut actor);

        actor.start().await
    }
}

async fn forward(tx: Option<mpsc::Sender<CollectorEvent>>, event: CollectorEvent) {
    if let Some(tx) = tx {
        // Receiver gone means the driver already gave up on the run.
        let _ = tx.send(event).await;
    }
}

fn configure_collector(actor: &mut ManagedActor<Idle, CollectorState>) {
    actor.mutate_on::<PartitionSnapshot>(|actor, context| {
        let part = context.message().clone();
        let (rank, generation) = (part.rank, part.generation);
        let tx = actor.model.tx.clone();

        trace!(rank, generation, rows = part.rows, "Band received");
        actor.model.progress.insert(rank, generation + 1);

        match actor.model.gather.accept(part) {
            Ok(Some(snapshot)) => {
                actor.model.released += 1;
                debug!(
                    generation = snapshot.generation,
                    population = snapshot.grid.population(),
                    "Generation gathered"
                );
                Reply::pending(forward(tx, CollectorEvent::Gathered(snapshot)))
            }
            Ok(None) => Reply::ready(),
            Err(err) => {
                error!(rank, generation, error = %err, "Rejected band");
                Reply::pending(forward(tx, CollectorEvent::Fault(err)))
            }
        }
    });

    actor.mutate_on::<WorkerFault>(|actor, context| {
        let msg = context.message().clone();
        let tx = actor.model.tx.clone();
        error!(
            rank = msg.rank,
            generation = msg.generation,
            reason = %msg.reason,
            "Worker reported fault"
        );
        let event = CollectorEvent::Fault(TransferError::WorkerFault {
            rank: msg.rank,
            generation: msg.generation,
            reason: msg.reason,
        });
        Reply::pending(forward(tx, event))
    });
}
