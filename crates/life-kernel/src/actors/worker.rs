//! WorkerActor: exclusive owner of one row band.
//!
//! Per generation `g` the worker:
//! 1. waits until both ghost rows for `g` are buffered (the halo barrier),
//! 2. installs them and sends its authoritative rows for `g` to the collector,
//! 3. computes `g + 1` into the spare buffer and swaps,
//! 4. posts its new boundary rows to its neighbours.
//!
//! Sends never wait on the receiver, so two adjacent workers can never
//! deadlock on each other. Mailbox serialization guarantees the band is only
//! touched by one handler at a time.

use acton_reactive::prelude::*;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, error, trace};

use crate::error::TransferError;
use crate::halo::{HaloBuffer, install, outbound_rows};
use crate::messages::{BeginRun, ConnectWorker, HaloRow, PartitionSnapshot, WorkerFault};
use crate::partition::{LocalPartition, WorkerContext};
use crate::transition::Transition;

/// A message this worker owes another actor.
enum Post {
    Halo(ActorHandle, HaloRow),
    Snapshot(ActorHandle, PartitionSnapshot),
    Fault(ActorHandle, WorkerFault),
}

impl Post {
    async fn deliver(self) {
        match self {
            Post::Halo(to, row) => to.send(row).await,
            Post::Snapshot(to, part) => to.send(part).await,
            Post::Fault(to, fault) => to.send(fault).await,
        }
    }
}

/// Run a CPU-bound step. On the multi-thread runtime other tasks queued on
/// this thread move elsewhere for the duration; on a current-thread runtime
/// the step runs inline, since `block_in_place` would panic there.
fn run_blocking<F: FnOnce()>(step: F) {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(step)
        }
        _ => step(),
    }
}

async fn deliver_all(posts: Vec<Post>) {
    for post in posts {
        post.deliver().await;
    }
}

/// Actor state for one worker.
#[derive(Default, Clone)]
pub struct WorkerActorState {
    /// Rank and world size
    ctx: Option<WorkerContext>,
    /// The band, its ghost rows and the spare buffer
    local: LocalPartition,
    /// Threshold rule bound to the neighbourhood counter
    transition: Option<Transition>,
    /// Step interior rows on the rayon pool
    parallel: bool,
    /// Halo rows received but not yet installed
    halo: HaloBuffer,
    /// Generation currently held in `local.current()`
    generation: u64,
    /// Generations to compute; zero until `BeginRun`
    iterations: u64,
    north: Option<ActorHandle>,
    south: Option<ActorHandle>,
    collector: Option<ActorHandle>,
    /// Set after a protocol error; the worker ignores further traffic
    faulted: bool,
}

impl std::fmt::Debug for WorkerActorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerActorState")
            .field("ctx", &self.ctx)
            .field("band", &self.local.band())
            .field("generation", &self.generation)
            .field("iterations", &self.iterations)
            .field("pending_halo", &self.halo.pending_generations())
            .field("faulted", &self.faulted)
            .finish()
    }
}

impl WorkerActorState {
    fn handle_for(&self, rank: usize) -> Option<ActorHandle> {
        let ctx = self.ctx?;
        if ctx.north() == Some(rank) {
            self.north.clone()
        } else if ctx.south() == Some(rank) {
            self.south.clone()
        } else {
            None
        }
    }

    /// Boundary rows for the generation now in `current`.
    fn post_boundary_rows(&self, posts: &mut Vec<Post>) -> Result<(), TransferError> {
        let Some(ctx) = self.ctx else {
            return Ok(());
        };
        for out in outbound_rows(&self.local, ctx, self.generation) {
            let Some(to) = self.handle_for(out.to_rank) else {
                return Err(TransferError::WorkerFault {
                    rank: ctx.rank,
                    generation: self.generation,
                    reason: format!("no connection to neighbour rank {}", out.to_rank),
                });
            };
            trace!(
                rank = ctx.rank,
                to = out.to_rank,
                generation = self.generation,
                slot = %out.row.slot,
                "Posting halo row"
            );
            posts.push(Post::Halo(to, out.row));
        }
        Ok(())
    }

    /// Run every generation whose ghost rows are complete.
    fn advance(&mut self, posts: &mut Vec<Post>) -> Result<(), TransferError> {
        let (Some(ctx), Some(transition)) = (self.ctx, self.transition) else {
            return Ok(());
        };
        let Some(collector) = self.collector.clone() else {
            return Ok(());
        };

        while self.generation < self.iterations {
            let Some(ghosts) = self.halo.take_ready(ctx, self.generation) else {
                break;
            };
            install(&mut self.local, ghosts);

            let band = self.local.band();
            posts.push(Post::Snapshot(
                collector.clone(),
                PartitionSnapshot {
                    generation: self.generation,
                    rank: ctx.rank,
                    row_start: band.row_start,
                    rows: band.rows(),
                    cells: self.local.own_rows().to_vec(),
                },
            ));

            let parallel = self.parallel;
            let (current, next) = self.local.buffers();
            run_blocking(|| {
                if parallel {
                    transition.step_parallel(current, next);
                } else {
                    transition.step(current, next);
                }
            });
            self.local.swap();
            self.generation += 1;

            debug!(rank = ctx.rank, generation = self.generation, "Band stepped");

            if self.generation < self.iterations {
                self.post_boundary_rows(posts)?;
            }
        }
        Ok(())
    }

    /// Convert a protocol error into a fault report and stop the worker.
    fn fault(&mut self, err: TransferError, posts: &mut Vec<Post>) {
        let rank = self.ctx.map(|c| c.rank).unwrap_or_default();
        error!(rank, generation = self.generation, error = %err, "Worker fault");
        self.faulted = true;
        if let Some(collector) = self.collector.clone() {
            posts.push(Post::Fault(
                collector,
                WorkerFault {
                    rank,
                    generation: self.generation,
                    reason: err.to_string(),
                },
            ));
        }
    }
}

/// Actor owning one row band of the grid.
///
/// Handles:
/// - `ConnectWorker` - store neighbour and collector handles
/// - `BeginRun` - post generation 0 boundary rows and start stepping
/// - `HaloRow` - buffer a neighbour's row and step when the barrier clears
pub struct WorkerActor {
    pub ctx: WorkerContext,
    pub local: LocalPartition,
    pub transition: Transition,
    pub parallel: bool,
}

impl WorkerActor {
    /// Create a worker. Partitions with at least `parallel_threshold` cells
    /// step on the rayon pool.
    pub fn new(
        ctx: WorkerContext,
        local: LocalPartition,
        transition: Transition,
        parallel_threshold: usize,
    ) -> Self {
        let parallel = local.cell_count() >= parallel_threshold;
        Self {
            ctx,
            local,
            transition,
            parallel,
        }
    }

    /// Spawn this worker in the given runtime.
    pub async fn spawn(self, runtime: &mut ActorRuntime) -> ActorHandle {
        let mut actor =
            runtime.new_actor_with_name::<WorkerActorState>(format!("Worker:{}", self.ctx.rank));

        actor.model.ctx = Some(self.ctx);
        actor.model.local = self.local;
        actor.model.transition = Some(self.transition);
        actor.model.parallel = self.parallel;

        configure_worker(&mut actor);

        actor.start().await
    }
}

/// Configure message handlers for the WorkerActor.
fn configure_worker(actor: &mut ManagedActor<Idle, WorkerActorState>) {
    actor.mutate_on::<ConnectWorker>(|actor, context| {
        let msg = context.message().clone();
        actor.model.north = msg.north;
        actor.model.south = msg.south;
        actor.model.collector = Some(msg.collector);
        Reply::ready()
    });

    actor.mutate_on::<BeginRun>(|actor, context| {
        let iterations = context.message().iterations;
        let state = &mut actor.model;
        if state.faulted {
            return Reply::ready();
        }
        state.iterations = iterations;
        debug!(ctx = ?state.ctx, iterations, parallel = state.parallel, "Worker starting");

        let mut posts = Vec::new();
        let result = state
            .post_boundary_rows(&mut posts)
            .and_then(|()| state.advance(&mut posts));
        if let Err(err) = result {
            state.fault(err, &mut posts);
        }

        Reply::pending(deliver_all(posts))
    });

    actor.mutate_on::<HaloRow>(|actor, context| {
        let row = context.message().clone();
        let state = &mut actor.model;
        if state.faulted {
            return Reply::ready();
        }
        let Some(ctx) = state.ctx else {
            return Reply::ready();
        };

        trace!(
            rank = ctx.rank,
            from = row.from_rank,
            generation = row.generation,
            slot = %row.slot,
            "Halo row received"
        );

        let mut posts = Vec::new();
        let width = state.local.width();
        let result = state
            .halo
            .accept(ctx, width, state.generation, row)
            .and_then(|()| state.advance(&mut posts));
        if let Err(err) = result {
            state.fault(err, &mut posts);
        }

        Reply::pending(deliver_all(posts))
    });
}
