//! The `PoolExecutor` and its components: a fixed number of workers draining a finite
//! queue of tickets.
//!
//! # High-level flow
//! 1. A bounded ticket queue and a bounded outcome channel are created.
//! 2. The aggregator task is spawned. It is the only owner of the aggregate and folds
//!    outcomes as they arrive.
//! 3. `workers` worker tasks are spawned. Each one repeatedly:
//!    - takes the next ticket from the shared queue, stopping once the queue is closed
//!      and empty,
//!    - runs the scenario's `action()` once,
//!    - sends the produced metric to the aggregator.
//! 4. The ticket source pushes exactly `requests` tickets and then drops its sender, which
//!    every worker observes as exhaustion.
//! 5. A supervisor joins every worker and only then drops the last outcome sender, closing
//!    the aggregator's input. The aggregator returns once it drained the channel.
//!
//! Since the worker count is fixed, the number of in-flight actions never exceeds
//! `workers` whatever the size of `requests`. A pool larger than `requests` is cut down to
//! one worker per ticket, the extra workers could never get one.
//!
//! # Tuning knobs
//! - `workers` (usize): number of concurrent worker tasks, at most `requests`.
//! - `queue_capacity` (usize): tickets buffered ahead of the workers. Defaults to the
//!   worker count, capped at 4096. The source suspends while the queue is full.
use tokio::{sync::mpsc, task::JoinHandle};
use typed_builder::TypedBuilder;

use super::Executor;
use crate::{
    aggregate::{Aggregate, aggregator_task},
    error::Error,
    scenario::Scenario,
};
use internals::*;

use futures::future::join_all;
use std::{future::Future, sync::Arc};

/// A unit of work: "issue one request". Only carries its position in the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(usize);

impl Ticket {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Executor running the scenario's action exactly `requests` times over `workers`
/// concurrent tasks.
///
/// - The ticket queue is the only thing workers share for dispatch.
/// - Metrics travel over a single-consumer channel, so the aggregate is mutated by one
///   task and needs no lock.
/// - A failing action is the action's business: whatever metric it returns is folded.
///   A panicking worker is logged and the run carries on with the remaining workers.
#[derive(TypedBuilder, Debug, Clone)]
pub struct PoolExecutor {
    /// Total number of times the action runs.
    pub requests: usize,
    /// The number of concurrent worker tasks to spawn.
    pub workers: usize,
    /// Tickets buffered ahead of the workers, the worker count when unset.
    #[builder(default, setter(strip_option))]
    pub queue_capacity: Option<usize>,
}

/// Upper bound on anything buffered between tasks, whatever the pool size.
const MAX_BUFFERED: usize = 4096;

impl PoolExecutor {
    /// Workers actually spawned: no more than there are tickets, and at least one.
    pub fn effective_workers(&self) -> usize {
        self.workers.min(self.requests).max(1)
    }

    fn ticket_capacity(&self) -> usize {
        self.queue_capacity
            .unwrap_or_else(|| self.effective_workers())
            .clamp(1, MAX_BUFFERED)
    }

    // Enough room for every worker to report a few outcomes without waiting on the fold
    fn outcome_capacity(&self) -> usize {
        self.effective_workers()
            .saturating_mul(10)
            .clamp(1, MAX_BUFFERED)
    }
}

impl<A, F, Fut> Executor<A, F, Fut> for PoolExecutor
where
    Self: Send + Sync + Sized,
    A: Aggregate + 'static,
    A::Metric: 'static,
    F: Fn() -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send + 'static,
{
    async fn exec(&self, scenario: &Scenario<A, F, Fut>) -> Result<A, Error> {
        let (ticket_tx, ticket_rx) = mpsc::channel(self.ticket_capacity());
        let (outcome_tx, outcome_rx) = mpsc::channel(self.outcome_capacity());

        tracing::info!("Spawning aggregator...");
        let aggregator = tokio::spawn(aggregator_task::<A>(outcome_rx, self.outcome_capacity()));

        let workers = self.effective_workers();
        if workers < self.workers {
            tracing::debug!("Only {workers} of {} workers can get a ticket", self.workers);
        }

        tracing::info!("Spawning {workers} workers...");
        let handles = spawn_workers(
            TicketQueue::new(ticket_rx),
            &outcome_tx,
            workers,
            scenario.action.clone(),
        );

        tracing::info!("Running scenario: {}!", scenario.name);
        let source = tokio::spawn(ticket_source_task(ticket_tx, self.requests));
        let supervisor = tokio::spawn(supervisor_task(handles, outcome_tx));

        let issued = source.await?;
        let executed = supervisor.await?;
        tracing::info!("Workers drained after {executed}/{issued} tickets, collecting results...");

        let agg = aggregator.await?;
        tracing::info!("Done running scenario: {}!", scenario.name);
        Ok(agg)
    }
}

#[cfg(feature = "internals")]
pub use internals::*;

/// Internal components for the `PoolExecutor`.
/// Encapsulated in a module to allow conditional exposure via `#[cfg(feature = "internals")]`.
mod internals {
    use super::*;
    use tokio::sync::Mutex;

    /// Receiving end of the ticket queue, shared by every worker.
    ///
    /// Closing is a broadcast: once the source dropped its sender and the buffered tickets
    /// are gone, every call to [`TicketQueue::next`] returns `None`.
    #[derive(Clone)]
    pub struct TicketQueue {
        rx: Arc<Mutex<mpsc::Receiver<Ticket>>>,
    }

    impl TicketQueue {
        pub fn new(rx: mpsc::Receiver<Ticket>) -> Self {
            Self {
                rx: Arc::new(Mutex::new(rx)),
            }
        }

        /// Next ticket, or `None` once the queue is exhausted.
        pub async fn next(&self) -> Option<Ticket> {
            self.rx.lock().await.recv().await
        }
    }

    /// Pushes `count` tickets into the queue, then closes it by dropping the sender.
    ///
    /// Returns the number of tickets actually handed out, which is lower than `count` only
    /// if every worker went away early.
    pub async fn ticket_source_task(tx: mpsc::Sender<Ticket>, count: usize) -> usize {
        for index in 0..count {
            if tx.send(Ticket(index)).await.is_err() {
                tracing::warn!("No worker left, ticket source stopping at {index}/{count}");
                return index;
            }
        }
        tracing::debug!("Ticket source exhausted after {count} tickets.");
        count
    }

    /// Spawns `workers` Tokio tasks, each one executing the `action` once per ticket.
    ///
    /// Every worker owns a clone of `outcomes`; a worker returns the number of tickets it
    /// executed.
    pub fn spawn_workers<M, F, Fut>(
        queue: TicketQueue,
        outcomes: &mpsc::Sender<M>,
        workers: usize,
        action: F,
    ) -> Vec<JoinHandle<usize>>
    where
        M: Send + 'static,
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = M> + Send + 'static,
    {
        (0..workers)
            .map(|i| {
                let queue = queue.clone();
                let outcomes = outcomes.clone();
                let action = action.clone();
                tokio::spawn(async move {
                    tracing::debug!("Worker {i} started.");
                    let mut executed = 0;

                    while let Some(ticket) = queue.next().await {
                        let metric = action().await;
                        executed += 1;
                        tracing::trace!("Worker {i} finished ticket {}.", ticket.index());

                        if outcomes.send(metric).await.is_err() {
                            tracing::warn!("Worker {i} lost the outcome channel, stopping.");
                            break;
                        }
                    }

                    tracing::debug!("Worker {i} shutting down after {executed} tickets.");
                    executed
                })
            })
            .collect()
    }

    /// Waits for every worker to stop, then closes the outcome stream.
    ///
    /// `outcome_tx` is the last sender alive once the workers are gone: dropping it is what
    /// lets the aggregator terminate. Returns the number of tickets executed.
    pub async fn supervisor_task<M>(
        handles: Vec<JoinHandle<usize>>,
        outcome_tx: mpsc::Sender<M>,
    ) -> usize {
        let executed = join_all(handles)
            .await
            .into_iter()
            .map(|res| match res {
                Ok(n) => n,
                Err(e) => {
                    // the ticket this worker held is lost, the others are unaffected
                    tracing::error!("Worker panicked with error: {e}");
                    0
                }
            })
            .sum();

        drop(outcome_tx);
        executed
    }
}
