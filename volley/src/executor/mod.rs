//! Executor: orchestration of a scenario's runtime execution
//!
//! The `Executor` trait is the runtime that executes a `Scenario`. Different executors can
//! provide different execution strategies; volley ships a fixed-size worker pool that runs
//! an exact number of requests, [`PoolExecutor`].
pub mod pool;
pub use pool::{PoolExecutor, Ticket};

use crate::{aggregate::Aggregate, error::Error, scenario::Scenario};
use std::future::Future;

/// The runtime hook that executes a `Scenario`.
///
/// An executor decides how many times the scenario's action runs, with how much
/// parallelism, and how the produced metrics reach the final aggregate.
pub trait Executor<A, F, Fut>
where
    Self: Send + Sync + Sized,
    A: Aggregate,
    F: Fn() -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send,
{
    /// Execute the scenario and return the final aggregate.
    fn exec(
        &self,
        scenario: &Scenario<A, F, Fut>,
    ) -> impl Future<Output = Result<A, Error>> + Send;
}
