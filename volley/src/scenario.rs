use std::{future::Future, marker::PhantomData};

use typed_builder::TypedBuilder;

use crate::aggregate::Aggregate;

/// What gets executed once per ticket.
///
/// A scenario only describes the work. How many times it runs and with how much parallelism
/// is decided by the [`crate::Executor`] it is handed to.
///
/// The action is cloned into every worker, so heavy resources (HTTP clients, connection
/// pools) should be created once outside of it and captured by cheap handles.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Scenario<A, F, Fut>
where
    A: Aggregate,
    F: Fn() -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send,
{
    #[builder(setter(into))]
    pub name: String,
    pub action: F,
    #[builder(default, setter(skip))]
    marker: PhantomData<fn() -> (A, Fut)>,
}
