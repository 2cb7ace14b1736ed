//! Volley: a fixed-concurrency HTTP load generator.
//!
//! Give it a URL, a number of requests and a concurrency level: volley issues exactly that
//! many `GET`s through a fixed pool of workers, records what happened to each one and
//! folds everything into a [`RunSummary`] (status-code histogram, 200 count, transport
//! failures, total elapsed time).
//!
//! # Architecture
//!
//! The engine is built from small, replaceable pieces:
//!
//! - [`Scenario`]: the action executed once per request.
//! - [`Executor`]: runs the scenario. [`PoolExecutor`] feeds a finite queue of tickets to a
//!   fixed number of worker tasks.
//! - [`Metric`]: what one execution produces. [`RequestOutcome`] is either a status code or
//!   a failure cause, plus the elapsed time.
//! - [`Aggregate`]: folds metrics. Exactly one task owns it during a run, workers only
//!   talk to it through a channel.
//! - [`Report`]: derived, presentation-ready view of an aggregate.
//! - [`Reporter`]: sends a report somewhere (stdout as text or JSON).
//!
//! [`LoadTester`] wires them together for the HTTP case and is what the CLI calls.
//!
//! # Example
//!
//! ```rust,no_run
//! use volley::{Config, LoadTester, Reporter, SummaryReport, report::StdoutReporter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tester = LoadTester::new(Config::new("http://localhost:3000", 1_000, 50))?;
//!     let summary = tester.run().await?;
//!
//!     StdoutReporter.report(&SummaryReport::from(summary)).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Feature flags
//! - `internals`: expose the executor's building blocks (ticket queue, ticket source,
//!   workers, supervisor). Unstable.

/// Metric aggregators
pub mod aggregate;
/// Load run configuration
pub mod config;
pub mod error;
/// Orchestrators that define how things will actually run
pub mod executor;
/// The HTTP `GET` action
pub mod http;
/// Single metrics
pub mod metric;
/// Reports and Reporters
pub mod report;
/// The action description handed to executors
pub mod scenario;
mod tester;

pub use aggregate::{Aggregate, RunSummary};
pub use config::{Config, ConfigError};
pub use error::{Error, Result};
pub use executor::{Executor, PoolExecutor};
pub use metric::{Metric, OutcomeKind, RequestOutcome};
pub use report::{Report, Reporter, SummaryReport};
pub use scenario::Scenario;
pub use tester::LoadTester;

/// Procedural macros to reduce boilerplate
pub mod macros {
    pub use volley_macros::*;
}

// Paths emitted by the macros resolve through `::volley`, this crate included.
extern crate self as volley;

#[doc(hidden)]
pub use serde as __serde;
