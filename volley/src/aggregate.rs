use crate::Metric;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;
use tokio::sync::mpsc;

/// The `Aggregate` trait defines how raw [`Metric`] values are folded into a summary.
///
/// An aggregate is owned by exactly one task during a run: workers never touch it, they only
/// send metrics over a channel and [`aggregator_task`] folds them in. Because of that,
/// implementations need no interior locking.
///
/// Aggregates keep raw, cheap-to-update data (counts, histograms, lists). Derived values such
/// as ratios belong in a [`crate::Report`].
///
/// # Example
/// ```rust
/// use volley::{Aggregate, macros::*};
///
/// #[metric]
/// struct Bytes(u64);
///
/// #[aggregate]
/// struct Transferred {
///     count: u64,
///     total: u128,
/// }
///
/// impl Aggregate for Transferred {
///     type Metric = Bytes;
///
///     fn new() -> Self {
///         Self { count: 0, total: 0 }
///     }
///
///     fn consume(&mut self, metric: &Self::Metric) {
///         self.count += 1;
///         self.total += metric.0 as u128;
///     }
/// }
/// ```
pub trait Aggregate
where
    Self: Serialize + DeserializeOwned + PartialOrd + PartialEq + Send + Sync + Debug + Clone,
{
    /// The metric type this aggregate summarizes.
    type Metric: Metric;

    /// Create a new, empty instance of the aggregate.
    fn new() -> Self;

    /// Aggregate multiple metrics into the current instance.
    ///
    /// This default implementation calls [`Aggregate::consume`] for each metric.
    fn aggregate(&mut self, metrics: &[Self::Metric]) {
        metrics.iter().for_each(|m| self.consume(m));
    }

    /// Incorporate a single metric into the aggregate.
    fn consume(&mut self, metric: &Self::Metric);
}

/// Folds every metric received on `rx` into a fresh aggregate.
///
/// Returns once every sender has been dropped and the channel is drained, so the caller
/// controls termination by controlling the senders.
pub async fn aggregator_task<A: Aggregate>(
    mut rx: mpsc::Receiver<A::Metric>,
    batch_size: usize,
) -> A {
    let mut agg = A::new();
    let mut batch = Vec::new();

    // Wait for the first metric, the channel only yields None once closed and empty
    while let Some(metric) = rx.recv().await {
        batch.push(metric);

        // Take whatever else is already buffered without waiting
        while batch.len() < batch_size {
            match rx.try_recv() {
                Ok(metric) => batch.push(metric),
                Err(_) => break,
            }
        }

        tracing::trace!("Folding batch of {} outcomes", batch.len());
        agg.aggregate(&batch);
        batch.clear();
    }
    agg
}

/// `part` as a percentage of `total`, `0.0` when there is nothing to divide.
pub(crate) fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

pub use builtins::*;

mod builtins {
    use std::{collections::BTreeMap, time::Duration};

    use super::*;
    use crate::{
        macros::aggregate,
        metric::{OutcomeKind, RequestOutcome},
    };

    /// Status code counted as a successful request.
    pub const SUCCESS_STATUS: u16 = 200;

    /// Cause recorded for a ticket whose worker died before reporting an outcome.
    pub const LOST_REQUEST: &str = "request lost: worker stopped before reporting an outcome";

    /// The accumulated result of a load run.
    ///
    /// Keeps the three-way split between requests answered with 200, requests answered with
    /// any other status and requests that never got an answer.
    #[aggregate]
    #[derive(Default)]
    pub struct RunSummary {
        /// Number of requests attempted, one per folded outcome until the run is settled.
        pub total_requests: usize,
        /// Wall-clock time of the whole run, stamped once every outcome is folded.
        pub total_duration: Duration,
        /// Requests answered with HTTP 200.
        pub successful_requests: usize,
        /// HTTP status code -> number of responses carrying it.
        pub status_codes: BTreeMap<u16, usize>,
        /// Transport failure causes, in arrival order.
        pub errors: Vec<String>,
    }

    impl RunSummary {
        pub fn status_count(&self, code: u16) -> usize {
            self.status_codes.get(&code).copied().unwrap_or(0)
        }

        /// Number of requests that got any HTTP answer.
        pub fn answered_requests(&self) -> usize {
            self.status_codes.values().sum()
        }

        pub fn failed_requests(&self) -> usize {
            self.errors.len()
        }

        /// Settles the summary against the number of requests the run issued.
        ///
        /// Tickets that never produced an outcome are recorded as failures, so every
        /// attempted request lands either in the histogram or in `errors`.
        pub fn settle(&mut self, attempted: usize) {
            let lost = attempted.saturating_sub(self.total_requests);
            if lost > 0 {
                tracing::warn!("{lost} requests produced no outcome");
                self.errors
                    .extend(std::iter::repeat(LOST_REQUEST.to_string()).take(lost));
                self.total_requests = attempted;
            }
        }

        /// Percentage of attempted requests answered with 200, `0.0` for an empty run.
        pub fn success_rate(&self) -> f64 {
            percentage(self.successful_requests, self.total_requests)
        }
    }

    impl Aggregate for RunSummary {
        type Metric = RequestOutcome;

        fn new() -> Self {
            RunSummary::default()
        }

        fn consume(&mut self, metric: &Self::Metric) {
            self.total_requests += 1;
            match &metric.kind {
                OutcomeKind::Failure(cause) => self.errors.push(cause.clone()),
                OutcomeKind::Status(code) => {
                    *self.status_codes.entry(*code).or_default() += 1;
                    if *code == SUCCESS_STATUS {
                        self.successful_requests += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::metric::RequestOutcome;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn consume_keeps_success_status_and_failure_apart() {
        let mut summary = RunSummary::new();
        summary.aggregate(&[
            RequestOutcome::status(200, ms(1)),
            RequestOutcome::status(404, ms(2)),
            RequestOutcome::failure("connection refused", ms(3)),
            RequestOutcome::status(200, ms(4)),
            RequestOutcome::status(500, ms(5)),
        ]);

        assert_eq!(summary.total_requests, 5);
        assert_eq!(summary.successful_requests, 2);
        assert_eq!(summary.status_count(200), 2);
        assert_eq!(summary.status_count(404), 1);
        assert_eq!(summary.status_count(500), 1);
        assert_eq!(summary.errors, vec!["connection refused".to_string()]);
        assert_eq!(
            summary.answered_requests() + summary.failed_requests(),
            summary.total_requests
        );
    }

    #[test]
    fn errors_keep_arrival_order() {
        let mut summary = RunSummary::new();
        for cause in ["first", "second", "third"] {
            summary.consume(&RequestOutcome::failure(cause, ms(1)));
        }

        assert_eq!(summary.errors, vec!["first", "second", "third"]);
        assert!(summary.status_codes.is_empty());
        assert_eq!(summary.successful_requests, 0);
    }

    #[test]
    fn success_rate_of_empty_summary_is_zero() {
        assert_eq!(RunSummary::new().success_rate(), 0.0);
    }

    #[test]
    fn success_rate_is_a_percentage_of_attempts() {
        let mut summary = RunSummary::new();
        summary.aggregate(&[
            RequestOutcome::status(200, ms(1)),
            RequestOutcome::status(503, ms(1)),
            RequestOutcome::failure("timed out", ms(1)),
            RequestOutcome::status(200, ms(1)),
        ]);

        assert_eq!(summary.success_rate(), 50.0);
    }

    #[tokio::test]
    async fn aggregator_task_folds_until_every_sender_is_gone() {
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(aggregator_task::<RunSummary>(rx, 3));

        let senders: Vec<_> = (0..3).map(|_| tx.clone()).collect();
        drop(tx);
        for (i, sender) in senders.into_iter().enumerate() {
            tokio::spawn(async move {
                for _ in 0..5 {
                    let outcome = if i == 0 {
                        RequestOutcome::failure("boom", ms(1))
                    } else {
                        RequestOutcome::status(200, ms(1))
                    };
                    sender.send(outcome).await.unwrap();
                }
            });
        }

        let summary = handle.await.unwrap();
        assert_eq!(summary.total_requests, 15);
        assert_eq!(summary.successful_requests, 10);
        assert_eq!(summary.errors.len(), 5);
    }

    #[test]
    fn settle_counts_missing_outcomes_as_failures() {
        let mut summary = RunSummary::new();
        summary.aggregate(&[
            RequestOutcome::status(200, ms(1)),
            RequestOutcome::failure("connection refused", ms(1)),
        ]);
        summary.settle(5);

        assert_eq!(summary.total_requests, 5);
        assert_eq!(summary.failed_requests(), 4);
        assert_eq!(summary.errors[0], "connection refused");
        assert!(summary.errors[1..].iter().all(|e| e == LOST_REQUEST));
        assert_eq!(
            summary.answered_requests() + summary.failed_requests(),
            summary.total_requests
        );
        assert_eq!(summary.success_rate(), 20.0);
    }

    #[test]
    fn settle_leaves_a_complete_run_alone() {
        let mut summary = RunSummary::new();
        summary.aggregate(&[
            RequestOutcome::status(200, ms(1)),
            RequestOutcome::status(404, ms(1)),
        ]);
        let before = summary.clone();
        summary.settle(2);

        assert_eq!(summary, before);
    }

    #[tokio::test]
    async fn aggregator_task_grows_its_batch_on_demand() {
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(aggregator_task::<RunSummary>(rx, usize::MAX));

        for _ in 0..8 {
            tx.send(RequestOutcome::status(200, ms(1))).await.unwrap();
        }
        drop(tx);

        let summary = handle.await.unwrap();
        assert_eq!(summary.total_requests, 8);
        assert_eq!(summary.successful_requests, 8);
    }
}
