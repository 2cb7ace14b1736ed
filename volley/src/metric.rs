use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{fmt::Debug, time::Duration};

use crate::macros::metric;

/// A `Metric` is a single observation produced by one execution of a scenario's action.
///
/// Metrics are the most granular piece of data in volley. Workers produce them, ship them
/// over the outcome channel and an [`crate::Aggregate`] folds them into a summary.
///
/// Metrics must be cheap to move between tasks (`Send`), comparable and serializable so
/// they can be inspected in tests or dumped for offline analysis.
///
/// ## Example
/// ```rust
/// use volley::macros::metric;
/// use std::time::Duration;
///
/// #[metric]
/// struct PingMetric {
///     rtt: Duration,
///     lost: bool,
/// }
/// ```
pub trait Metric
where
    Self: Serialize + DeserializeOwned + PartialOrd + PartialEq + Send + Sync + Debug + Clone,
{
}

/// What happened to a single request: either the server answered with a status code or the
/// request never got one.
#[derive(Serialize, Deserialize, PartialOrd, PartialEq, Eq, Debug, Clone)]
pub enum OutcomeKind {
    /// The server answered. Any status, including 4xx/5xx, lands here.
    Status(u16),
    /// Transport-level failure: refused connection, DNS, TLS, deadline exceeded...
    Failure(String),
}

/// Outcome of executing one ticket.
#[metric]
pub struct RequestOutcome {
    /// Time from the start of the execution until the response (or failure) was final.
    pub elapsed: Duration,
    pub kind: OutcomeKind,
}

impl RequestOutcome {
    pub fn status(code: u16, elapsed: Duration) -> Self {
        Self {
            elapsed,
            kind: OutcomeKind::Status(code),
        }
    }

    pub fn failure(cause: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            elapsed,
            kind: OutcomeKind::Failure(cause.into()),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self.kind {
            OutcomeKind::Status(code) => Some(code),
            OutcomeKind::Failure(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.kind, OutcomeKind::Failure(_))
    }
}
