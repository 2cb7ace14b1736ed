use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    fmt::{self, Debug, Display},
    future::Future,
    io::Write,
    time::Duration,
};

use crate::{
    Aggregate,
    aggregate::{RunSummary, percentage},
};

/// A [`Report`] represents the processed form of an [`Aggregate`].
///
/// Reports derive the human-facing numbers (ratios, percentages, truncated lists) from the
/// raw aggregate. They are pure data: building one twice from the same aggregate yields
/// the same report, and they hold no I/O.
///
/// See also: [`Reporter`].
pub trait Report<A>
where
    Self: Send + Sync + Debug + From<A> + Serialize + DeserializeOwned,
    A: Aggregate,
{
}

/// A [`Reporter`] consumes a [`Report`] and performs side effects: displaying it, writing
/// it to a file, sending it somewhere.
pub trait Reporter<A: Aggregate, R: Report<A>> {
    fn report(&self, report: &R) -> impl Future<Output = Result<(), Box<dyn std::error::Error>>>;
}

/// Number of transport failures listed one by one, the rest is only counted.
pub const SHOWN_ERRORS: usize = 5;

/// Share of the run that got a given status code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusLine {
    pub code: u16,
    pub count: usize,
    /// Percentage of all attempted requests.
    pub percentage: f64,
}

/// Presentation-ready view of a [`RunSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub total_duration: Duration,
    pub total_requests: usize,
    pub successful_requests: usize,
    /// Sorted by status code.
    pub status_codes: Vec<StatusLine>,
    pub error_count: usize,
    /// The first [`SHOWN_ERRORS`] failure causes, in arrival order.
    pub errors: Vec<String>,
    /// Failures not listed in `errors`.
    pub hidden_errors: usize,
    /// Percentage of attempted requests answered with 200.
    pub success_rate: f64,
}

impl From<RunSummary> for SummaryReport {
    fn from(value: RunSummary) -> Self {
        let total = value.total_requests;
        let status_codes = value
            .status_codes
            .iter()
            .map(|(&code, &count)| StatusLine {
                code,
                count,
                percentage: percentage(count, total),
            })
            .collect();
        let error_count = value.errors.len();

        Self {
            total_duration: value.total_duration,
            total_requests: total,
            successful_requests: value.successful_requests,
            status_codes,
            error_count,
            success_rate: value.success_rate(),
            hidden_errors: error_count.saturating_sub(SHOWN_ERRORS),
            errors: value.errors.into_iter().take(SHOWN_ERRORS).collect(),
        }
    }
}

impl Report<RunSummary> for SummaryReport {}

const RULE: &str = "========================================";

impl Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "           LOAD TEST REPORT")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Total time: {:?}", self.total_duration)?;
        writeln!(f, "Total requests: {}", self.total_requests)?;
        writeln!(f, "Requests with HTTP 200: {}", self.successful_requests)?;

        writeln!(f)?;
        writeln!(f, "HTTP status code distribution:")?;
        if self.status_codes.is_empty() && self.error_count > 0 {
            writeln!(f, "  No status code recorded (only errors)")?;
        }
        for line in &self.status_codes {
            writeln!(
                f,
                "  Status {}: {} requests ({:.2}%)",
                line.code, line.count, line.percentage
            )?;
        }

        if self.error_count > 0 {
            writeln!(f)?;
            writeln!(f, "Errors: {}", self.error_count)?;
            for cause in &self.errors {
                writeln!(f, "  - {cause}")?;
            }
            if self.hidden_errors > 0 {
                writeln!(f, "  ... and {} more errors", self.hidden_errors)?;
            }
        }

        if self.total_requests > 0 {
            writeln!(f)?;
            writeln!(f, "Success rate: {:.2}%", self.success_rate)?;
        }
        write!(f, "{RULE}")
    }
}

/// Prints the text report to stdout.
pub struct StdoutReporter;

impl Reporter<RunSummary, SummaryReport> for StdoutReporter {
    async fn report(&self, report: &SummaryReport) -> Result<(), Box<dyn std::error::Error>> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{report}")?;
        out.flush()?;
        Ok(())
    }
}

/// Prints the report as pretty JSON to stdout.
pub struct JsonReporter;

impl Reporter<RunSummary, SummaryReport> for JsonReporter {
    async fn report(&self, report: &SummaryReport) -> Result<(), Box<dyn std::error::Error>> {
        let value = serde_json::to_string_pretty(report)?;
        println!("{value}");
        Ok(())
    }
}
