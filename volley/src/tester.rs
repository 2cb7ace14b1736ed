use std::{sync::Arc, time::Duration};

use reqwest::Client;
use tokio::time::Instant;

use crate::{
    aggregate::RunSummary,
    config::Config,
    error::Result,
    executor::{Executor, PoolExecutor},
    http::{HttpAction, REQUEST_TIMEOUT},
    scenario::Scenario,
};

/// Entry point of the engine: runs one configured load test to completion.
///
/// ```rust,no_run
/// use volley::{Config, LoadTester};
///
/// # async fn demo() -> volley::Result<()> {
/// let summary = LoadTester::new(Config::new("http://localhost:3000", 100, 10))?
///     .run()
///     .await?;
/// assert_eq!(summary.total_requests, 100);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LoadTester {
    config: Config,
    client: Client,
    request_timeout: Duration,
}

impl LoadTester {
    /// Validates `config` and builds the HTTP client shared by every worker.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        // No client-wide timeout, the deadline is set on every request
        let client = Client::builder().build()?;
        Ok(Self {
            config,
            client,
            request_timeout: REQUEST_TIMEOUT,
        })
    }

    /// Overrides the per-request deadline (30 seconds by default).
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Issues every request and returns the folded summary.
    ///
    /// Failed requests do not fail the run, they are listed in [`RunSummary::errors`].
    pub async fn run(&self) -> Result<RunSummary> {
        let start = Instant::now();

        let action = Arc::new(
            HttpAction::builder()
                .client(self.client.clone())
                .url(self.config.url.as_str())
                .timeout(self.request_timeout)
                .build(),
        );
        let scenario = Scenario::<RunSummary, _, _>::builder()
            .name(format!("GET {}", self.config.url))
            .action(move || {
                let action = action.clone();
                async move { action.execute().await }
            })
            .build();

        let mut summary = PoolExecutor::builder()
            .requests(self.config.requests)
            .workers(self.config.concurrency)
            .build()
            .exec(&scenario)
            .await?;

        summary.settle(self.config.requests);
        summary.total_duration = start.elapsed();
        tracing::info!(
            "Run finished in {:?}: {}/{} requests answered with 200, {} failed",
            summary.total_duration,
            summary.successful_requests,
            summary.total_requests,
            summary.errors.len()
        );
        Ok(summary)
    }
}
