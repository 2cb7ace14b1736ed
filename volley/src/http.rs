//! HTTP `GET` action producing one [`RequestOutcome`] per call.
use std::{error::Error as StdError, sync::Arc, time::Duration};

use reqwest::Client;
use tokio::time::Instant;
use typed_builder::TypedBuilder;

use crate::metric::RequestOutcome;

/// Deadline applied to every single request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything needed to issue the same request again and again.
///
/// The client is a handle over a shared connection pool, cloning the action is cheap.
#[derive(Debug, Clone, TypedBuilder)]
pub struct HttpAction {
    pub client: Client,
    #[builder(setter(into))]
    pub url: Arc<str>,
    #[builder(default = REQUEST_TIMEOUT)]
    pub timeout: Duration,
}

impl HttpAction {
    /// Issues one `GET` and reports what happened. Never fails: transport errors and
    /// deadlines become [`crate::OutcomeKind::Failure`].
    pub async fn execute(&self) -> RequestOutcome {
        let start = Instant::now();

        let response = match self
            .client
            .get(&*self.url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let cause = describe(&e);
                tracing::trace!("Request to {} failed: {cause}", self.url);
                return RequestOutcome::failure(cause, start.elapsed());
            }
        };

        let status = response.status().as_u16();
        // The body is never read, dropping the response hands the connection back
        drop(response);
        RequestOutcome::status(status, start.elapsed())
    }
}

/// Flattens an error and its sources into one line, reqwest keeps the useful part
/// (refused, dns, timed out) in the source chain.
fn describe(err: &reqwest::Error) -> String {
    let mut cause = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let inner_text = inner.to_string();
        if !cause.contains(&inner_text) {
            cause.push_str(": ");
            cause.push_str(&inner_text);
        }
        source = inner.source();
    }
    if err.is_timeout() && !cause.contains("timed out") {
        cause.push_str(" (timed out)");
    }
    cause
}
