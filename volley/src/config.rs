use serde::{Deserialize, Serialize};

/// Immutable input of a load run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Target endpoint hit with `GET` requests.
    pub url: String,
    /// Total number of requests to issue.
    pub requests: usize,
    /// Number of concurrent workers. Values above `requests` are harmless.
    pub concurrency: usize,
}

impl Config {
    pub fn new(url: impl Into<String>, requests: usize, concurrency: usize) -> Self {
        Self {
            url: url.into(),
            requests,
            concurrency,
        }
    }

    /// Builds a configuration from raw, possibly non-positive, counts.
    pub fn from_signed(
        url: impl Into<String>,
        requests: i64,
        concurrency: i64,
    ) -> Result<Self, ConfigError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        let requests = positive(requests).ok_or(ConfigError::InvalidRequests(requests))?;
        let concurrency =
            positive(concurrency).ok_or(ConfigError::InvalidConcurrency(concurrency))?;
        Ok(Self::new(url, requests, concurrency))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        if self.requests == 0 {
            return Err(ConfigError::InvalidRequests(0));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(0));
        }
        Ok(())
    }
}

fn positive(n: i64) -> Option<usize> {
    usize::try_from(n).ok().filter(|n| *n > 0)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("url is required and must not be empty")]
    EmptyUrl,

    #[error("request count must be greater than 0 (got {0})")]
    InvalidRequests(i64),

    #[error("concurrency must be greater than 0 (got {0})")]
    InvalidConcurrency(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_config() {
        let config = Config::from_signed("http://localhost:3000", 100, 10).unwrap();
        assert_eq!(config, Config::new("http://localhost:3000", 100, 10));
    }

    #[test]
    fn concurrency_above_requests_is_valid() {
        assert!(Config::new("http://localhost", 3, 10).validate().is_ok());
    }

    #[test]
    fn rejects_empty_url() {
        assert_eq!(
            Config::from_signed("", 1, 1).unwrap_err(),
            ConfigError::EmptyUrl
        );
        assert_eq!(
            Config::new("   ", 1, 1).validate().unwrap_err(),
            ConfigError::EmptyUrl
        );
    }

    #[test]
    fn rejects_non_positive_requests() {
        for n in [0, -1, -100] {
            assert_eq!(
                Config::from_signed("http://localhost", n, 1).unwrap_err(),
                ConfigError::InvalidRequests(n)
            );
        }
    }

    #[test]
    fn rejects_non_positive_concurrency() {
        for n in [0, -5] {
            assert_eq!(
                Config::from_signed("http://localhost", 1, n).unwrap_err(),
                ConfigError::InvalidConcurrency(n)
            );
        }
    }
}
