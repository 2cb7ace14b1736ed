//! Command-line arguments

use clap::{ArgAction, Parser};
use volley::{Config, ConfigError};

/// Fire a fixed number of HTTP GET requests at a URL and report what came back.
#[derive(Parser, Debug)]
#[command(name = "volley")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// URL of the service under test
    #[arg(long, default_value = "")]
    pub url: String,

    /// Total number of requests to issue
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub requests: i64,

    /// Number of requests in flight at the same time
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub concurrency: i64,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Turns the raw arguments into a validated configuration.
    pub fn config(&self) -> Result<Config, ConfigError> {
        Config::from_signed(self.url.as_str(), self.requests, self.concurrency)
    }

    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
