//! volley - fixed-concurrency HTTP load generator

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use volley::{
    LoadTester, Reporter, SummaryReport,
    report::{JsonReporter, StdoutReporter},
};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    // Logs go to stderr, stdout only carries the report
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(cli.log_level().into()),
        )
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &cli::Cli) -> Result<()> {
    let config = cli.config().context("invalid arguments, see --help")?;
    let tester = LoadTester::new(config).context("could not set up the load test")?;

    if !cli.json {
        let config = tester.config();
        println!("Starting load test...");
        println!("URL: {}", config.url);
        println!("Requests: {}", config.requests);
        println!("Concurrency: {}", config.concurrency);
        println!("----------------------------------------");
    }

    let summary = tester.run().await.context("load test aborted")?;
    let report = SummaryReport::from(summary);

    let printed = if cli.json {
        JsonReporter.report(&report).await
    } else {
        StdoutReporter.report(&report).await
    };
    // The run itself completed, a broken stdout is not worth a failing exit code
    if let Err(e) = printed {
        tracing::warn!("Could not print the report: {e}");
    }
    Ok(())
}
