use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{Router, extract::State, http::StatusCode, routing::get};
use tokio::net::TcpListener;
use volley::{Config, LoadTester, RunSummary, SummaryReport};

type Hits = Arc<AtomicUsize>;

/// Serves `app` on an ephemeral local port and returns its base URL.
async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}/")
}

/// A local address nothing listens on.
async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

async fn always_ok(State(hits): State<Hits>) -> &'static str {
    hits.fetch_add(1, Ordering::SeqCst);
    "OK"
}

async fn alternating(State(hits): State<Hits>) -> (StatusCode, &'static str) {
    let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
    if n % 2 == 0 {
        (StatusCode::NOT_FOUND, "Response")
    } else {
        (StatusCode::OK, "Response")
    }
}

async fn slow_first(State(hits): State<Hits>) -> &'static str {
    if hits.fetch_add(1, Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_secs(3)).await;
    }
    "OK"
}

fn assert_accounting(summary: &RunSummary, requests: usize) {
    assert_eq!(summary.total_requests, requests);
    assert_eq!(
        summary.answered_requests() + summary.errors.len(),
        summary.total_requests
    );
    assert_eq!(summary.successful_requests, summary.status_count(200));
}

async fn run(url: String, requests: usize, concurrency: usize) -> RunSummary {
    LoadTester::new(Config::new(url, requests, concurrency))
        .unwrap()
        .run()
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_request_succeeds_against_healthy_target() {
    let hits = Hits::default();
    let url = serve(Router::new().route("/", get(always_ok)).with_state(hits.clone())).await;

    let summary = run(url, 10, 2).await;

    assert_accounting(&summary, 10);
    assert_eq!(summary.successful_requests, 10);
    assert_eq!(summary.status_codes.len(), 1);
    assert_eq!(summary.status_count(200), 10);
    assert!(summary.errors.is_empty());
    assert!(summary.total_duration > Duration::ZERO);
    assert_eq!(hits.load(Ordering::SeqCst), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unreachable_target_records_every_failure() {
    let summary = run(closed_port_url().await, 5, 2).await;

    assert_accounting(&summary, 5);
    assert_eq!(summary.successful_requests, 0);
    assert_eq!(summary.status_count(200), 0);
    assert!(summary.status_codes.is_empty());
    assert_eq!(summary.errors.len(), 5);
    assert!(summary.errors.iter().all(|cause| !cause.is_empty()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn non_200_statuses_are_counted_not_failed() {
    let hits = Hits::default();
    let app = Router::new().route("/", get(alternating));
    let url = serve(app.with_state(hits.clone())).await;

    let summary = run(url, 10, 1).await;

    assert_accounting(&summary, 10);
    assert_eq!(summary.status_count(200), 5);
    assert_eq!(summary.status_count(404), 5);
    assert_eq!(summary.successful_requests, 5);
    assert!(summary.errors.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_above_request_count_issues_exact_count() {
    let hits = Hits::default();
    let url = serve(Router::new().route("/", get(always_ok)).with_state(hits.clone())).await;

    let summary = tokio::time::timeout(Duration::from_secs(10), run(url, 3, 10))
        .await
        .expect("run should not hang");

    assert_accounting(&summary, 3);
    assert_eq!(summary.successful_requests, 3);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn timed_out_request_does_not_hold_back_the_others() {
    let hits = Hits::default();
    let url = serve(Router::new().route("/", get(slow_first)).with_state(hits.clone())).await;

    let summary = LoadTester::new(Config::new(url, 6, 3))
        .unwrap()
        .with_request_timeout(Duration::from_millis(300))
        .run()
        .await
        .unwrap();

    assert_accounting(&summary, 6);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("timed out"), "{}", summary.errors[0]);
    assert_eq!(summary.successful_requests, 5);
    // the slow handler is still asleep when the run ends
    assert!(summary.total_duration < Duration::from_secs(3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn larger_run_keeps_the_books_balanced() {
    let hits = Hits::default();
    let app = Router::new().route("/", get(alternating));
    let url = serve(app.with_state(hits.clone())).await;

    let summary = run(url, 200, 16).await;

    assert_accounting(&summary, 200);
    assert_eq!(hits.load(Ordering::SeqCst), 200);
    assert_eq!(summary.status_count(200) + summary.status_count(404), 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn report_of_a_real_run_renders_the_same_twice() {
    let summary = run(closed_port_url().await, 7, 3).await;

    let first = SummaryReport::from(summary.clone()).to_string();
    let second = SummaryReport::from(summary).to_string();

    assert_eq!(first, second);
    assert!(first.contains("Errors: 7"));
    assert!(first.contains("... and 2 more errors"));
}
