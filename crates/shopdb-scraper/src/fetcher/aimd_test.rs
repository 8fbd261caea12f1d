use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn quiet_policy() -> FetchPolicy {
    FetchPolicy {
        initial_concurrency: 5,
        min_concurrency: 2,
        penalty_delay: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
        max_retries: 0,
        jitter_max: Duration::ZERO,
        backoff_unit: Duration::ZERO,
    }
}

fn fetcher(cancel: CancellationToken) -> RateLimitedFetcher {
    RateLimitedFetcher::new(HttpFetcher::new(quiet_policy(), cancel).unwrap())
}

#[test]
fn three_degraded_batches_bottom_out_at_the_floor() {
    let policy = quiet_policy();
    let mut state = RateLimitState::new(&policy);
    assert_eq!(state.concurrency(), 5);

    for expected in [4, 3, 2] {
        assert_eq!(state.record_batch(4, 5, &policy), BatchVerdict::Decrease);
        assert_eq!(state.concurrency(), expected);
    }
    assert_eq!(state.consecutive_errors(), 3);

    state.record_batch(2, 2, &policy);
    assert_eq!(state.concurrency(), 2, "never drops below the floor");
}

#[test]
fn recovery_waits_one_clean_batch_then_grows_to_initial() {
    let policy = quiet_policy();
    let mut state = RateLimitState::new(&policy);
    state.record_batch(3, 5, &policy);
    assert_eq!(state.concurrency(), 4);

    // first clean batch only clears the error streak
    assert_eq!(state.record_batch(0, 4, &policy), BatchVerdict::Hold);
    assert_eq!(state.consecutive_errors(), 0);
    assert_eq!(state.concurrency(), 4);

    assert_eq!(state.record_batch(0, 4, &policy), BatchVerdict::Increase);
    assert_eq!(state.concurrency(), 5);

    assert_eq!(state.record_batch(0, 5, &policy), BatchVerdict::Hold);
    assert_eq!(state.concurrency(), 5, "growth is capped at the initial value");
}

#[test]
fn half_failed_batch_holds() {
    let policy = quiet_policy();
    let mut state = RateLimitState::new(&policy);
    state.record_batch(3, 5, &policy);

    assert_eq!(state.record_batch(2, 4, &policy), BatchVerdict::Hold);
    assert_eq!(state.concurrency(), 4);
    assert_eq!(state.consecutive_errors(), 1);
}

#[test]
fn empty_batch_changes_nothing() {
    let policy = quiet_policy();
    let mut state = RateLimitState::new(&policy);
    assert_eq!(state.record_batch(0, 0, &policy), BatchVerdict::Hold);
    assert_eq!(state, RateLimitState::new(&policy));
}

#[tokio::test]
async fn rate_limited_batches_shrink_concurrency_and_keep_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/items/\d+$"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .mount(&server)
        .await;

    let mut fetcher = fetcher(CancellationToken::new());
    let urls: Vec<String> = (0..12).map(|i| format!("{}/items/{i}", server.uri())).collect();

    let report = fetcher
        .fetch_batched(&urls, |http, url| http.fetch(url, &[]).boxed())
        .await;

    assert_eq!(report.results.len(), 12);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.failed(), 12);
    // batches of 5, 4, 3 consume all 12 items
    assert_eq!(fetcher.state().concurrency(), 2);
    assert_eq!(fetcher.state().consecutive_errors(), 3);
}

#[tokio::test]
async fn not_found_does_not_count_against_concurrency() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/items/\d+$"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut fetcher = fetcher(CancellationToken::new());
    let urls: Vec<String> = (0..10).map(|i| format!("{}/items/{i}", server.uri())).collect();

    let report = fetcher
        .fetch_batched(&urls, |http, url| http.fetch(url, &[]).boxed())
        .await;

    assert_eq!(report.failed(), 10);
    assert_eq!(fetcher.state().concurrency(), 5);
    assert_eq!(fetcher.state().consecutive_errors(), 0);
}

#[tokio::test]
async fn results_follow_input_order() {
    let server = MockServer::start().await;
    for i in 0..7 {
        Mock::given(method("GET"))
            .and(wiremock::matchers::path(format!("/items/{i}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("body-{i}")))
            .mount(&server)
            .await;
    }

    let mut fetcher = fetcher(CancellationToken::new());
    let urls: Vec<String> = (0..7).map(|i| format!("{}/items/{i}", server.uri())).collect();

    let report = fetcher
        .fetch_batched(&urls, |http, url| http.fetch(url, &[]).boxed())
        .await;

    let bodies: Vec<String> = report
        .results
        .into_iter()
        .map(|r| r.unwrap().body)
        .collect();
    let expected: Vec<String> = (0..7).map(|i| format!("body-{i}")).collect();
    assert_eq!(bodies, expected);
}

#[tokio::test]
async fn cancelled_run_skips_every_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut fetcher = fetcher(cancel);
    let urls: Vec<String> = (0..3).map(|i| format!("{}/items/{i}", server.uri())).collect();

    let report = fetcher
        .fetch_batched(&urls, |http, url| http.fetch(url, &[]).boxed())
        .await;

    assert!(report.results.is_empty());
    assert_eq!(report.skipped, 3);
}
