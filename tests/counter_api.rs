mod common;

use std::time::Duration;

use common::mock_backend::{MockBackend, MockResponse};
use common::{counter_engine, eventually, RunningService};
use tally_store::api::{CacheKey, CacheOptions, FetchStatus};
use tally_store::app::{make_store, AppContext};
use tally_store::config::Config;
use tally_store::counter::{increment_async, select_count, CounterStatus};
use tally_store::endpoints::counter::{GetCount, IncrementCount};

fn count_key() -> CacheKey {
    CacheKey::new("getCount", &serde_json::Value::Null)
}

/// Test that GET /api/count reaches the cache.
#[tokio::test]
async fn test_get_count_query() {
    let server = RunningService::start(5).await;
    let store = make_store(None);
    let engine = counter_engine(&store, server.api_url(), CacheOptions::default());

    let count = engine.query(GetCount, ());
    assert_eq!(count.settled().await, Ok(5));
    assert_eq!(count.key(), &count_key());
}

/// Test the mutation hook lifecycle: loading, then fulfilled with the new count.
#[tokio::test]
async fn test_increment_mutation_lifecycle() {
    let server = RunningService::start(1).await;
    let store = make_store(None);
    let engine = counter_engine(&store, server.api_url(), CacheOptions::default());

    let increment = engine.mutation(IncrementCount);
    assert_eq!(increment.result().status, FetchStatus::Uninitialized);

    let handle = increment.trigger(4);
    assert!(increment.is_loading());
    assert_eq!(handle.settled().await, Ok(5));

    let result = increment.result();
    assert_eq!(result.status, FetchStatus::Fulfilled);
    assert_eq!(result.data, Some(5));
    assert!(!result.is_loading);
    assert_eq!(server.service.count(), 5);

    increment.reset();
    assert_eq!(increment.result().status, FetchStatus::Uninitialized);
    assert!(engine.slice().mutations.is_empty());
}

/// Test that a fulfilled increment refetches the subscribed count.
#[tokio::test]
async fn test_mutation_invalidates_subscribed_count() {
    let server = RunningService::start(10).await;
    let store = make_store(None);
    let engine = counter_engine(&store, server.api_url(), CacheOptions::default());

    let count = engine.query(GetCount, ());
    assert_eq!(count.settled().await, Ok(10));

    let increment = engine.mutation(IncrementCount);
    assert_eq!(increment.trigger(3).settled().await, Ok(13));

    assert_eq!(count.settled().await, Ok(13));
    assert_eq!(count.result().data, Some(13));
    assert!(!count.result().is_stale);
}

/// Test that an increment landing while a count refetch is in flight is not lost.
#[tokio::test]
async fn test_mutation_during_refetch_refetches_after_settle() {
    let mock = MockBackend::start().await;
    mock.enqueue_response(MockResponse::json("0")).await;
    mock.enqueue_response(MockResponse::json("1").with_delay(300))
        .await;
    mock.enqueue_response(MockResponse::json("7")).await;
    mock.enqueue_response(MockResponse::json("7")).await;
    let store = make_store(None);
    let engine = counter_engine(
        &store,
        format!("{}/api", mock.base_url()),
        CacheOptions::default(),
    );

    let count = engine.query(GetCount, ());
    assert_eq!(count.settled().await, Ok(0));

    count.refetch();
    let backend = &mock;
    assert!(
        eventually(Duration::from_secs(2), || async move {
            backend.request_count().await == 2
        })
        .await
    );

    let increment = engine.mutation(IncrementCount);
    assert_eq!(increment.trigger(7).settled().await, Ok(7));
    assert!(count.result().is_stale);
    assert!(engine.is_in_flight(count.key()));

    // The slow refetch still settles with what the server said at the time,
    // then a fresh request picks up the increment.
    assert_eq!(count.settled().await, Ok(1));
    assert_eq!(count.settled().await, Ok(7));

    let result = count.result();
    assert_eq!(result.data, Some(7));
    assert!(!result.is_stale);
    assert_eq!(mock.request_count().await, 4);
}

/// Test that an increment landing during the very first count fetch is not lost.
#[tokio::test]
async fn test_mutation_during_first_fetch_refetches_after_settle() {
    let mock = MockBackend::start().await;
    mock.enqueue_response(MockResponse::json("3").with_delay(300))
        .await;
    mock.enqueue_response(MockResponse::json("5")).await;
    mock.enqueue_response(MockResponse::json("8")).await;
    let store = make_store(None);
    let engine = counter_engine(
        &store,
        format!("{}/api", mock.base_url()),
        CacheOptions::default(),
    );

    let count = engine.query(GetCount, ());
    let backend = &mock;
    assert!(
        eventually(Duration::from_secs(2), || async move {
            backend.request_count().await == 1
        })
        .await
    );

    let increment = engine.mutation(IncrementCount);
    assert_eq!(increment.trigger(5).settled().await, Ok(5));
    let pending = count.result();
    assert!(pending.is_loading);
    assert!(pending.is_stale);

    assert_eq!(count.settled().await, Ok(3));
    assert_eq!(count.settled().await, Ok(8));
    assert!(!count.result().is_stale);
    assert_eq!(mock.request_count().await, 3);
}

/// Test that an unsubscribed entry is marked stale and refetched on next access.
#[tokio::test]
async fn test_invalidated_unsubscribed_entry_refetches_on_access() {
    let server = RunningService::start(0).await;
    let store = make_store(None);
    let engine = counter_engine(&store, server.api_url(), CacheOptions::default());

    let count = engine.query(GetCount, ());
    assert_eq!(count.settled().await, Ok(0));
    drop(count);

    let increment = engine.mutation(IncrementCount);
    assert_eq!(increment.trigger(7).settled().await, Ok(7));

    let entry = engine.slice().query(&count_key()).cloned().unwrap();
    assert!(entry.stale);
    assert_eq!(entry.data, Some(serde_json::json!(0)));
    assert!(!engine.is_in_flight(&count_key()));

    let count = engine.query(GetCount, ());
    assert!(count.result().is_fetching);
    assert_eq!(count.settled().await, Ok(7));
}

/// Test that a failed mutation is rejected and does not invalidate.
#[tokio::test]
async fn test_failed_mutation_rejects() {
    let mock = MockBackend::start().await;
    mock.enqueue_response(MockResponse::json("2")).await;
    mock.enqueue_response(MockResponse::error(500, "counter offline"))
        .await;
    let store = make_store(None);
    let engine = counter_engine(
        &store,
        format!("{}/api", mock.base_url()),
        CacheOptions::default(),
    );

    let count = engine.query(GetCount, ());
    assert_eq!(count.settled().await, Ok(2));

    let increment = engine.mutation(IncrementCount);
    let err = increment.trigger(1).settled().await.unwrap_err();
    assert_eq!(err.status_code(), Some(500));
    assert_eq!(increment.result().status, FetchStatus::Rejected);
    assert_eq!(increment.result().error, Some(err));

    assert_eq!(count.result().status, FetchStatus::Fulfilled);
    assert!(!count.result().is_stale);
    assert!(!engine.is_in_flight(count.key()));

    let requests = mock.captured_requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].method, "POST");
    assert_eq!(requests[1].path, "/api/increment");
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&requests[1].body).unwrap(),
        serde_json::json!({"amount": 1})
    );
}

/// Test that the service rejects malformed increment bodies with a 4xx.
#[tokio::test]
async fn test_service_rejects_malformed_body() {
    let server = RunningService::start(0).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/increment", server.api_url()))
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert_eq!(server.service.count(), 0);
}

/// Test the full context: local async increment then the remote counter.
#[tokio::test]
async fn test_app_context_wires_both_apis() {
    let server = RunningService::start(100).await;
    let mut config = Config::default();
    config.counter.async_delay_ms = 10;
    config.counter_api.base_url = server.api_url();
    let context = AppContext::new(&config).unwrap();

    let pending = increment_async(&context.store, context.count_source.clone(), 2);
    assert_eq!(pending.settled().await, Ok(2));
    let state = context.store.get_state();
    assert_eq!(select_count(&state), 2);
    assert_eq!(state.counter.status, CounterStatus::Idle);

    let count = context.counter_api.query(GetCount, ());
    assert_eq!(count.settled().await, Ok(100));
    assert!(context.store.get_state().counter_api.query(&count_key()).is_some());
    assert!(context.store.get_state().quotes_api.queries.is_empty());
}
