//! Remote config poller against a mock control plane.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use origin_ingress::config::poller::{PollError, RemoteConfigPoller};
use origin_ingress::config::{decode, ConfigStore};
use origin_ingress::Shutdown;

use common::{start_mock_control_plane, start_programmable_control_plane, start_silent_control_plane};

const PAYLOAD: &str = r#"{
    "originRequest": {"connectTimeout": "12s"},
    "ingress": [
        {"hostname": "app.example.com", "service": "http://localhost:8080"},
        {"service": "http_status:404"}
    ]
}"#;

fn empty_store() -> Arc<ConfigStore> {
    Arc::new(ConfigStore::new(decode(b"{}").unwrap()))
}

#[tokio::test]
async fn test_poll_once_applies_payload() {
    let addr = start_mock_control_plane(PAYLOAD.to_string()).await;
    let store = empty_store();
    let poller = RemoteConfigPoller::new(format!("http://{}/config", addr), Duration::from_secs(60), store.clone());

    let generation = poller.poll_once().await.unwrap();

    assert_eq!(generation, 1);
    let current = store.current();
    assert_eq!(current.ingress.len(), 2);
    assert_eq!(current.ingress.rules[0].config.connect_timeout, Duration::from_secs(12));
}

#[tokio::test]
async fn test_error_status_keeps_current_config() {
    let addr = start_programmable_control_plane(|| async { (503, "unavailable".to_string()) }).await;
    let store = empty_store();
    let before = store.current();
    let poller = RemoteConfigPoller::new(format!("http://{}/config", addr), Duration::from_secs(60), store.clone());

    match poller.poll_once().await {
        Err(PollError::Status(503)) => {}
        other => panic!("expected status error, got {other:?}"),
    }
    assert_eq!(store.generation(), 0);
    assert!(Arc::ptr_eq(&before, &store.current()));
}

#[tokio::test]
async fn test_invalid_payload_keeps_current_config() {
    let addr = start_mock_control_plane(r#"{"ingress": [{"hostname": "a.example.com"}]}"#.to_string()).await;
    let store = Arc::new(ConfigStore::new(decode(PAYLOAD.as_bytes()).unwrap()));
    let poller = RemoteConfigPoller::new(format!("http://{}/config", addr), Duration::from_secs(60), store.clone());

    assert!(matches!(poller.poll_once().await, Err(PollError::Decode(_))));
    assert_eq!(store.current().ingress.len(), 2);
}

#[tokio::test]
async fn test_run_polls_until_shutdown() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let addr = start_programmable_control_plane(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { (200, PAYLOAD.to_string()) }
    })
    .await;

    let store = empty_store();
    let shutdown = Shutdown::new();
    let poller = RemoteConfigPoller::new(format!("http://{}/config", addr), Duration::from_millis(20), store.clone());
    let handle = tokio::spawn(poller.run(shutdown.clone()));

    // First tick fires immediately.
    for _ in 0..100 {
        if store.generation() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(store.generation() >= 2);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("poller did not stop after shutdown")
        .unwrap();

    let after = hits.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(hits.load(Ordering::SeqCst), after);
}

#[tokio::test]
async fn test_unreachable_control_plane_is_reported() {
    let store = empty_store();
    // Port 1 on loopback refuses connections.
    let poller = RemoteConfigPoller::new("http://127.0.0.1:1/config", Duration::from_secs(60), store.clone());

    assert!(matches!(poller.poll_once().await, Err(PollError::Fetch(_))));
    assert_eq!(store.generation(), 0);
}

#[tokio::test]
async fn test_unanswered_fetch_times_out() {
    let addr = start_silent_control_plane().await;
    let store = empty_store();
    let poller = RemoteConfigPoller::new(format!("http://{}/config", addr), Duration::from_secs(60), store.clone())
        .with_timeout(Duration::from_millis(100));

    let result = tokio::time::timeout(Duration::from_secs(2), poller.poll_once())
        .await
        .expect("fetch was not bounded by its timeout");

    assert!(matches!(result, Err(PollError::Timeout(_))));
    assert_eq!(store.generation(), 0);
}

#[tokio::test]
async fn test_shutdown_interrupts_in_flight_fetch() {
    let addr = start_silent_control_plane().await;
    let store = empty_store();
    let shutdown = Shutdown::new();
    // Default fetch timeout is far longer than the shutdown deadline below.
    let poller = RemoteConfigPoller::new(format!("http://{}/config", addr), Duration::from_millis(20), store.clone());
    let handle = tokio::spawn(poller.run(shutdown.clone()));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!handle.is_finished());

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("poller kept waiting on an unanswered fetch after shutdown")
        .unwrap();
    assert_eq!(store.generation(), 0);
}
