use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use veap_watch::watch::{WatchRegistry, WatchService};
use veap_watch::{ClientError, LiveValuePoller, MemoryTransport, ObjectClient, PollerConfig};

const CYCLE: Duration = Duration::from_millis(100);

#[tokio::test(start_paused = true)]
async fn poller_tracks_writes_through_object_client() {
    let store = Arc::new(MemoryTransport::new());
    store.set_value("/dev/STATE", json!(false));
    let client = ObjectClient::new(store.clone());
    let poller = LiveValuePoller::start(store.clone(), "/dev/STATE", PollerConfig { cycle: CYCLE });
    let mut updates = poller.subscribe();

    updates.changed().await.unwrap();
    assert_eq!(updates.borrow_and_update().pv.as_ref().unwrap().value, json!(false));

    client.write_pv("/dev/STATE", json!(true)).await.unwrap();
    updates.changed().await.unwrap();
    let live = updates.borrow_and_update().clone();
    assert_eq!(live.pv.unwrap().value, json!(true));
    assert!(live.changed);

    updates.changed().await.unwrap();
    assert!(!updates.borrow_and_update().changed);
}

#[tokio::test(start_paused = true)]
async fn poller_survives_server_outage() {
    let store = Arc::new(MemoryTransport::new());
    store.set_value("/dev/TEMP", json!(20));
    let poller = LiveValuePoller::start(store.clone(), "/dev/TEMP", PollerConfig { cycle: CYCLE });
    let mut updates = poller.subscribe();
    updates.changed().await.unwrap();

    store.fail("/dev/TEMP/~pv", ClientError::transport("connection reset"));
    updates.changed().await.unwrap();
    let live = updates.borrow_and_update().clone();
    assert!(live.pv.is_none());
    assert!(live.error.unwrap().contains("connection reset"));

    store.clear_failure("/dev/TEMP/~pv");
    store.set_value("/dev/TEMP", json!(25));
    updates.changed().await.unwrap();
    let live = updates.borrow_and_update().clone();
    assert_eq!(live.pv.unwrap().value, json!(25));
    assert!(!live.changed);
    assert!(live.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn watch_service_follows_registry_changes() {
    let store = Arc::new(MemoryTransport::new());
    store.set_value("/a", json!(1));
    store.set_value("/b", json!(2));
    let registry = Arc::new(WatchRegistry::new(store.clone()));
    registry.add("A", "/a").unwrap();
    let service = WatchService::start(registry.clone(), CYCLE);
    let mut reports = service.subscribe();

    reports.changed().await.unwrap();
    assert_eq!(reports.borrow_and_update().summary.requested, 1);

    registry.add("B", "/b").unwrap();
    reports.changed().await.unwrap();
    let report = reports.borrow_and_update().clone();
    assert_eq!(report.summary.requested, 2);
    assert_eq!(report.summary.values, 2);
    assert_eq!(registry.get("/b").unwrap().pv().unwrap().value, json!(2));

    registry.remove("/a");
    store.set_value("/b", json!(3));
    reports.changed().await.unwrap();
    assert_eq!(reports.borrow_and_update().summary.requested, 1);
    assert!(registry.get("/b").unwrap().changed());

    let last = store.requests().last().unwrap().body.clone().unwrap();
    assert_eq!(last, json!({"readPaths": ["/b"]}));
}

#[tokio::test(start_paused = true)]
async fn empty_registry_polls_nothing() {
    let store = Arc::new(MemoryTransport::new());
    let registry = Arc::new(WatchRegistry::new(store.clone()));
    let service = WatchService::start(registry, CYCLE);
    tokio::time::sleep(Duration::from_millis(550)).await;
    assert!(service.subscribe().borrow().cycle >= 5);
    assert_eq!(store.request_count(), 0);
}
