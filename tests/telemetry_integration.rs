//! Integration tests for game telemetry change tracking

use std::sync::{Arc, Mutex};

use owkit::app::config::TelemetrySettings;
use owkit::{GameStatus, TelemetryAdapter, TelemetryEvent, TelemetryPath, TelemetryTopic};
use owkit_host::test_utils::{info_map, test_game, FakeHost};
use owkit_host::SetRequiredFeaturesResult;
use serde_json::{json, Value};

/// Game status tracker and adapter over a host with a running game
async fn running_game(host: &Arc<FakeHost>) -> (GameStatus<FakeHost>, TelemetryAdapter<FakeHost>) {
    host.set_running_game(Some(test_game(54421, true)));
    let status = GameStatus::new(host.clone());
    assert!(status.start().await);

    let adapter = TelemetryAdapter::for_game(
        host.clone(),
        vec!["category".to_string()],
        &status,
        &TelemetrySettings::default(),
    );
    (status, adapter)
}

fn collect(adapter: &TelemetryAdapter<FakeHost>, topic: TelemetryTopic) -> Arc<Mutex<Vec<Value>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    adapter
        .emitter()
        .add_listener(topic, move |event: &TelemetryEvent| {
            sink.lock().unwrap().push(event.val.clone());
        });
    seen
}

#[tokio::test]
async fn test_repeated_snapshot_emits_only_transitions() {
    let host = Arc::new(FakeHost::granting(&["category"]));
    let (_status, adapter) = running_game(&host).await;
    assert!(adapter.start().await);

    let path = collect(&adapter, TelemetryTopic::path("category", "k"));
    let category = collect(&adapter, TelemetryTopic::category("category"));
    let all = collect(&adapter, TelemetryTopic::All);

    host.push_info(info_map(json!({"category": {"k": "5"}})));
    host.push_info(info_map(json!({"category": {"k": "5"}})));
    host.push_info(info_map(json!({"category": {"k": "6"}})));

    assert_eq!(*path.lock().unwrap(), vec![json!(5), json!(6)]);
    assert_eq!(*category.lock().unwrap(), vec![json!(5), json!(6)]);
    assert_eq!(*all.lock().unwrap(), vec![json!(5), json!(6)]);
    assert_eq!(
        adapter.value(&TelemetryPath::new("category", "k")),
        Some(json!(6))
    );
}

#[tokio::test]
async fn test_same_value_twice_fires_once() {
    let host = Arc::new(FakeHost::granting(&["category"]));
    host.set_info(info_map(json!({"match_info": {"kills": "3"}})));
    let (_status, adapter) = running_game(&host).await;

    let all = collect(&adapter, TelemetryTopic::All);
    assert!(adapter.start().await);
    host.push_info(info_map(json!({"match_info": {"kills": "3"}})));

    assert_eq!(*all.lock().unwrap(), vec![json!(3)]);
}

#[tokio::test]
async fn test_empty_grant_fails_without_listeners() {
    let host = Arc::new(FakeHost::new());
    host.set_negotiation_fallback(SetRequiredFeaturesResult::granted(Vec::<String>::new()));
    let (_status, adapter) = running_game(&host).await;
    let listeners_before = host.attached_listeners();

    assert!(!adapter.start().await);
    assert!(!adapter.is_running());
    assert_eq!(host.attached_listeners(), listeners_before);
    assert_eq!(host.negotiation_calls(), 1);
}

#[tokio::test]
async fn test_stop_detaches_and_clears_snapshot() {
    let host = Arc::new(FakeHost::granting(&["category"]));
    let (status, adapter) = running_game(&host).await;
    assert!(adapter.start().await);
    host.push_info(info_map(json!({"category": {"k": "1"}})));
    assert_eq!(adapter.state().len(), 1);

    adapter.stop().await;
    assert!(adapter.state().is_empty());
    assert_eq!(host.attached_listeners(), 1);

    status.destroy().await;
    assert_eq!(host.attached_listeners(), 0);
}

#[test]
fn test_flattened_paths_never_collide() {
    let names = ["a", "b", "a.b", "b.c", "events", "a.b.c"];
    let mut paths = Vec::new();
    for category in names {
        for key in names {
            paths.push(TelemetryPath::new(category, key));
        }
    }

    for (i, first) in paths.iter().enumerate() {
        for second in &paths[i + 1..] {
            assert_ne!(first, second);
        }
    }
}
