//! Integration tests for the shared state store

use std::sync::{Arc, Mutex};

use owkit::app::state::RESERVED_PROPERTIES;
use owkit::{
    Error, EventEmitter, ListenerBundle, ListenerRef, StateClient, StateKey, StateManager,
    WindowTunnel,
};
use owkit_host::{FileStorage, MemoryStorage, Storage};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Position {
    x: i32,
    y: i32,
}

const POSITION: StateKey<Position> = StateKey::new("position");
const X: StateKey<i64> = StateKey::new("x");

#[test]
fn test_client_before_publish_fails_fast() {
    let tunnel = WindowTunnel::new();
    let err = StateClient::connect(&tunnel, "overlay").unwrap_err();
    assert!(matches!(err, Error::TunnelNotRegistered { .. }));
    assert!(err.is_fatal());

    StateManager::new("overlay", &json!({"x": 1}))
        .unwrap()
        .publish(&tunnel);
    let client = StateClient::connect(&tunnel, "overlay").unwrap();
    assert_eq!(client.get(&X).unwrap(), Some(1));
}

#[test]
fn test_store_never_aliases_objects() {
    let state = StateManager::new("window", &json!({"position": {"x": 0, "y": 0}})).unwrap();

    let mut input = Position { x: 1, y: 2 };
    state.set(&POSITION, &input).unwrap();
    input.x = 99;
    assert_eq!(state.get(&POSITION).unwrap(), Some(Position { x: 1, y: 2 }));

    let mut first = state.get(&POSITION).unwrap().unwrap();
    let second = state.get(&POSITION).unwrap().unwrap();
    first.y = 7;
    assert_ne!(first, second);
    assert_eq!(state.get(&POSITION).unwrap(), Some(second));
}

#[test]
fn test_persistent_store_survives_restart() {
    let dir = TempDir::new().unwrap();

    {
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(dir.path()).unwrap());
        let state = StateManager::persistent("settings", &json!({"x": 0}), storage).unwrap();
        state.set(&X, &42).unwrap();
    }

    let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(dir.path()).unwrap());
    let state = StateManager::persistent("settings", &json!({"x": 0, "y": 5}), storage).unwrap();
    assert_eq!(state.get(&X).unwrap(), Some(42));
    assert_eq!(state.get_value("y"), Some(json!(5)));
}

#[test]
fn test_stores_do_not_share_namespaces() {
    let storage = MemoryStorage::new();
    let a = StateManager::persistent("a", &json!({"x": 0}), Arc::new(storage.clone())).unwrap();
    a.set(&X, &1).unwrap();

    let b = StateManager::persistent("b", &json!({"x": 0}), Arc::new(storage.clone())).unwrap();
    assert_eq!(b.get(&X).unwrap(), Some(0));

    a.clear_persistent_state().unwrap();
    assert_eq!(storage.keys(), Vec::<String>::new());
    assert_eq!(a.get(&X).unwrap(), Some(1));
}

#[test]
fn test_partial_off_keeps_remaining_topics() {
    let emitter: EventEmitter<u32> = EventEmitter::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let bundle = ["one", "two", "three"]
        .into_iter()
        .fold(ListenerBundle::new(), |bundle, topic| {
            let sink = seen.clone();
            bundle.with(topic.to_string(), move |value: &u32| {
                sink.lock().unwrap().push((topic, *value));
            })
        });
    let reference = ListenerRef::new();
    emitter.on(bundle, reference);

    emitter.off(["one", "two"], reference);
    emitter.emit("one", &1);
    emitter.emit("two", &2);
    emitter.emit("three", &3);

    assert_eq!(*seen.lock().unwrap(), vec![("three", 3)]);
    assert!(emitter.has_listener("three"));
    assert!(!emitter.has_listener("one"));
}

#[test]
fn test_proxy_guards_reserved_names() {
    let state = StateManager::new("hud", &json!({"visible": true})).unwrap();
    let proxy = state.proxy();

    for name in RESERVED_PROPERTIES {
        assert!(matches!(
            proxy.set(name, json!(false)).unwrap_err(),
            Error::ReservedProperty { .. }
        ));
    }
    assert!(matches!(
        proxy.delete("visible").unwrap_err(),
        Error::DeleteNotAllowed
    ));

    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = changes.clone();
    state.add_listener("visible", move |value| sink.lock().unwrap().push(value.clone()));
    proxy.set("visible", json!(false)).unwrap();
    assert_eq!(*changes.lock().unwrap(), vec![json!(false)]);
}
