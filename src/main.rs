//! State Sync demo
//!
//! Wires a counter store to the sync plugin. In the browser the counter
//! survives reloads through LocalStorage; natively it runs against an
//! in-memory backend seeded with a previous session.

use serde_json::{Value, json};
use state_sync::{BasicStore, Store, SyncOptions};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Counter store with an `increment` mutation and a transient `scratch` field
fn counter_store() -> BasicStore {
    let store = BasicStore::new(json!({
        "counter": {"count": 0, "step": 1},
        "scratch": null,
    }));
    store.register("increment", |state, _| {
        let step = state["counter"]["step"].as_i64().unwrap_or(1);
        let count = state["counter"]["count"].as_i64().unwrap_or(0);
        state["counter"]["count"] = json!(count + step);
    });
    store.register("scribble", |state, payload| {
        state["scratch"] = payload.clone();
    });
    store
}

/// Only the counter is persisted; scribbles never trigger a write
fn demo_options() -> SyncOptions {
    SyncOptions::new()
        .key("state_sync_demo")
        .paths(["counter"])
        .filter(|m| m.kind != "scribble")
        .rehydrated(|store: &dyn Store| {
            log::info!("Restored counter: {}", store.state()["counter"]["count"]);
        })
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    log::info!("State Sync demo starting...");

    let sync = state_sync::StateSync::new(demo_options())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let store = counter_store();
    sync.attach(&store);

    store
        .commit("increment", Value::Null)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    log::info!("Counter is now {}", store.state()["counter"]["count"]);
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use state_sync::{MemoryStorage, StateSync, Storage};
    use std::rc::Rc;

    env_logger::init();
    log::info!("State Sync demo (native) starting...");

    let storage = Rc::new(
        MemoryStorage::new().seeded("state_sync_demo", r#"{"counter":{"count":41,"step":1}}"#),
    );
    let sync = StateSync::new(demo_options().storage(Rc::clone(&storage)))?;
    let store = counter_store();
    sync.attach(&store);

    store.commit("scribble", json!("not persisted"))?;
    store.commit("increment", Value::Null)?;

    println!("state:   {}", store.state());
    println!(
        "stored:  {}",
        storage.get_item("state_sync_demo")?.unwrap_or_default()
    );
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main
}
