use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use veap_watch::config::VeapConfig;
use veap_watch::tooling::cli::CliContext;
use veap_watch::MemoryTransport;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` with XDG_CONFIG_HOME pointing into `temp_dir` and the given
/// VEAP_WATCH variables set. Serialized across tests.
pub fn with_env<F, R>(temp_dir: &TempDir, vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_LOCK.lock();
    let previous = std::env::var("XDG_CONFIG_HOME").ok();
    std::env::set_var("XDG_CONFIG_HOME", temp_dir.path().join("config"));
    for (key, value) in vars {
        std::env::set_var(key, value);
    }

    let result = f();

    for (key, _) in vars {
        std::env::remove_var(key);
    }
    match previous {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }
    result
}

/// A small device tree: root, one device, one channel with two data points.
pub fn device_tree() -> Arc<MemoryTransport> {
    let store = Arc::new(MemoryTransport::new());
    store.insert_object(
        "/",
        json!({
            "title": "Root",
            "~links": [
                {"rel": "domain", "href": "device", "title": "Devices"},
                {"rel": "service", "href": "~exgdata", "title": "Exchange"}
            ]
        }),
    );
    store.insert_object(
        "/device",
        json!({
            "title": "Devices",
            "~links": [
                {"rel": "device", "href": "ABC123", "title": "Kitchen"},
                {"rel": "parent", "href": "..", "title": "Root"}
            ]
        }),
    );
    store.insert_object(
        "/device/ABC123/1/TEMPERATURE",
        json!({
            "title": "Temperature",
            "identifier": "TEMPERATURE",
            "unit": "°C",
            "type": "FLOAT",
            "~links": [
                {"rel": "parent", "href": ".."},
                {"href": "~pv"}
            ]
        }),
    );
    store.set_value("/device/ABC123/1/TEMPERATURE", json!(21.5));
    store.set_value("/device/ABC123/1/STATE", json!(false));
    store.set_value("/device/ABC123/1/LABEL", json!("kitchen"));
    store.insert_object("/~vendor", json!({"serverVersion": "3.1.4"}));
    store.set_value(
        "/~vendor/diagnostics",
        json!({"Log": [["2026-10-18 10:00:00", "WARNING", "veap", "slow client"]]}),
    );
    store
}

pub fn context(store: &Arc<MemoryTransport>, config: VeapConfig) -> CliContext {
    CliContext::with_transport(config, store.clone()).unwrap()
}
