use serde_json::{json, Value};
use veap_watch::config::{VeapConfig, WatchEntry};
use veap_watch::tooling::cli::Commands;
use veap_watch::transport::Method;
use veap_watch::ClientError;

use crate::support::{context, device_tree};

const TEMP: &str = "/device/ABC123/1/TEMPERATURE";

#[test]
fn clean_and_resolve_work_offline() {
    let store = device_tree();
    let cli = context(&store, VeapConfig::default());
    let cleaned = cli
        .execute(&Commands::Clean {
            path: "/a/./b/../c//".to_string(),
        })
        .unwrap();
    assert_eq!(cleaned, "/a/c");
    let resolved = cli
        .execute(&Commands::Resolve {
            base: "/device/ABC123".to_string(),
            path: "../XYZ".to_string(),
        })
        .unwrap();
    assert_eq!(resolved, "/device/XYZ");
    assert_eq!(store.request_count(), 0);
}

#[test]
fn browse_json_contract_has_required_fields() {
    let store = device_tree();
    let cli = context(&store, VeapConfig::default());
    let output = cli
        .execute(&Commands::Browse {
            address: "/device".to_string(),
            format: "json".to_string(),
        })
        .unwrap();

    let parsed: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["title"], json!("Devices"));
    assert_eq!(parsed["variable"], json!(false));
    let links = parsed["links"].as_array().unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0]["rel"], json!("parent"));
    assert_eq!(links[0]["target"], json!("/"));
    assert_eq!(links[1]["target"], json!("/device/ABC123"));
}

#[test]
fn browse_hides_service_links() {
    let store = device_tree();
    let cli = context(&store, VeapConfig::default());
    let output = cli
        .execute(&Commands::Browse {
            address: "/".to_string(),
            format: "json".to_string(),
        })
        .unwrap();
    let parsed: Value = serde_json::from_str(&output).unwrap();
    let links = parsed["links"].as_array().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["href"], json!("device"));

    let text = cli
        .execute(&Commands::Browse {
            address: TEMP.to_string(),
            format: "text".to_string(),
        })
        .unwrap();
    assert!(text.contains("Variable: yes"));
    assert!(text.contains("FLOAT"));
    assert!(!text.contains("~pv"));
}

#[test]
fn browse_unknown_node_reports_status() {
    let store = device_tree();
    let cli = context(&store, VeapConfig::default());
    let err = cli
        .execute(&Commands::Browse {
            address: "/nowhere".to_string(),
            format: "text".to_string(),
        })
        .unwrap_err();
    assert_eq!(err.code(), Some(404));
}

#[test]
fn read_json_contract() {
    let store = device_tree();
    let cli = context(&store, VeapConfig::default());
    let output = cli
        .execute(&Commands::Read {
            address: TEMP.to_string(),
            format: "json".to_string(),
        })
        .unwrap();
    let parsed: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["value"], json!(21.5));
    assert_eq!(parsed["quality"], json!(0));
    assert!(parsed["timestamp"].as_str().is_some());
}

#[test]
fn write_converts_to_current_type() {
    let store = device_tree();
    let cli = context(&store, VeapConfig::default());

    let output = cli
        .execute(&Commands::Write {
            address: TEMP.to_string(),
            value: "22,5".to_string(),
        })
        .unwrap();
    assert_eq!(output, format!("Wrote 22.5 to {}", TEMP));
    assert_eq!(store.value(TEMP).unwrap().value, json!(22.5));

    cli.execute(&Commands::Write {
        address: "/device/ABC123/1/STATE".to_string(),
        value: "on".to_string(),
    })
    .unwrap();
    assert_eq!(
        store.value("/device/ABC123/1/STATE").unwrap().value,
        json!(true)
    );

    let err = cli
        .execute(&Commands::Write {
            address: "/device/ABC123/1/STATE".to_string(),
            value: "maybe".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidValue(_)));
}

#[test]
fn monitor_emits_requested_updates() {
    let store = device_tree();
    let cli = context(&store, VeapConfig::default());
    let mut frames = Vec::new();
    cli.execute_streaming(
        &Commands::Monitor {
            address: TEMP.to_string(),
            cycle_ms: Some(10),
            updates: Some(2),
            format: "json".to_string(),
        },
        &mut |frame: &str| frames.push(frame.to_string()),
    )
    .unwrap();

    assert_eq!(frames.len(), 2);
    let first: Value = serde_json::from_str(&frames[0]).unwrap();
    assert_eq!(first["pv"]["value"], json!(21.5));
    assert_eq!(first["changed"], json!(false));
}

#[test]
fn watch_adds_configured_entries_first() {
    let store = device_tree();
    let mut config = VeapConfig::default();
    config.watch = vec![WatchEntry {
        name: Some("Label".to_string()),
        address: "/device/ABC123/1/LABEL".to_string(),
    }];
    let cli = context(&store, config);

    let mut frames = Vec::new();
    cli.execute_streaming(
        &Commands::Watch {
            points: vec![format!("Temp={}", TEMP), "/device/ABC123/1/MISSING".to_string()],
            cycle_ms: Some(10),
            cycles: Some(1),
            format: "json".to_string(),
        },
        &mut |frame: &str| frames.push(frame.to_string()),
    )
    .unwrap();

    assert_eq!(frames.len(), 1);
    let rows: Vec<Value> = serde_json::from_str(&frames[0]).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["name"], json!("Label"));
    assert_eq!(rows[0]["pv"]["value"], json!("kitchen"));
    assert_eq!(rows[1]["name"], json!("Temp"));
    assert_eq!(rows[1]["pv"]["value"], json!(21.5));
    assert!(rows[2]["pv"].is_null());
    assert!(rows[2]["error"].as_str().unwrap().contains("404"));

    let batch = store
        .requests()
        .into_iter()
        .find(|r| r.path == "/~exgdata")
        .unwrap();
    assert_eq!(batch.body.unwrap()["readPaths"][0], json!("/device/ABC123/1/LABEL"));
}

#[test]
fn watch_rejects_duplicate_points() {
    let store = device_tree();
    let cli = context(&store, VeapConfig::default());
    let err = cli
        .execute(&Commands::Watch {
            points: vec![TEMP.to_string(), format!("Again={}", TEMP)],
            cycle_ms: None,
            cycles: Some(1),
            format: "text".to_string(),
        })
        .unwrap_err();
    assert_eq!(err, ClientError::AlreadyWatched(TEMP.to_string()));
}

#[test]
fn watch_without_points_reports_empty_list() {
    let store = device_tree();
    let cli = context(&store, VeapConfig::default());
    let output = cli
        .execute(&Commands::Watch {
            points: Vec::new(),
            cycle_ms: None,
            cycles: None,
            format: "text".to_string(),
        })
        .unwrap();
    assert_eq!(output, "No data points watched.\n");
}

#[test]
fn info_and_diagnostics() {
    let store = device_tree();
    let cli = context(&store, VeapConfig::default());
    let info = cli.execute(&Commands::Info).unwrap();
    assert!(info.contains("Version: 3.1.4"));

    let log = cli.execute(&Commands::Diagnostics).unwrap();
    assert!(log.contains("slow client"));
    assert!(log.contains("veap"));
}

#[test]
fn config_command_renders_toml() {
    let store = device_tree();
    let cli = context(&store, VeapConfig::default());
    let output = cli.execute(&Commands::Config).unwrap();
    let parsed: VeapConfig = toml::from_str(&output).unwrap();
    assert_eq!(&parsed, cli.config());
}

#[test]
fn refresh_triggers_server_reload() {
    let store = device_tree();
    let cli = context(&store, VeapConfig::default());
    let output = cli.execute(&Commands::Refresh).unwrap();
    assert_eq!(output, "Refresh requested");
    let request = store.requests().pop().unwrap();
    assert_eq!(request.method, Method::Put);
    assert_eq!(request.path, "/~vendor/refresh/~pv");
    assert_eq!(request.body, Some(json!({"v": true})));

    store.fail("/~vendor/refresh/~pv", ClientError::protocol(403, None));
    let err = cli.execute(&Commands::Refresh).unwrap_err();
    assert_eq!(err.to_string(), "VEAP status: Access denied (403)");
}

#[test]
fn zero_stop_counts_are_rejected() {
    let store = device_tree();
    let cli = context(&store, VeapConfig::default());
    let mut frames = Vec::new();
    let err = cli
        .execute_streaming(
            &Commands::Monitor {
                address: TEMP.to_string(),
                cycle_ms: Some(10),
                updates: Some(0),
                format: "text".to_string(),
            },
            &mut |frame: &str| frames.push(frame.to_string()),
        )
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidValue(_)));

    let err = cli
        .execute(&Commands::Watch {
            points: vec![TEMP.to_string()],
            cycle_ms: Some(10),
            cycles: Some(0),
            format: "text".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidValue(_)));
    assert!(frames.is_empty());
    assert_eq!(store.request_count(), 0);
}
