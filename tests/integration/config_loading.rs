use clap::Parser;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use veap_watch::config::ConfigLoader;
use veap_watch::tooling::cli::Cli;
use veap_watch::ClientError;

use crate::support::with_env;

#[test]
fn defaults_without_files() {
    let temp_dir = TempDir::new().unwrap();
    let config = with_env(&temp_dir, &[], ConfigLoader::load).unwrap();
    assert_eq!(config.server.url, "http://127.0.0.1:2121");
    assert_eq!(config.server.timeout(), Duration::from_secs(5));
    assert_eq!(config.polling.cycle(), Duration::from_millis(400));
    assert_eq!(config.polling.watch_cycle(), Duration::from_millis(400));
    assert_eq!(config.logging.output, "stderr");
    assert!(config.watch.is_empty());
}

#[test]
fn explicit_file_overrides_global_file() {
    let temp_dir = TempDir::new().unwrap();
    let global_dir = temp_dir.path().join("config").join("veap-watch");
    fs::create_dir_all(&global_dir).unwrap();
    fs::write(
        global_dir.join("config.toml"),
        r#"
[server]
url = "http://global:2121"
timeout_ms = 1000

[polling]
cycle_ms = 250
"#,
    )
    .unwrap();

    let explicit = temp_dir.path().join("local.toml");
    fs::write(
        &explicit,
        r#"
[server]
url = "https://local:2122"

[[watch]]
name = "Temp"
address = "/device/ABC123/1/TEMPERATURE"

[[watch]]
address = "/device/ABC123/1/STATE"
"#,
    )
    .unwrap();

    let config = with_env(&temp_dir, &[], || ConfigLoader::load_from_file(&explicit)).unwrap();
    assert_eq!(config.server.url, "https://local:2122");
    assert_eq!(config.server.timeout_ms, 1000);
    assert_eq!(config.polling.cycle_ms, 250);
    assert_eq!(config.polling.watch_cycle_ms, 400);
    assert_eq!(config.watch.len(), 2);
    assert_eq!(config.watch[0].display_name(), "Temp");
    assert_eq!(config.watch[1].display_name(), "/device/ABC123/1/STATE");
}

#[test]
fn environment_overrides_files() {
    let temp_dir = TempDir::new().unwrap();
    let explicit = temp_dir.path().join("local.toml");
    fs::write(&explicit, "[polling]\nwatch_cycle_ms = 900\n").unwrap();

    let config = with_env(
        &temp_dir,
        &[
            ("VEAP_WATCH__POLLING__WATCH_CYCLE_MS", "150"),
            ("VEAP_WATCH__SERVER__URL", "http://env:2121"),
        ],
        || ConfigLoader::load_from_file(&explicit),
    )
    .unwrap();
    assert_eq!(config.polling.watch_cycle_ms, 150);
    assert_eq!(config.server.url, "http://env:2121");
}

#[test]
fn invalid_values_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let explicit = temp_dir.path().join("bad.toml");
    fs::write(
        &explicit,
        "[server]\nurl = \"ftp://host\"\n\n[polling]\ncycle_ms = 0\n",
    )
    .unwrap();

    let err = with_env(&temp_dir, &[], || ConfigLoader::load_from_file(&explicit)).unwrap_err();
    match err {
        ClientError::Config(message) => {
            assert!(message.contains("server.url"), "{}", message);
            assert!(message.contains("polling.cycle_ms"), "{}", message);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn missing_explicit_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.toml");
    let err = with_env(&temp_dir, &[], || ConfigLoader::load_from_file(&missing)).unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
}

#[test]
fn log_flags_beat_log_environment() {
    let temp_dir = TempDir::new().unwrap();
    let cli = Cli::parse_from(["veap-watch", "--log-format", "json", "info"]);
    let config = with_env(
        &temp_dir,
        &[
            ("VEAP_WATCH_LOG_FORMAT", "text"),
            ("VEAP_WATCH_LOG_OUTPUT", "both"),
        ],
        || cli.load_config(),
    )
    .unwrap();
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.logging.output, "both");
}
