//! Integration tests for loading the adapter's JSON configuration.

use rl4net_framework::prelude::config::{
    ConfigError, EnvConfigBuildParams, EnvConfigBuilder, EnvConfigLoader, TerminationSignal,
};
use rl4net_framework::prelude::PayloadMode;
use rl4net_framework::utilities::configuration::get_or_create_env_config_json_path;

use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn missing_file_is_created_with_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("omnet_env_config.json");
    assert!(!config_path.exists());

    let resolved = get_or_create_env_config_json_path(config_path.clone()).unwrap();
    assert_eq!(resolved, config_path);
    assert!(config_path.exists());

    let config = EnvConfigLoader::new_config(Some(config_path)).unwrap();
    assert_eq!(config, EnvConfigBuilder::build_default());
}

#[test]
fn loads_every_section() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("env.json");
    let content = json!({
        "environment_config": {
            "expected_link_count": 12,
            "payload_mode": "structured"
        },
        "channel_config": {
            "address": { "prefix": "tcp://", "host": "127.0.0.1", "port": "6000" },
            "receive_timeout_ms": null,
            "bind_retry": {
                "max_attempts": 2,
                "initial_delay_ms": 10,
                "max_delay_ms": 20,
                "backoff_multiplier": 1.5
            }
        },
        "simulator_config": {
            "program": "opp_run_release",
            "args": ["-u", "Cmdenv", "omnetpp.ini"],
            "working_directory": "/opt/simulations",
            "log_file": "logs/out.inet",
            "termination_signal": "SIGUSR1",
            "stray_process_names": ["opp_run_release"],
            "name_kill_command": ["killall"]
        }
    });
    fs::write(&config_path, serde_json::to_string_pretty(&content).unwrap()).unwrap();

    let config = EnvConfigLoader::load_config(&config_path).unwrap();
    config.validate().unwrap();

    let environment = config.get_environment_config();
    assert_eq!(environment.expected_link_count, 12);
    assert_eq!(environment.payload_mode, PayloadMode::Structured);

    let channel = config.get_channel_config();
    assert_eq!(channel.address.port, "6000");
    assert_eq!(channel.receive_timeout_ms, None);
    assert_eq!(channel.bind_retry.max_attempts, 2);

    let simulator = config.get_simulator_config();
    assert_eq!(simulator.args.len(), 3);
    assert_eq!(
        simulator.working_directory,
        Some(PathBuf::from("/opt/simulations"))
    );
    assert_eq!(simulator.termination_signal, TerminationSignal::User1);
    assert_eq!(simulator.name_kill_command, vec!["killall".to_string()]);
}

#[test]
fn unreadable_and_malformed_files() {
    let temp_dir = TempDir::new().unwrap();

    let missing = temp_dir.path().join("missing.json");
    assert!(matches!(
        EnvConfigLoader::load_config(&missing),
        Err(ConfigError::Io { .. })
    ));

    let malformed = temp_dir.path().join("malformed.json");
    fs::write(&malformed, "{ \"environment_config\": ").unwrap();
    assert!(matches!(
        EnvConfigLoader::load_config(&malformed),
        Err(ConfigError::Parse { .. })
    ));

    let bad_mode = temp_dir.path().join("bad_mode.json");
    fs::write(
        &bad_mode,
        r#"{ "environment_config": { "expected_link_count": 2, "payload_mode": "binary" } }"#,
    )
    .unwrap();
    assert!(matches!(
        EnvConfigLoader::load_config(&bad_mode),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn saved_configuration_loads_back() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("saved.json");

    let config = EnvConfigBuilder::new()
        .set_expected_link_count(8)
        .set_payload_mode(PayloadMode::Structured)
        .build();
    config.save_config(&config_path).unwrap();

    assert_eq!(EnvConfigLoader::load_config(&config_path).unwrap(), config);
}
