use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde_json::json;

use super::*;

// --- config.rs tests ---

#[test]
fn test_config_defaults() {
    let config = NodeConfig::default();

    assert!(!config.display_name.is_empty());
    assert_eq!(config.control_port, DEFAULT_CONTROL_PORT);
    assert_eq!(config.sync_port, DEFAULT_SYNC_PORT);
    assert_eq!(config.discovery_port, DEFAULT_DISCOVERY_PORT);
    assert_eq!(config.beacon_interval, Duration::from_secs(2));
    assert_eq!(config.sync_interval, Duration::from_millis(50));
    assert_eq!(config.dead_threshold, Duration::from_secs(10));
    assert_eq!(config.beacon_address, IpAddr::V4(Ipv4Addr::BROADCAST));
    assert_eq!(config.initial_role, Role::Slave);
    assert!(config.settings_path.is_none());
}

#[test]
fn test_config_builder() {
    let config = NodeConfig::builder()
        .display_name("wall-3")
        .control_port(9000)
        .sync_port(9001)
        .discovery_port(9002)
        .dead_threshold(Duration::from_secs(4))
        .role(Role::Master)
        .settings_path("/tmp/wall.json")
        .build();

    assert_eq!(config.display_name, "wall-3");
    assert_eq!(config.control_port, 9000);
    assert_eq!(config.dead_threshold, Duration::from_secs(4));
    assert!(config.initial_role.is_master());
    assert_eq!(
        config.settings_path,
        Some(std::path::PathBuf::from("/tmp/wall.json"))
    );
}

#[test]
fn test_peer_ports_fall_back_to_own() {
    let config = NodeConfig::builder().control_port(9000).sync_port(9001).build();
    assert_eq!(config.peer_control_port(), 9000);
    assert_eq!(config.peer_sync_port(), 9001);

    let config = NodeConfig::builder()
        .control_port(9000)
        .sync_port(9001)
        .peer_ports(9100, 9101)
        .build();
    assert_eq!(config.peer_control_port(), 9100);
    assert_eq!(config.peer_sync_port(), 9101);
}

#[test]
fn test_correction_tuning_defaults() {
    let tuning = CorrectionTuning::default();
    assert!((tuning.scrub_threshold_secs - 1.0).abs() < f64::EPSILON);
    assert!((tuning.flat_gain - 0.05).abs() < f64::EPSILON);
    assert!((tuning.proportional_gain - 0.75).abs() < f64::EPSILON);
    assert_eq!(tuning.window, Duration::from_secs(1));
}

// --- role.rs tests ---

#[test]
fn test_role_parse_and_display() {
    assert_eq!("master".parse::<Role>().unwrap(), Role::Master);
    assert_eq!("slave".parse::<Role>().unwrap(), Role::Slave);
    assert!("leader".parse::<Role>().is_err());
    assert_eq!(Role::Master.to_string(), "master");
}

// --- settings.rs tests ---

#[test]
fn test_settings_merge_known_keys() {
    let settings = Settings::default();
    let doc = json!({"volume": 0.25, "looping": true, "unrelated": "x"});

    let merged = settings.merged(doc.as_object().unwrap()).unwrap();
    assert!((merged.volume - 0.25).abs() < f32::EPSILON);
    assert!(merged.looping);
    assert!((merged.rate - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_settings_merge_rejects_wrong_type() {
    let settings = Settings::default();
    let doc = json!({"volume": "loud"});

    assert!(settings.merged(doc.as_object().unwrap()).is_err());
}

#[test]
fn test_settings_merge_clamps() {
    let doc = json!({"volume": 4.0, "rate": -1.0});
    let merged = Settings::default().merged(doc.as_object().unwrap()).unwrap();

    assert!((merged.volume - 1.0).abs() < f32::EPSILON);
    assert!((merged.rate - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_settings_recognizes() {
    assert!(Settings::recognizes(
        json!({"brightness": 0.5}).as_object().unwrap()
    ));
    assert!(!Settings::recognizes(json!({"foo": 1}).as_object().unwrap()));
}
