//! # Configuration Tests
//!
//! Defaults, JSON deserialization, and validation.

use std::sync::Arc;

use hostirq_core::Controller;
use hostirq_core::common::ConfigError;
use hostirq_core::config::*;
use hostirq_core::host::NoopHost;
use rstest::rstest;

#[test]
fn test_config_default() {
    let config = ControllerConfig::default();
    assert_eq!(config.nr_lines, 64);
    assert_eq!(config.backend, PendingBackend::Auto);
    assert_eq!(config.resource_failure, ResourceFailurePolicy::Surface);
    assert!(config.validate().is_ok());
}

#[test]
fn test_empty_json_uses_defaults() {
    let config = ControllerConfig::from_json("{}").unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(config, ControllerConfig::default());
}

#[test]
fn test_json_deserialization() {
    let json = r#"{
        "nr_lines": 32,
        "backend": "Locked",
        "resource_failure": "Ignore"
    }"#;
    let config = ControllerConfig::from_json(json).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(config.nr_lines, 32);
    assert_eq!(config.backend, PendingBackend::Locked);
    assert_eq!(config.resource_failure, ResourceFailurePolicy::Ignore);
}

#[test]
fn test_backend_alias() {
    let config =
        ControllerConfig::from_json(r#"{ "backend": "Mutex" }"#).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(config.backend, PendingBackend::Locked);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(65)]
#[case(1024)]
fn test_line_count_out_of_range(#[case] nr_lines: u32) {
    let json = format!(r#"{{ "nr_lines": {nr_lines} }}"#);
    assert!(matches!(
        ControllerConfig::from_json(&json),
        Err(ConfigError::LineCount(n)) if n == nr_lines
    ));
}

#[test]
fn test_malformed_json() {
    assert!(matches!(
        ControllerConfig::from_json(r#"{ "backend": "Quantum" }"#),
        Err(ConfigError::Json(_))
    ));
    assert!(matches!(
        ControllerConfig::from_json("nr_lines = 8"),
        Err(ConfigError::Json(_))
    ));
}

#[test]
fn test_controller_rejects_invalid_config() {
    let config = ControllerConfig {
        nr_lines: 1,
        ..ControllerConfig::default()
    };
    assert!(matches!(
        Controller::new(config, Arc::new(NoopHost)),
        Err(ConfigError::LineCount(1))
    ));
}

#[test]
fn test_explicit_backends_resolve_to_themselves() {
    for backend in [PendingBackend::Atomic, PendingBackend::Locked] {
        let config = ControllerConfig {
            backend,
            ..ControllerConfig::default()
        };
        assert_eq!(config.resolved_backend(), backend);
    }
}

#[cfg(target_has_atomic = "64")]
#[test]
fn test_auto_backend_prefers_atomics() {
    assert_eq!(
        ControllerConfig::default().resolved_backend(),
        PendingBackend::Atomic
    );
}
