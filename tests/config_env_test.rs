//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides. Note that Config::from_env() also loads
//! from .env file via dotenvy, so these tests focus on override behavior.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use serial_test::serial;
use std::env;
use veracity::config::{Config, LogFormat};

#[test]
#[serial]
fn test_config_from_env_loads_successfully() {
    // No variable is required; every knob has a default
    let result = Config::from_env();
    assert!(
        result.is_ok(),
        "Config::from_env() should succeed without overrides"
    );
}

#[test]
#[serial]
fn test_config_from_env_custom_session() {
    env::set_var("VERACITY_MAX_SESSIONS", "25");
    env::set_var("VERACITY_SESSION_TIMEOUT_MS", "60000");

    let config = Config::from_env().unwrap();
    assert_eq!(config.session.max_sessions, 25);
    assert_eq!(config.session.session_timeout_ms, 60000);

    // Cleanup
    env::remove_var("VERACITY_MAX_SESSIONS");
    env::remove_var("VERACITY_SESSION_TIMEOUT_MS");
}

#[test]
#[serial]
fn test_config_from_env_custom_decompose() {
    env::set_var("VERACITY_MAX_TASKS", "12");
    env::set_var("VERACITY_DROP_THRESHOLD", "0.5");

    let config = Config::from_env().unwrap();
    assert_eq!(config.decompose.max_tasks, 12);
    assert_eq!(config.decompose.drop_threshold, 0.5);

    // Cleanup
    env::remove_var("VERACITY_MAX_TASKS");
    env::remove_var("VERACITY_DROP_THRESHOLD");
}

#[test]
#[serial]
fn test_config_from_env_disabled_stages() {
    // Mixed case, stray spaces, and an empty entry are all tolerated
    env::set_var("VERACITY_STAGES_DISABLED", "verify, Ensemble,,reason ");

    let config = Config::from_env().unwrap();
    assert_eq!(
        config.pipeline.disabled_stages,
        vec!["verify", "ensemble", "reason"]
    );

    // Cleanup
    env::remove_var("VERACITY_STAGES_DISABLED");
}

#[test]
#[serial]
fn test_config_from_env_custom_termination() {
    env::set_var("VERACITY_MAX_PROCESSING_TIME_MS", "60000");
    env::set_var("VERACITY_TASK_TIMEOUT_MS", "2000");
    env::set_var("VERACITY_MAX_TASKS_PROCESSED", "30");
    env::set_var("VERACITY_MAX_PROCESSING_STEPS", "500");
    env::set_var("VERACITY_SUFFICIENCY_THRESHOLD", "0.9");

    let config = Config::from_env().unwrap();
    assert_eq!(config.termination.max_processing_time_ms, 60000);
    assert_eq!(config.termination.task_timeout_ms, 2000);
    assert_eq!(config.termination.max_tasks_processed, 30);
    assert_eq!(config.termination.max_processing_steps, 500);
    assert_eq!(config.termination.sufficiency_threshold, 0.9);

    // Cleanup
    env::remove_var("VERACITY_MAX_PROCESSING_TIME_MS");
    env::remove_var("VERACITY_TASK_TIMEOUT_MS");
    env::remove_var("VERACITY_MAX_TASKS_PROCESSED");
    env::remove_var("VERACITY_MAX_PROCESSING_STEPS");
    env::remove_var("VERACITY_SUFFICIENCY_THRESHOLD");
}

#[test]
#[serial]
fn test_config_from_env_custom_ensemble() {
    env::set_var("VERACITY_ENSEMBLE_MAX_CANDIDATES", "5");
    env::set_var("VERACITY_ENSEMBLE_QUALITY_WEIGHT", "0.6");
    env::set_var("VERACITY_ENSEMBLE_DIVERSITY_WEIGHT", "0.4");

    let config = Config::from_env().unwrap();
    assert_eq!(config.ensemble.max_candidates, 5);
    assert_eq!(config.ensemble.quality_weight, 0.6);
    assert_eq!(config.ensemble.diversity_weight, 0.4);

    // Cleanup
    env::remove_var("VERACITY_ENSEMBLE_MAX_CANDIDATES");
    env::remove_var("VERACITY_ENSEMBLE_QUALITY_WEIGHT");
    env::remove_var("VERACITY_ENSEMBLE_DIVERSITY_WEIGHT");
}

#[test]
#[serial]
fn test_config_from_env_json_log_format() {
    env::set_var("LOG_FORMAT", "json");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);

    // Restore default
    env::set_var("LOG_FORMAT", "pretty");
}

#[test]
#[serial]
fn test_config_from_env_log_level() {
    env::set_var("LOG_LEVEL", "debug");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.level, "debug");

    // Restore default
    env::set_var("LOG_LEVEL", "info");
}

#[test]
#[serial]
fn test_config_invalid_number_uses_default() {
    env::set_var("VERACITY_MAX_TASKS", "not-a-number");

    let config = Config::from_env().unwrap();
    // Should fall back to default
    assert_eq!(config.decompose.max_tasks, 8);

    // Cleanup
    env::remove_var("VERACITY_MAX_TASKS");
}

#[test]
#[serial]
fn test_config_rejects_out_of_range_threshold() {
    env::set_var("VERACITY_DROP_THRESHOLD", "1.5");

    let result = Config::from_env();
    assert!(result.is_err());
    let message = result.unwrap_err().to_string();
    assert!(
        message.contains("VERACITY_DROP_THRESHOLD"),
        "error should name the offending variable: {message}"
    );

    // Cleanup
    env::remove_var("VERACITY_DROP_THRESHOLD");
}

#[test]
#[serial]
fn test_config_rejects_zero_sessions() {
    env::set_var("VERACITY_MAX_SESSIONS", "0");

    let result = Config::from_env();
    assert!(result.is_err());

    // Cleanup
    env::remove_var("VERACITY_MAX_SESSIONS");
}

#[test]
#[serial]
fn test_config_default_validates() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.session.max_sessions, 10);
    assert_eq!(config.decompose.max_tasks, 8);
    assert_eq!(config.termination.max_processing_time_ms, 30_000);
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
#[serial]
fn test_config_rejects_zero_ensemble_weights() {
    let mut config = Config::default();
    config.ensemble.quality_weight = 0.0;
    config.ensemble.diversity_weight = 0.0;

    let result = config.validate();
    assert!(result.is_err());
}
