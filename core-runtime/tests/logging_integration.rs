//! Integration tests for the logging system

use bridge_traits::time::LogLevel;
use core_runtime::logging::{
    init_logging, redact_if_sensitive, redact_url, LogFormat, LoggingConfig,
};

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_pii_redaction(false)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.redact_pii);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}

#[test]
fn test_signed_stream_urls_are_redacted() {
    let url = "https://media.example.com/ep/42.mp3?X-Amz-Signature=deadbeef&X-Amz-Expires=900";
    let redacted = redact_url(url);

    assert!(redacted.starts_with("https://media.example.com/ep/42.mp3"));
    assert!(!redacted.contains("deadbeef"));
}

#[test]
fn test_credential_fields_are_redacted() {
    assert_eq!(redact_if_sensitive("authorization", "Bearer x"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("session_token", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("title", "Episode 42"), "Episode 42");
}

#[test]
fn test_second_initialization_fails() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Error);

    // The first call may already fail if another test in this binary won the race.
    let _ = init_logging(config.clone());
    assert!(init_logging(config).is_err());
}
