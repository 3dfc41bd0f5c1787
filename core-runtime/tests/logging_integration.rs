//! Integration tests for logging system

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};
use core_runtime::Error;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct RecordingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for RecordingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().push(entry);
        Ok(())
    }
}

// The global subscriber can be installed once per process, so everything that
// depends on it lives in this single test.
#[test]
fn test_global_logging_forwards_to_sink() {
    let sink = Arc::new(RecordingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Info)
        .with_logger_sink(sink.clone());

    init_logging(config).unwrap();

    tracing::info!(target: "core_playback::store", item_id = "ch-1", "Current item changed");
    tracing::debug!(target: "core_playback::store", "below the configured level");
    tracing::info!(target: "some_dependency", "not covered by the default filter");
    tracing::warn!(
        target: "core_api::client",
        authorization = "Token abc.def.ghi",
        "Request refused"
    );

    {
        let entries = sink.entries.lock();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "Current item changed");
        assert_eq!(entries[0].fields.get("item_id"), Some(&"ch-1".to_string()));
        assert_eq!(entries[1].level, LogLevel::Warn);
        assert_eq!(
            entries[1].fields.get("authorization"),
            Some(&"[REDACTED]".to_string())
        );
    }

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_pii_redaction_emails() {
    let redacted = redact_if_sensitive("email", "reader@example.com");
    assert!(redacted.starts_with('r'));
    assert!(!redacted.contains("example.com"));
}

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
