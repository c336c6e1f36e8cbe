use endolla::config::LoggingConfig;
use endolla::logging::{LogContext, get_station_logger, init_logging, parse_log_level};
use tracing::Level;

#[test]
fn init_logging_is_idempotent() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let config = LoggingConfig {
        file: tmp_dir.path().join("endolla.log").to_string_lossy().to_string(),
        console_output: false,
        ..LoggingConfig::default()
    };
    assert!(init_logging(&config).is_ok());
    assert!(init_logging(&config).is_ok());

    let logger = get_station_logger("coordinator", "5091");
    logger.info("logging initialized twice without error");
}

#[test]
fn log_levels_parse_case_insensitively() {
    assert_eq!(parse_log_level("trace").unwrap(), Level::TRACE);
    assert_eq!(parse_log_level("Warning").unwrap(), Level::WARN);
    assert_eq!(parse_log_level("ERROR").unwrap(), Level::ERROR);
    assert!(parse_log_level("verbose").is_err());
}

#[test]
fn context_carries_station() {
    let context = LogContext::new("projection").with_station_id("S1");
    assert_eq!(context.component, "projection");
    assert_eq!(context.station_id.as_deref(), Some("S1"));
    assert!(context.extra_fields.is_empty());
}
