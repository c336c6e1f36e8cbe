use endolla::error::EndollaError;

#[test]
fn error_constructors_group_1() {
    assert!(matches!(
        EndollaError::config("x"),
        EndollaError::Config { .. }
    ));
    assert!(matches!(EndollaError::io("x"), EndollaError::Io { .. }));
    assert!(matches!(
        EndollaError::network("x"),
        EndollaError::Network { .. }
    ));
}

#[test]
fn error_constructors_group_2() {
    assert!(matches!(
        EndollaError::validation("f", "m"),
        EndollaError::Validation { .. }
    ));
    assert!(matches!(
        EndollaError::timeout("x"),
        EndollaError::Timeout { .. }
    ));
    assert!(matches!(
        EndollaError::http_status(502, "x"),
        EndollaError::HttpStatus { status: 502, .. }
    ));
    assert!(matches!(
        EndollaError::decode("x"),
        EndollaError::Decode { .. }
    ));
    assert!(matches!(
        EndollaError::not_found("x"),
        EndollaError::NotFound { .. }
    ));
}

#[test]
fn update_failures_are_retryable() {
    assert!(EndollaError::update_failed("Error fetching data: x").is_retryable());
    assert!(!EndollaError::config("x").is_retryable());
    assert!(!EndollaError::validation("f", "m").is_retryable());
}

#[test]
fn display_messages() {
    let e = EndollaError::update_failed("Error parsing JSON: EOF");
    let s = format!("{}", e);
    assert!(s.contains("Update failed"));
    assert!(s.contains("Error parsing JSON"));
}

#[test]
fn update_failure_keeps_its_cause() {
    let e = EndollaError::update_failed_from(
        "Error fetching data: HTTP 503",
        EndollaError::http_status(503, "unavailable"),
    );
    assert!(matches!(
        e.cause(),
        Some(EndollaError::HttpStatus { status: 503, .. })
    ));
    assert!(std::error::Error::source(&e).is_some());
    assert!(EndollaError::update_failed("x").cause().is_none());
}
