//! Tests for the `error` module.

use crate::error::Error;

#[test]
fn test_error_codes_are_stable() {
    assert_eq!(Error::Config("x".into()).code(), "GRN-001");
    assert_eq!(Error::CorruptData("x".into()).code(), "GRN-002");
    assert_eq!(Error::UnsupportedQuery("x".into()).code(), "GRN-003");
    assert_eq!(
        Error::DimensionMismatch {
            expected: 4,
            actual: 3
        }
        .code(),
        "GRN-004"
    );
}

#[test]
fn test_error_messages_carry_code_prefix() {
    let err = Error::DimensionMismatch {
        expected: 8,
        actual: 5,
    };
    let message = err.to_string();
    assert!(message.starts_with("[GRN-004]"), "{message}");
    assert!(message.contains("expected 8"), "{message}");
}

#[test]
fn test_recoverability() {
    assert!(Error::UnsupportedQuery("x".into()).is_recoverable());
    assert!(Error::Config("x".into()).is_recoverable());
    assert!(!Error::CorruptData("x".into()).is_recoverable());
    assert!(!Error::Internal("x".into()).is_recoverable());
}
