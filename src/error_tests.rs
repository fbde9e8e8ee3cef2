//! Tests for `error` module

use super::error::*;

// -------------------------------------------------------------------------
// Display tests
// -------------------------------------------------------------------------

#[test]
fn test_dimension_mismatch_display() {
    // Arrange
    let err = Error::DimensionMismatch {
        expected: 768,
        actual: 512,
    };

    // Act
    let display = format!("{err}");

    // Assert
    assert!(display.contains("768"));
    assert!(display.contains("512"));
}

#[test]
fn test_invalid_k_display() {
    // Arrange
    let err = Error::InvalidK(0);

    // Act
    let display = format!("{err}");

    // Assert
    assert!(display.contains('0'));
}

#[test]
fn test_not_found_display() {
    // Arrange
    let err = Error::NotFound(42);

    // Act
    let display = format!("{err}");

    // Assert
    assert!(display.contains("42"));
}

// -------------------------------------------------------------------------
// Conversion tests
// -------------------------------------------------------------------------

#[test]
fn test_from_io_error() {
    // Arrange
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");

    // Act
    let err: Error = io_err.into();

    // Assert
    assert!(matches!(err, Error::Io(_)));
    assert!(format!("{err}").contains("file not found"));
}

// -------------------------------------------------------------------------
// Recoverable tests
// -------------------------------------------------------------------------

#[test]
fn test_recoverable_errors() {
    // These errors are recoverable (user can fix and retry)
    assert!(Error::NotFound(1).is_recoverable());
    assert!(Error::DimensionMismatch {
        expected: 768,
        actual: 512
    }
    .is_recoverable());
    assert!(Error::InvalidK(0).is_recoverable());
    assert!(Error::InvalidConfig("bad".into()).is_recoverable());
}

#[test]
fn test_non_recoverable_errors() {
    // These errors indicate the on-disk state needs to be rebuilt
    assert!(!Error::StoreCorruption("bad record".into()).is_recoverable());
    assert!(!Error::GraphCorruption("bad magic".into()).is_recoverable());
    assert!(!Error::IvfCorruption("bad magic".into()).is_recoverable());
}

// -------------------------------------------------------------------------
// Trait object tests
// -------------------------------------------------------------------------

#[test]
fn test_error_is_send_sync() {
    // Required for threaded contexts
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Error>();
}

#[test]
fn test_error_debug_impl() {
    // Debug should be available for logging
    let err = Error::StoreCorruption("bad length prefix".into());
    let debug = format!("{err:?}");
    assert!(debug.contains("StoreCorruption"));
    assert!(debug.contains("bad length prefix"));
}
