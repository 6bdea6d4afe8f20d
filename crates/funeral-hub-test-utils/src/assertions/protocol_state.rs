//! Assertion utilities for validating protocol states.

use funeral_hub_core::{BurialStatus, CoreError, DocumentationStatus, Protocol, ProtocolStatus};
use thiserror::Error;

/// Error type for protocol state validation failures
#[derive(Debug, Error)]
pub enum ProtocolStateError {
    #[error("Invalid {field}: expected {expected}, got {actual}")]
    Mismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },

    #[error("Expected error kind {expected}, got {actual}")]
    WrongErrorKind { expected: String, actual: String },

    #[error("Expected an error of kind {0}, but the call succeeded")]
    UnexpectedSuccess(String),
}

fn check<T: PartialEq + std::fmt::Display>(
    field: &'static str,
    expected: T,
    actual: T,
) -> Result<(), ProtocolStateError> {
    if expected != actual {
        return Err(ProtocolStateError::Mismatch {
            field,
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Asserts the primary state and both sub-states of a protocol
pub fn assert_protocol_state(
    protocol: &Protocol,
    status: ProtocolStatus,
    burial: BurialStatus,
    documentation: DocumentationStatus,
) -> Result<(), ProtocolStateError> {
    check("status", status, protocol.status)?;
    check("burial_status", burial, protocol.burial_status)?;
    check("documentation_status", documentation, protocol.documentation_status)
}

/// Asserts that `result` failed with the given [`CoreError::kind`]
pub fn assert_error_kind<T>(
    result: &Result<T, CoreError>,
    expected: &str,
) -> Result<(), ProtocolStateError> {
    match result {
        Ok(_) => Err(ProtocolStateError::UnexpectedSuccess(expected.to_string())),
        Err(err) if err.kind() == expected => Ok(()),
        Err(err) => Err(ProtocolStateError::WrongErrorKind {
            expected: expected.to_string(),
            actual: format!("{} ({})", err.kind(), err),
        }),
    }
}
