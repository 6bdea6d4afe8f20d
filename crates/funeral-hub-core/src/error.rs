use thiserror::Error;

/// Core error type for the Funeral Hub workflow engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Protocol (or another addressed record) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Actor role does not match the action, or actor is not bound to the protocol
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Current primary state or sub-state does not allow the action
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Action payload is missing or malformed
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// A business cap (such as the draft rejection limit) has been reached
    #[error("Business limit exceeded: {0}")]
    BusinessLimitExceeded(String),

    /// Lock wait exhausted while another transition held the protocol
    #[error("Contention: {0}")]
    Contention(String),

    /// Actor token could not be resolved by the identity provider
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unexpected persistence or infrastructure failure
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Message shown to callers instead of the detail of an internal failure
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal error while processing the protocol.";

impl CoreError {
    /// Whether a caller may retry the same request automatically.
    ///
    /// Only lock contention qualifies; every other error needs a corrected request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Contention(_))
    }

    /// Human-readable reason safe to surface to the caller.
    ///
    /// Internal failures are reduced to a generic message; their detail is
    /// only ever written to the logs.
    pub fn public_message(&self) -> String {
        match self {
            CoreError::Internal(_) | CoreError::Configuration(_) => {
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }

    /// Stable machine-readable kind, used for structured logging
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "not_found",
            CoreError::Forbidden(_) => "forbidden",
            CoreError::InvalidTransition(_) => "invalid_transition",
            CoreError::InvalidPayload(_) => "invalid_payload",
            CoreError::BusinessLimitExceeded(_) => "business_limit_exceeded",
            CoreError::Contention(_) => "contention",
            CoreError::Unauthenticated(_) => "unauthenticated",
            CoreError::Configuration(_) => "configuration",
            CoreError::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Internal(format!("Serialization failure: {}", err))
    }
}
