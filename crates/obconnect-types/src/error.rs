//! Error types for obconnect
//!
//! One taxonomy for the whole connector. Bank-side errors carry enough
//! context (bank profile, attempted operation, the bank's own error payload)
//! to be actionable without re-deriving network state. The core never
//! retries; retry policy belongs to callers, and idempotency keys are minted
//! fresh per call.

use thiserror::Error;

use crate::consent::ConsentState;

/// Result type for connector operations
pub type ConnectorResult<T> = std::result::Result<T, ConnectorError>;

/// Connector error types
#[derive(Debug, Clone, Error)]
pub enum ConnectorError {
    // ========================================================================
    // Lookup Errors
    // ========================================================================

    /// Bank profile identifier is not in the profile registry
    #[error("Unknown bank profile: {profile_id}")]
    UnknownProfile { profile_id: String },

    /// Entity does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================

    /// Operation is not allowed from the consent's current state
    #[error("Operation {operation} not allowed for consent {consent_id} in state {state}")]
    InvalidState {
        consent_id: String,
        state: ConsentState,
        operation: String,
    },

    // ========================================================================
    // Signing Errors
    // ========================================================================

    /// Signing key is malformed or the signature operation failed
    #[error("Signing failed: {detail}")]
    SigningError { detail: String },

    /// Payload could not be serialized to JSON
    #[error("Encoding failed: {detail}")]
    EncodingError { detail: String },

    // ========================================================================
    // External API Errors
    // ========================================================================

    /// Transport-level failure (DNS, TLS, connect, timeout). Retryable by
    /// caller policy; never retried inside the connector.
    #[error("Transport failure (timed out: {timed_out}): {detail}")]
    Transport { timed_out: bool, detail: String },

    /// The bank rejected the call with a parseable error body
    #[error("Bank API error from {profile} during {operation}: {http_status} {code}: {message}")]
    BankApi {
        http_status: u16,
        code: String,
        message: String,
        profile: String,
        operation: String,
    },

    /// Non-2xx response whose body could not be parsed as a bank error
    #[error("Unexpected response (HTTP {http_status}): {detail}")]
    UnexpectedResponse { http_status: u16, detail: String },

    /// 2xx response whose body violates the expected response shape. Fatal,
    /// never retried.
    #[error("Bank response violates expected contract: {detail}")]
    ContractViolation { detail: String },

    // ========================================================================
    // Registration Errors
    // ========================================================================

    /// Concurrent registration attempt for one registration group. Resolved
    /// by waiting on the in-flight registration; never surfaced on the
    /// non-racing path.
    #[error("Registration already in flight for group {group}")]
    RegistrationConflict { group: String },

    // ========================================================================
    // Configuration Errors
    // ========================================================================

    /// Software statement failed validation on load
    #[error("Invalid software statement field {field}: {reason}")]
    InvalidSoftwareStatement { field: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {detail}")]
    Config { detail: String },
}

impl ConnectorError {
    /// Whether a caller may reasonably retry the failed operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Create a not-found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a transport error
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport {
            timed_out: false,
            detail: detail.into(),
        }
    }

    /// Create a transport timeout error
    pub fn transport_timeout(detail: impl Into<String>) -> Self {
        Self::Transport {
            timed_out: true,
            detail: detail.into(),
        }
    }

    /// Create a signing error
    pub fn signing(detail: impl Into<String>) -> Self {
        Self::SigningError {
            detail: detail.into(),
        }
    }

    /// Create an encoding error
    pub fn encoding(detail: impl Into<String>) -> Self {
        Self::EncodingError {
            detail: detail.into(),
        }
    }

    /// Create a contract violation error
    pub fn contract_violation(detail: impl Into<String>) -> Self {
        Self::ContractViolation {
            detail: detail.into(),
        }
    }

    /// Create a configuration error
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }
}

impl From<serde_json::Error> for ConnectorError {
    fn from(err: serde_json::Error) -> Self {
        Self::encoding(err.to_string())
    }
}
