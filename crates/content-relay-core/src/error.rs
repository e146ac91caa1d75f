//! Error taxonomy shared by every component that talks to the remote service.
//!
//! Empty results and budget-gated payloads are not errors; they are modeled
//! as ordinary values ([`crate::synthesis::SynthesisOutcome::NoSources`],
//! [`crate::budget::ContentRelease::RequiresConfirmation`]).

use serde_json::Value;
use thiserror::Error;

/// Result alias used throughout the core crate.
pub type RelayResult<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Clone, Error)]
pub enum RelayError {
    /// The bearer credential was rejected (HTTP 401). Fatal for the session.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Any other non-2xx response from the remote service.
    #[error("backend error {status}: {message}")]
    Backend { status: u16, message: String },

    /// The request never produced a response (connect failure, timeout, bad body).
    #[error("transport error: {0}")]
    Transport(String),

    /// A backend record could not be normalized into the canonical model.
    #[error("schema violation: {reason} (raw payload: {raw})")]
    SchemaViolation { reason: String, raw: Value },

    /// The caller supplied something the core cannot act on.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RelayError {
    pub fn schema(reason: impl Into<String>, raw: &Value) -> Self {
        RelayError::SchemaViolation {
            reason: reason.into(),
            raw: raw.clone(),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, RelayError::Auth(_))
    }

    /// Whether a fallback tier may be attempted after this failure.
    ///
    /// Auth failures and caller mistakes are never retried against another
    /// surface; schema violations are surfaced for diagnosis.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RelayError::Backend { .. } | RelayError::Transport(_))
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RelayError::Auth(_) => Some(401),
            RelayError::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recoverable_classification() {
        assert!(RelayError::Backend {
            status: 503,
            message: "down".into()
        }
        .is_recoverable());
        assert!(RelayError::Transport("timed out".into()).is_recoverable());
        assert!(!RelayError::Auth("expired".into()).is_recoverable());
        assert!(!RelayError::schema("bad", &json!(1)).is_recoverable());
    }

    #[test]
    fn test_schema_violation_carries_payload() {
        let err = RelayError::schema("id must be a string", &json!({"id": [1]}));
        let msg = err.to_string();
        assert!(msg.contains("id must be a string"));
        assert!(msg.contains("[1]"));
    }
}
