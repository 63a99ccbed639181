use sea_orm::DbErr;
use thiserror::Error;

/// Failures of the signing key ring. Verification itself never errors; these
/// only surface when keys are constructed or loaded.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("signing secret must be at least {min} bytes, got {got}")]
    KeyTooShort { min: usize, got: usize },

    #[error("signing secret is not valid hex")]
    InvalidHex,

    #[error("signing secret rejected by HMAC")]
    InvalidKey,
}

/// Errors returned by the session lifecycle and, for `StoreUnavailable`, by the
/// validator. Scan rejections are not errors; they are [`crate::Outcome`]s.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("user {user_id} may not mint QR sessions for event {event_id}")]
    Forbidden { user_id: i64, event_id: i64 },

    #[error("event {0} is closed for check-in")]
    EventClosed(i64),

    #[error(transparent)]
    Key(#[from] SignerError),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] DbErr),
}

impl EngineError {
    /// Only a store failure is worth retrying; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::StoreUnavailable(_))
    }

    /// Stable code written to the audit trail and returned by the API.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "not_found",
            EngineError::Forbidden { .. } => "forbidden",
            EngineError::EventClosed(_) => "event_closed",
            EngineError::Key(_) => "invalid_key",
            EngineError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}
