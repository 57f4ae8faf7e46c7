// ── Core error types ──
//
// User-facing errors from emberlink-core. Consumers never see HTTP status
// codes or Cognito exception names directly -- the `From<emberlink_api::Error>`
// impl translates transport-layer errors into domain-appropriate variants.

use thiserror::Error;

use emberlink_api::codec::ValidationError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    #[error("Client is not connected")]
    NotConnected,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Grill not found: {key}")]
    GrillNotFound { key: String },

    #[error("Grill {key} is not reachable through the cloud")]
    GrillUnreachable { key: String },

    #[error("Malformed status payload: {message}")]
    BadPayload { message: String },

    // ── Command errors ───────────────────────────────────────────────
    /// Command input out of range. Returned synchronously, before any
    /// network activity.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ── Transport errors (wrapped, not exposed raw) ──────────────────
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Cannot reach cloud API: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Cloud API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Fatal to the auth session: polling halts until credentials are
    /// refreshed.
    pub fn is_auth_fatal(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed { .. } | Self::SessionExpired
        )
    }

    /// Transient: absorbed by the poller's failure counting rather than
    /// surfaced as a fault.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::ConnectionFailed { .. }
                | Self::GrillUnreachable { .. }
                | Self::BadPayload { .. }
                | Self::Api { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<emberlink_api::Error> for CoreError {
    fn from(err: emberlink_api::Error) -> Self {
        use emberlink_api::Error as ApiError;
        match err {
            ApiError::Authentication { message } => Self::AuthenticationFailed { message },
            ApiError::RefreshRejected | ApiError::NotAuthenticated => Self::SessionExpired,
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    Self::Timeout { timeout_secs: 0 }
                } else {
                    Self::ConnectionFailed {
                        reason: e.to_string(),
                    }
                }
            }
            ApiError::InvalidUrl(e) => Self::Internal(format!("invalid URL: {e}")),
            ApiError::Timeout { timeout_secs } => Self::Timeout { timeout_secs },
            ApiError::GrillUnreachable { key } => Self::GrillUnreachable { key },
            ApiError::Api { status, message } => Self::Api {
                message,
                status: Some(status),
            },
            ApiError::Deserialization { message, body: _ } => {
                Self::Internal(format!("deserialization error: {message}"))
            }
            ApiError::Decode(e) => Self::BadPayload {
                message: e.to_string(),
            },
        }
    }
}
