use thiserror::Error;

use crate::codec::status::DecodeError;

/// Top-level error type for the `emberlink-api` crate.
///
/// Covers every failure mode across the Cognito auth flows, the cloud REST
/// surface, and the device codec. `emberlink-core` maps these into
/// domain-appropriate variants before consumers see them.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (wrong credentials, unknown account, disabled user).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The refresh token was rejected (expired or revoked). Fatal to the
    /// session -- a fresh login is required. Never retried with the same
    /// refresh token.
    #[error("Refresh token rejected -- sign-in required")]
    RefreshRejected,

    /// No session is established yet; `login()` has not been called
    /// (or the session was destroyed after a fatal auth failure).
    #[error("Not authenticated -- call login() first")]
    NotAuthenticated,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Cloud API ───────────────────────────────────────────────────
    /// The cloud returned 404 for a grill's state endpoint: the grill is
    /// not currently connected to the cloud.
    #[error("Grill {key} is not reachable through the cloud")]
    GrillUnreachable { key: String },

    /// Any other non-success response from the cloud API.
    #[error("Cloud API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Device codec ────────────────────────────────────────────────
    /// The grill's status frame was structurally malformed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl Error {
    /// Returns `true` if this error is fatal to the auth session and
    /// requires fresh credentials rather than a retry.
    pub fn is_auth_fatal(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::RefreshRejected | Self::NotAuthenticated
        )
    }

    /// Returns `true` if this is a transient error worth retrying on the
    /// next poll cycle (timeout, connection failure, 5xx, grill offline).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::GrillUnreachable { .. } => true,
            Self::Api { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            _ => false,
        }
    }
}
