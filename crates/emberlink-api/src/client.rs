// Cloud API HTTP client
//
// Wraps `reqwest::Client` with GMG-specific URL construction, auth header
// injection, and response classification. Endpoint methods live in
// `grills.rs` as inherent impls to keep this module focused on transport
// mechanics.

use tracing::debug;
use url::Url;

use crate::auth::TokenManager;
use crate::error::Error;
use crate::transport::TransportConfig;

/// GMG Prime production API root.
pub const DEFAULT_API_BASE: &str = "https://prime-api.gmgserver.net/v1";

/// HTTP client for the GMG Prime cloud API.
///
/// Every request obtains a token from the [`TokenManager`] first, so the
/// auth manager's refresh policy applies uniformly to all endpoints. The
/// GMG API expects the raw Cognito id token in `Authorization` -- no
/// `Bearer` prefix.
pub struct CloudClient {
    http: reqwest::Client,
    base_url: Url,
    auth: TokenManager,
}

impl CloudClient {
    /// Create a client from a `TransportConfig`, sharing the built HTTP
    /// client with the token manager's Cognito calls.
    pub fn new(base_url: Url, auth: TokenManager, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, auth))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, auth: TokenManager) -> Self {
        Self {
            http,
            base_url,
            auth,
        }
    }

    /// The owning token manager.
    pub fn auth(&self) -> &TokenManager {
        &self.auth
    }

    /// The cloud API root.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Authenticate the session (delegates to the token manager).
    pub async fn login(&self) -> Result<(), Error> {
        self.auth.login().await
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/grill`.
    pub(crate) fn grills_url(&self) -> Url {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/grill")).expect("invalid grill list URL")
    }

    /// Build `{base}/grill/{connectionType}%7C{grillId}/{tail}`.
    ///
    /// The `|` in the composite segment is sent percent-encoded, matching
    /// what the mobile app sends.
    pub(crate) fn grill_url(&self, connection_type: &str, grill_id: &str, tail: &str) -> Url {
        let base = self.base_url.as_str().trim_end_matches('/');
        let full = format!("{base}/grill/{connection_type}%7C{grill_id}/{tail}");
        Url::parse(&full).expect("invalid grill URL")
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send an authenticated request, retrying once after a forced token
    /// refresh if the API rejects the token (401/403). The cloud
    /// occasionally rejects tokens that still look valid locally.
    pub(crate) async fn send_authed<F>(&self, build: F) -> Result<reqwest::Response, Error>
    where
        F: Fn(&reqwest::Client, &str) -> reqwest::RequestBuilder,
    {
        let token = self.auth.current_token().await?;
        let resp = build(&self.http, &token)
            .send()
            .await
            .map_err(Error::Transport)?;

        if !matches!(resp.status().as_u16(), 401 | 403) {
            return Ok(resp);
        }

        debug!("cloud API rejected token, refreshing once and retrying");
        self.auth.force_refresh().await?;
        let token = self.auth.current_token().await?;
        build(&self.http, &token)
            .send()
            .await
            .map_err(Error::Transport)
    }

    /// Classify a response: success passes through, auth rejection and API
    /// failures become typed errors. `grill_key` maps a 404 to
    /// [`Error::GrillUnreachable`] (the grill is not connected to the
    /// cloud right now).
    pub(crate) async fn check_status(
        resp: reqwest::Response,
        grill_key: Option<&str>,
    ) -> Result<reqwest::Response, Error> {
        let status = resp.status();

        if matches!(status.as_u16(), 401 | 403) {
            // Still rejected after the one refresh-and-retry.
            return Err(Error::Authentication {
                message: format!("cloud API rejected token (HTTP {status})"),
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(key) = grill_key {
                return Err(Error::GrillUnreachable {
                    key: key.to_owned(),
                });
            }
        }

        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        })
    }
}
