// ── Runtime client configuration ──
//
// These types describe *how* to reach the grill cloud. They carry
// credential data and polling tuning, but never touch disk -- the
// embedding application (or emberlink-config) constructs a
// `ClientConfig` and hands it in.

use std::time::Duration;

use url::Url;

pub use emberlink_api::auth::{
    CognitoConfig, Credentials, GMG_PRIME_CLIENT_ID, GMG_PRIME_REGION,
};
pub use emberlink_api::client::DEFAULT_API_BASE;

/// Poll cadence, measured from the end of the previous attempt.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Per-request HTTP timeout. A timed-out call counts as one transient
/// poll failure.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Consecutive transient failures before a grill is reported offline.
pub const DEFAULT_OFFLINE_THRESHOLD: u32 = 3;

/// Tokens within this window of expiry are refreshed before use.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Configuration for a single authenticated cloud session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Cloud API root.
    pub api_base: Url,
    /// Identity provider endpoint + app client.
    pub cognito: CognitoConfig,
    /// Account credentials.
    pub credentials: Credentials,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Per-grill poll cadence.
    pub poll_interval: Duration,
    /// Consecutive-failure threshold for the offline transition.
    pub offline_threshold: u32,
    /// Token refresh safety margin.
    pub refresh_margin: Duration,
}

impl ClientConfig {
    /// Production config with the stated defaults for the given account.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            api_base: Url::parse(DEFAULT_API_BASE).expect("default API base URL is valid"),
            cognito: CognitoConfig::gmg_prime(),
            credentials: Credentials::new(email, password),
            timeout: DEFAULT_HTTP_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            offline_threshold: DEFAULT_OFFLINE_THRESHOLD,
            refresh_margin: DEFAULT_REFRESH_MARGIN,
        }
    }
}
