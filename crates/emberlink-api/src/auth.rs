// Cognito authentication
//
// The GMG Prime cloud authenticates through an AWS Cognito user pool.
// Both flows used here (USER_PASSWORD_AUTH login, REFRESH_TOKEN_AUTH
// renewal) are plain HTTPS JSON calls against the Cognito IDP endpoint,
// so no AWS SDK is required.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Error;

/// Cognito user pool of the GMG Prime mobile app (us-east-1).
pub const GMG_PRIME_CLIENT_ID: &str = "2me003sbd4ouslkekf2uco2cna";
pub const GMG_PRIME_REGION: &str = "us-east-1";

const AMZ_JSON: &str = "application/x-amz-json-1.1";
const INITIATE_AUTH_TARGET: &str = "AWSCognitoIdentityProviderService.InitiateAuth";

/// Account credentials for the cloud identity provider.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Identity provider endpoint + app client. The endpoint is injectable so
/// tests can point it at a mock server.
#[derive(Debug, Clone)]
pub struct CognitoConfig {
    pub endpoint: Url,
    pub client_id: String,
}

impl CognitoConfig {
    /// Config for an arbitrary Cognito region + app client.
    pub fn for_region(region: &str, client_id: impl Into<String>) -> Self {
        let endpoint = Url::parse(&format!("https://cognito-idp.{region}.amazonaws.com/"))
            .expect("cognito endpoint URL is valid");
        Self {
            endpoint,
            client_id: client_id.into(),
        }
    }

    /// The user pool used by the GMG Prime app.
    pub fn gmg_prime() -> Self {
        Self::for_region(GMG_PRIME_REGION, GMG_PRIME_CLIENT_ID)
    }
}

/// A live Cognito session.
///
/// Created by login, replaced wholesale by refresh, destroyed on logout or
/// unrecoverable auth failure. `expires_at` is the only authority for
/// refresh timing -- never a cached seconds-remaining counter.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    fn needs_refresh(&self, margin: TimeDelta) -> bool {
        Utc::now() >= self.expires_at - margin
    }
}

// ── Cognito wire types ───────────────────────────────────────────────

#[derive(Deserialize)]
struct InitiateAuthResponse {
    #[serde(rename = "AuthenticationResult")]
    authentication_result: Option<AuthenticationResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    id_token: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Deserialize)]
struct CognitoErrorBody {
    #[serde(rename = "__type")]
    kind: String,
    #[serde(default)]
    message: Option<String>,
}

// ── Token manager ────────────────────────────────────────────────────

/// Owns the Cognito session: login, silent refresh, expiry tracking.
///
/// Refresh is single-flight: the session mutex is held across the refresh
/// await, so a second caller arriving while a refresh is in flight waits
/// for the in-flight result instead of issuing a duplicate refresh.
pub struct TokenManager {
    http: reqwest::Client,
    config: CognitoConfig,
    credentials: Credentials,
    refresh_margin: TimeDelta,
    session: Mutex<Option<AuthSession>>,
}

impl TokenManager {
    /// Create a manager from an existing HTTP client.
    ///
    /// `refresh_margin` is the safety window before `expires_at` within
    /// which a token is refreshed before being handed to a caller.
    pub fn new(
        http: reqwest::Client,
        config: CognitoConfig,
        credentials: Credentials,
        refresh_margin: Duration,
    ) -> Self {
        let refresh_margin =
            TimeDelta::from_std(refresh_margin).unwrap_or_else(|_| TimeDelta::seconds(60));
        Self {
            http,
            config,
            credentials,
            refresh_margin,
            session: Mutex::new(None),
        }
    }

    /// Authenticate with email + password, replacing any existing session.
    ///
    /// Bad credentials surface immediately as [`Error::Authentication`] and
    /// are never retried automatically.
    pub async fn login(&self) -> Result<(), Error> {
        debug!(email = %self.credentials.email, "logging in to cognito");

        let params = json!({
            "USERNAME": self.credentials.email,
            "PASSWORD": self.credentials.password.expose_secret(),
        });
        let result = self.initiate_auth("USER_PASSWORD_AUTH", &params, true).await?;
        let session = Self::session_from_result(result, None)?;

        *self.session.lock().await = Some(session);
        info!(email = %self.credentials.email, "authenticated with GMG cloud");
        Ok(())
    }

    /// Return a token valid for at least the refresh margin, refreshing
    /// first if the cached one is within the margin of expiry.
    ///
    /// Returns the raw id token -- the GMG API expects it in the
    /// `Authorization` header without a `Bearer` prefix.
    pub async fn current_token(&self) -> Result<String, Error> {
        let mut guard = self.session.lock().await;
        let Some(session) = guard.as_ref() else {
            return Err(Error::NotAuthenticated);
        };

        if session.needs_refresh(self.refresh_margin) {
            debug!("token within refresh margin, refreshing");
            let refresh_token = session.refresh_token.clone();
            match self.refresh(&refresh_token).await {
                Ok(renewed) => *guard = Some(renewed),
                Err(e) => {
                    if matches!(e, Error::RefreshRejected) {
                        warn!("refresh token rejected, destroying session");
                        *guard = None;
                    }
                    return Err(e);
                }
            }
        }

        guard
            .as_ref()
            .map(|s| s.id_token.clone())
            .ok_or(Error::NotAuthenticated)
    }

    /// Refresh immediately regardless of the expiry margin.
    ///
    /// Used when the cloud API rejects a token that still looked valid
    /// locally (clock skew, server-side revocation).
    pub async fn force_refresh(&self) -> Result<(), Error> {
        let mut guard = self.session.lock().await;
        let Some(session) = guard.as_ref() else {
            return Err(Error::NotAuthenticated);
        };

        let refresh_token = session.refresh_token.clone();
        match self.refresh(&refresh_token).await {
            Ok(renewed) => {
                *guard = Some(renewed);
                Ok(())
            }
            Err(e) => {
                if matches!(e, Error::RefreshRejected) {
                    warn!("refresh token rejected, destroying session");
                    *guard = None;
                }
                Err(e)
            }
        }
    }

    /// Destroy the session.
    pub async fn logout(&self) {
        *self.session.lock().await = None;
        debug!("session destroyed");
    }

    /// A clone of the current session, if any (diagnostics and tests).
    pub async fn session(&self) -> Option<AuthSession> {
        self.session.lock().await.clone()
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Exchange the refresh token for a new session.
    ///
    /// Cognito omits the refresh token from refresh responses, so the
    /// existing one is carried over into the renewed session.
    async fn refresh(&self, refresh_token: &SecretString) -> Result<AuthSession, Error> {
        let params = json!({ "REFRESH_TOKEN": refresh_token.expose_secret() });
        let result = self.initiate_auth("REFRESH_TOKEN_AUTH", &params, false).await?;
        Self::session_from_result(result, Some(refresh_token.clone()))
    }

    /// One `InitiateAuth` call. `login` selects how a `NotAuthorizedException`
    /// is classified: bad credentials on login, fatal rejection on refresh.
    async fn initiate_auth(
        &self,
        flow: &str,
        params: &serde_json::Value,
        login: bool,
    ) -> Result<AuthenticationResult, Error> {
        let body = json!({
            "AuthFlow": flow,
            "ClientId": self.config.client_id,
            "AuthParameters": params,
        });

        let resp = self
            .http
            .post(self.config.endpoint.clone())
            .json(&body)
            .header(reqwest::header::CONTENT_TYPE, AMZ_JSON)
            .header("X-Amz-Target", INITIATE_AUTH_TARGET)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let text = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(Self::classify_cognito_error(status.as_u16(), &text, login));
        }

        let parsed: InitiateAuthResponse =
            serde_json::from_str(&text).map_err(|e| Error::Deserialization {
                message: format!("cognito response: {e}"),
                body: text.clone(),
            })?;

        parsed
            .authentication_result
            .ok_or_else(|| Error::Deserialization {
                message: "cognito response missing AuthenticationResult".into(),
                body: text,
            })
    }

    fn classify_cognito_error(status: u16, body: &str, login: bool) -> Error {
        if let Ok(err) = serde_json::from_str::<CognitoErrorBody>(body) {
            let rejected = err.kind.contains("NotAuthorizedException")
                || err.kind.contains("UserNotFoundException")
                || err.kind.contains("PasswordResetRequiredException");
            if rejected {
                return if login {
                    Error::Authentication {
                        message: err.message.unwrap_or_else(|| err.kind.clone()),
                    }
                } else {
                    Error::RefreshRejected
                };
            }
            return Error::Api {
                status,
                message: format!("{}: {}", err.kind, err.message.unwrap_or_default()),
            };
        }
        Error::Api {
            status,
            message: body.chars().take(200).collect(),
        }
    }

    fn session_from_result(
        result: AuthenticationResult,
        prior_refresh_token: Option<SecretString>,
    ) -> Result<AuthSession, Error> {
        let missing = |field: &str| Error::Deserialization {
            message: format!("cognito AuthenticationResult missing {field}"),
            body: String::new(),
        };

        let refresh_token = result
            .refresh_token
            .map(SecretString::from)
            .or(prior_refresh_token)
            .ok_or_else(|| missing("RefreshToken"))?;

        Ok(AuthSession {
            id_token: result.id_token.ok_or_else(|| missing("IdToken"))?,
            access_token: result.access_token.ok_or_else(|| missing("AccessToken"))?,
            refresh_token,
            expires_at: Utc::now() + TimeDelta::seconds(result.expires_in.unwrap_or(3600)),
        })
    }
}
