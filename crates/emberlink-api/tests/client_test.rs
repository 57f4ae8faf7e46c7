// Integration tests for `CloudClient` using wiremock.
//
// The mock server doubles as both the Cognito endpoint (POST /) and the
// cloud API root (GET/PUT /grill/...), mirroring how the client wires a
// shared HTTP client through both.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_string, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use emberlink_api::auth::{CognitoConfig, Credentials, TokenManager};
use emberlink_api::codec::{self, GrillStatus};
use emberlink_api::transport::TransportConfig;
use emberlink_api::{CloudClient, Error};

// ── Helpers ─────────────────────────────────────────────────────────

async fn mount_login(server: &MockServer, id_token: &str) {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("X-Amz-Target", "AWSCognitoIdentityProviderService.InitiateAuth"))
        .and(wiremock::matchers::body_partial_json(
            json!({"AuthFlow": "USER_PASSWORD_AUTH"}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "AuthenticationResult": {
                "IdToken": id_token,
                "AccessToken": "access",
                "RefreshToken": "refresh-1",
                "ExpiresIn": 3600,
                "TokenType": "Bearer",
            }
        })))
        .mount(server)
        .await;
}

async fn client_for(server: &MockServer) -> CloudClient {
    let transport = TransportConfig {
        timeout: Duration::from_secs(5),
        ..TransportConfig::default()
    };
    let http = transport.build_client().unwrap();
    let auth = TokenManager::new(
        http.clone(),
        CognitoConfig {
            endpoint: server.uri().parse().unwrap(),
            client_id: "test-client".into(),
        },
        Credentials::new("pit@example.com", "hunter2"),
        Duration::from_secs(60),
    );
    let client = CloudClient::with_client(http, server.uri().parse().unwrap(), auth);
    client.login().await.unwrap();
    client
}

// ── Discovery ───────────────────────────────────────────────────────

#[tokio::test]
async fn list_grills_parses_records() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/grill"))
        .and(header("Authorization", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "grillId": "41029462",
                "grillName": "Backyard",
                "connectionType": "remote",
                "bleName": "GMG-TREK"
            },
            { "grillId": "88113307" }
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let grills = client.list_grills().await.unwrap();

    assert_eq!(grills.len(), 2);
    assert_eq!(grills[0].grill_id, "41029462");
    assert_eq!(grills[0].grill_name.as_deref(), Some("Backyard"));
    assert_eq!(grills[1].connection_type, "remote");
}

#[tokio::test]
async fn list_grills_garbage_body_is_deserialization_error() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/grill"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.list_grills().await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }));
}

// ── State fetch ─────────────────────────────────────────────────────

#[tokio::test]
async fn grill_status_returns_raw_frame() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1").await;

    let frame = "GT225,TG250,P1076,SS1,WC0,FS2!";
    Mock::given(method("GET"))
        .and(path_regex("^/grill/.+/state$"))
        .and(header("Authorization", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(frame))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let raw = client.grill_status("remote", "41029462").await.unwrap();
    assert_eq!(raw, frame);

    let decoded = codec::decode(&raw).unwrap();
    assert_eq!(decoded.state.status, GrillStatus::Grilling);
}

#[tokio::test]
async fn offline_grill_maps_to_unreachable() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path_regex("^/grill/.+/state$"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.grill_status("remote", "41029462").await.unwrap_err();
    match err {
        Error::GrillUnreachable { ref key } => assert_eq!(key, "remote|41029462"),
        other => panic!("expected GrillUnreachable, got {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn server_error_is_transient() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path_regex("^/grill/.+/state$"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.grill_status("remote", "41029462").await.unwrap_err();
    assert!(matches!(err, Error::Api { status: 502, .. }));
    assert!(err.is_transient());
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn send_command_puts_plaintext_octets() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1").await;

    Mock::given(method("PUT"))
        .and(path_regex("^/grill/.+/command$"))
        .and(header("Authorization", "tok-1"))
        .and(header("Content-Type", "application/octet-stream"))
        .and(body_string("UT250!"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let cmd = codec::set_grill_temp(250).unwrap();
    client.send_command("remote", "41029462", &cmd).await.unwrap();
}

// ── Token rejection retry ───────────────────────────────────────────

#[tokio::test]
async fn rejected_token_refreshes_once_and_retries() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-stale").await;

    // Refresh hands out a fresh token.
    Mock::given(method("POST"))
        .and(path("/"))
        .and(wiremock::matchers::body_partial_json(
            json!({"AuthFlow": "REFRESH_TOKEN_AUTH"}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "AuthenticationResult": {
                "IdToken": "tok-fresh",
                "AccessToken": "access",
                "ExpiresIn": 3600,
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    // The API rejects the stale token, accepts the fresh one.
    Mock::given(method("GET"))
        .and(path("/grill"))
        .and(header("Authorization", "tok-stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/grill"))
        .and(header("Authorization", "tok-fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let grills = client.list_grills().await.unwrap();
    assert!(grills.is_empty());
}

#[tokio::test]
async fn still_rejected_after_refresh_is_fatal() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-stale").await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(wiremock::matchers::body_partial_json(
            json!({"AuthFlow": "REFRESH_TOKEN_AUTH"}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "AuthenticationResult": {
                "IdToken": "tok-still-bad",
                "AccessToken": "access",
                "ExpiresIn": 3600,
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/grill"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.list_grills().await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
    assert!(err.is_auth_fatal());
}
