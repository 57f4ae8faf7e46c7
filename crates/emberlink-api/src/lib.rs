// emberlink-api: Async Rust client for the GMG Prime grill cloud
// (Cognito authentication, REST endpoints, plaintext device codec)

pub mod auth;
pub mod client;
pub mod codec;
pub mod error;
mod grills;
pub mod models;
pub mod transport;

pub use auth::{AuthSession, CognitoConfig, Credentials, TokenManager};
pub use client::CloudClient;
pub use error::Error;
pub use models::GrillRecord;
