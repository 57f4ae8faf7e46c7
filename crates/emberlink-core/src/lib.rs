// emberlink-core: polling engine and reactive grill store on top of emberlink-api.

pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod poller;
mod reachability;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::ClientConfig;
pub use error::CoreError;
pub use model::{GrillCommand, GrillDevice, GrillKey, GrillSnapshot, PollOutcome, Reachability};
pub use poller::{GrillClient, SessionState};
pub use store::GrillStore;

// Protocol types consumers need alongside the domain model.
pub use emberlink_api::codec::{
    CookProfile, DecodeWarning, FireState, GrillMode, GrillState, GrillStatus, Probe,
    ValidationError, Warning,
};
