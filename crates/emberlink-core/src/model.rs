// ── Domain types ──
//
// The grill device identity, the outward snapshot model, and the command
// intents. Decoded state lives in `emberlink_api::codec` (the protocol
// layer owns its wire types); this module layers reachability and
// staleness on top.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use emberlink_api::codec::{
    CookProfile, DecodeWarning, EncodedCommand, FireState, GrillMode, GrillState, GrillStatus,
    Probe, ValidationError, Warning, power_off, power_on, set_grill_temp, set_probe_temp,
};

use crate::error::CoreError;

// ── Identity ────────────────────────────────────────────────────────

/// Composite grill key: `{connectionType}|{grillId}`.
///
/// This is the path segment every state/command endpoint uses, and the
/// primary key of the grill store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrillKey(String);

impl GrillKey {
    pub fn new(connection_type: &str, grill_id: &str) -> Self {
        Self(format!("{connection_type}|{grill_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GrillKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GrillKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A discovered grill. Immutable after discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrillDevice {
    pub id: String,
    pub connection_type: String,
    pub name: Option<String>,
    /// Hardware model label (the grill's BLE advertising name).
    pub model: Option<String>,
}

impl GrillDevice {
    pub fn key(&self) -> GrillKey {
        GrillKey::new(&self.connection_type, &self.id)
    }

    /// Human-facing name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

// ── Reachability ────────────────────────────────────────────────────

/// This client's derived online/degraded/offline classification --
/// distinct from the device-reported `status` field.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Reachability {
    /// No poll has completed yet.
    #[default]
    Unpolled,
    /// The last poll succeeded.
    Online,
    /// At least one poll failed since the last success; the retained
    /// snapshot is stale but still served.
    Degraded,
    /// The consecutive-failure threshold was reached.
    Offline,
}

// ── Snapshot ────────────────────────────────────────────────────────

/// The outward read model for one grill: identity, reachability, and the
/// last successfully decoded state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrillSnapshot {
    pub device: GrillDevice,
    pub reachability: Reachability,
    pub consecutive_failures: u32,
    /// Last successful decode, untouched by failed polls.
    pub state: Option<GrillState>,
    /// Set once a poll has failed since the last success.
    pub stale: bool,
    pub last_success: Option<DateTime<Utc>>,
}

impl GrillSnapshot {
    pub(crate) fn unpolled(device: GrillDevice) -> Self {
        Self {
            device,
            reachability: Reachability::Unpolled,
            consecutive_failures: 0,
            state: None,
            stale: false,
            last_success: None,
        }
    }

    /// The state to report to consumers.
    ///
    /// Online and Degraded serve the retained snapshot (last-known-good).
    /// Offline forces `status: Offline` and absents every temperature
    /// field -- an offline grill must never display a confidently stale
    /// temperature. Firmware version and the device-reported timestamp
    /// survive the masking; they don't go stale the way readings do.
    pub fn reported_state(&self) -> Option<GrillState> {
        match self.reachability {
            Reachability::Offline => {
                let prior = self.state.as_ref();
                Some(GrillState {
                    status: GrillStatus::Offline,
                    warning: Warning::None,
                    fire_state: FireState::Off,
                    cook_profile: CookProfile::None,
                    firmware_version: prior.and_then(|s| s.firmware_version.clone()),
                    last_updated_at: prior.and_then(|s| s.last_updated_at),
                    ..GrillState::default()
                })
            }
            _ => self.state.clone(),
        }
    }
}

// ── Poll outcome ────────────────────────────────────────────────────

/// Transient summary of one poll attempt. Not persisted -- consumed
/// immediately by the per-grill task to advance its reachability machine.
#[derive(Debug)]
pub enum PollOutcome {
    Success {
        state: GrillState,
        warnings: Vec<DecodeWarning>,
    },
    Failure {
        error: CoreError,
    },
}

// ── Command intents ─────────────────────────────────────────────────

/// A validated user intent, encoded on submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrillCommand {
    SetGrillTemp(u16),
    SetProbeTemp { probe: Probe, fahrenheit: u16 },
    PowerOn(GrillMode),
    PowerOff,
}

impl GrillCommand {
    /// Validate and serialize to the device grammar. Out-of-range input
    /// is rejected here, before any network activity.
    pub fn encode(self) -> Result<EncodedCommand, ValidationError> {
        match self {
            Self::SetGrillTemp(f) => set_grill_temp(f),
            Self::SetProbeTemp { probe, fahrenheit } => set_probe_temp(probe, fahrenheit),
            Self::PowerOn(mode) => Ok(power_on(mode)),
            Self::PowerOff => Ok(power_off()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn device() -> GrillDevice {
        GrillDevice {
            id: "41029462".into(),
            connection_type: "remote".into(),
            name: Some("Backyard".into()),
            model: Some("GMG-TREK".into()),
        }
    }

    #[test]
    fn key_matches_endpoint_grammar() {
        assert_eq!(device().key().as_str(), "remote|41029462");
    }

    #[test]
    fn offline_snapshot_masks_temperatures() {
        let mut snap = GrillSnapshot::unpolled(device());
        snap.state = Some(GrillState {
            grill_temp: Some(225),
            target_grill_temp: Some(250),
            probe1_temp: Some(140),
            status: GrillStatus::Grilling,
            firmware_version: Some("2.1.8".into()),
            ..GrillState::default()
        });
        snap.reachability = Reachability::Offline;

        let reported = snap.reported_state().unwrap();
        assert_eq!(reported.status, GrillStatus::Offline);
        assert_eq!(reported.grill_temp, None);
        assert_eq!(reported.target_grill_temp, None);
        assert_eq!(reported.probe1_temp, None);
        assert_eq!(reported.firmware_version.as_deref(), Some("2.1.8"));

        // The retained snapshot itself is untouched.
        assert_eq!(snap.state.as_ref().unwrap().grill_temp, Some(225));
    }

    #[test]
    fn degraded_snapshot_serves_last_known_good() {
        let mut snap = GrillSnapshot::unpolled(device());
        snap.state = Some(GrillState {
            grill_temp: Some(225),
            ..GrillState::default()
        });
        snap.reachability = Reachability::Degraded;
        snap.stale = true;

        assert_eq!(snap.reported_state().unwrap().grill_temp, Some(225));
    }

    #[test]
    fn offline_with_no_prior_state_still_reports_offline() {
        let mut snap = GrillSnapshot::unpolled(device());
        snap.reachability = Reachability::Offline;
        let reported = snap.reported_state().unwrap();
        assert_eq!(reported.status, GrillStatus::Offline);
        assert_eq!(reported.grill_temp, None);
    }

    #[test]
    fn command_intents_encode() {
        assert_eq!(
            GrillCommand::SetGrillTemp(225).encode().unwrap().as_str(),
            "UT225!"
        );
        assert_eq!(
            GrillCommand::SetProbeTemp {
                probe: Probe::Two,
                fahrenheit: 165
            }
            .encode()
            .unwrap()
            .as_str(),
            "Uf165!"
        );
        assert_eq!(
            GrillCommand::PowerOn(GrillMode::Smoke).encode().unwrap().as_str(),
            "UK002!"
        );
        assert_eq!(GrillCommand::PowerOff.encode().unwrap().as_str(), "UN!");
        assert!(GrillCommand::SetGrillTemp(600).encode().is_err());
    }
}
