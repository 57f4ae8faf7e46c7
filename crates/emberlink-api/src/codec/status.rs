// Status frame decoding
//
// The grill reports state as a comma-delimited plaintext frame of tagged
// fields terminated by `!`:
//
//   GT225,TG250,P1076,T1160,SS1,WC0,FS2,FP100,CP0,FW2.1.8,UP1754630180!
//
// Each field is a two-character tag followed by its value. The firmware
// omits fields it has nothing to report for, occasionally emits partial
// or garbled fields, and newer firmware adds tags and enum codes this
// client has never seen. Decoding therefore never fails on a single bad
// field: unknown codes map to `Unknown` variants, bad numerics decode as
// absent with a warning, and only a structurally broken frame (empty, or
// missing the terminator) is a hard error.
//
// Decoding is pure: the same frame always yields the same state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Temperatures above this are sensor garbage, not Fahrenheit readings.
const MAX_SANE_TEMP: u16 = 999;

/// The firmware reports `0xFFFFFFFF` remaining seconds when no profile
/// timer is running.
const NO_REMAINING_TIME: u32 = u32::MAX;

// ── Domain enums ─────────────────────────────────────────────────────
//
// Every known raw code maps to exactly one variant; codes outside the
// known set map to `Unknown(code)` and are surfaced, never dropped, so
// callers can log them for future protocol extension.

/// Device-reported operating status (`SS` tag).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrillStatus {
    #[default]
    Off,
    Grilling,
    FanMode,
    Smoking,
    /// Derived by the reachability layer, never decoded from a frame.
    Offline,
    Unknown(u8),
}

impl GrillStatus {
    fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Off,
            1 => Self::Grilling,
            2 => Self::FanMode,
            3 => Self::Smoking,
            other => Self::Unknown(other),
        }
    }
}

/// Active hardware warning (`WC` tag).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
    #[default]
    None,
    FanMode,
    LowPellets,
    IgnitorDisconnect,
    AugerDisconnect,
    FanDisconnect,
    Unknown(u8),
}

impl Warning {
    fn from_code(code: u8) -> Self {
        match code {
            0 => Self::None,
            1 => Self::FanMode,
            2 => Self::LowPellets,
            3 => Self::IgnitorDisconnect,
            4 => Self::AugerDisconnect,
            5 => Self::FanDisconnect,
            other => Self::Unknown(other),
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Ignition subsystem phase (`FS` tag).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireState {
    #[default]
    Off,
    Startup,
    Running,
    CoolDown,
    Fail,
    ColdSmoke,
    Unknown(u8),
}

impl FireState {
    fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Off,
            1 => Self::Startup,
            2 => Self::Running,
            3 => Self::CoolDown,
            4 => Self::Fail,
            5 => Self::ColdSmoke,
            other => Self::Unknown(other),
        }
    }
}

/// Cook profile status (`CP` + `CR` tags).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CookProfile {
    #[default]
    None,
    Active {
        remaining_secs: Option<u32>,
    },
    Paused {
        remaining_secs: Option<u32>,
    },
    Unknown(u8),
}

// ── State snapshot ───────────────────────────────────────────────────

/// One decoded state snapshot.
///
/// All temperatures are Fahrenheit integers or absent -- never
/// zero-as-absent. A target of wire `0` means "not set" on the device and
/// decodes to `None`. A successful decode fully replaces the prior
/// snapshot; field-by-field merging with stale data never happens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrillState {
    pub grill_temp: Option<u16>,
    pub target_grill_temp: Option<u16>,
    pub probe1_temp: Option<u16>,
    pub probe2_temp: Option<u16>,
    pub target_probe1_temp: Option<u16>,
    pub target_probe2_temp: Option<u16>,
    pub status: GrillStatus,
    pub warning: Warning,
    pub fire_state: FireState,
    /// Ignition progress, 0-100.
    pub fire_progress: Option<u8>,
    pub cook_profile: CookProfile,
    pub firmware_version: Option<String>,
    /// Device-reported timestamp of the snapshot.
    pub last_updated_at: Option<DateTime<Utc>>,
}

// ── Decode results ───────────────────────────────────────────────────

/// Structural failure of a whole frame. Anything less than this is a
/// per-field [`DecodeWarning`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("status frame is empty")]
    Empty,
    #[error("status frame missing '!' terminator")]
    MissingTerminator,
}

/// A tolerated per-field defect. The field decodes as absent (or
/// `Unknown`) and the rest of the frame is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeWarning {
    #[error("field {tag} has unparseable value {raw:?}")]
    Unparseable { tag: &'static str, raw: String },
    #[error("field {tag} value {raw:?} out of range")]
    OutOfRange { tag: &'static str, raw: String },
    #[error("unrecognized field {raw:?}")]
    UnknownField { raw: String },
}

/// A decoded frame: the state plus any per-field defects encountered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedStatus {
    pub state: GrillState,
    pub warnings: Vec<DecodeWarning>,
}

// ── Decoder ──────────────────────────────────────────────────────────

/// Decode one raw status frame.
///
/// Omitted fields keep their zero-code/absent defaults (the firmware
/// omits fields with nothing to report). Duplicate tags: last wins.
pub fn decode(raw: &str) -> Result<DecodedStatus, DecodeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }
    let Some(body) = trimmed.strip_suffix('!') else {
        return Err(DecodeError::MissingTerminator);
    };

    let mut state = GrillState::default();
    let mut warnings = Vec::new();
    let mut profile_code: Option<u8> = None;
    let mut profile_remaining: Option<u32> = None;

    for field in body.split(',') {
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        let Some((tag, value)) = field.split_at_checked(2) else {
            warnings.push(DecodeWarning::UnknownField {
                raw: field.to_owned(),
            });
            continue;
        };

        match tag {
            "GT" => state.grill_temp = parse_temp("GT", value, false, &mut warnings),
            "TG" => state.target_grill_temp = parse_temp("TG", value, true, &mut warnings),
            "P1" => state.probe1_temp = parse_temp("P1", value, false, &mut warnings),
            "P2" => state.probe2_temp = parse_temp("P2", value, false, &mut warnings),
            "T1" => state.target_probe1_temp = parse_temp("T1", value, true, &mut warnings),
            "T2" => state.target_probe2_temp = parse_temp("T2", value, true, &mut warnings),
            "SS" => {
                if let Some(code) = parse_code("SS", value, &mut warnings) {
                    state.status = GrillStatus::from_code(code);
                }
            }
            "WC" => {
                if let Some(code) = parse_code("WC", value, &mut warnings) {
                    state.warning = Warning::from_code(code);
                }
            }
            "FS" => {
                if let Some(code) = parse_code("FS", value, &mut warnings) {
                    state.fire_state = FireState::from_code(code);
                }
            }
            "FP" => state.fire_progress = parse_progress(value, &mut warnings),
            "CP" => profile_code = parse_code("CP", value, &mut warnings),
            "CR" => profile_remaining = parse_remaining(value, &mut warnings),
            "FW" => {
                if !value.is_empty() {
                    state.firmware_version = Some(value.to_owned());
                }
            }
            "UP" => state.last_updated_at = parse_timestamp(value, &mut warnings),
            _ => warnings.push(DecodeWarning::UnknownField {
                raw: field.to_owned(),
            }),
        }
    }

    state.cook_profile = match profile_code {
        None | Some(0) => CookProfile::None,
        Some(1) => CookProfile::Active {
            remaining_secs: profile_remaining,
        },
        Some(2) => CookProfile::Paused {
            remaining_secs: profile_remaining,
        },
        Some(other) => CookProfile::Unknown(other),
    };

    Ok(DecodedStatus { state, warnings })
}

// ── Field parsers ────────────────────────────────────────────────────
//
// Each returns `None` (field absent) on any defect, recording a warning.

fn parse_temp(
    tag: &'static str,
    raw: &str,
    zero_is_absent: bool,
    warnings: &mut Vec<DecodeWarning>,
) -> Option<u16> {
    match raw.parse::<u16>() {
        Ok(v) if v > MAX_SANE_TEMP => {
            warnings.push(DecodeWarning::OutOfRange {
                tag,
                raw: raw.to_owned(),
            });
            None
        }
        Ok(0) if zero_is_absent => None,
        Ok(v) => Some(v),
        Err(_) => {
            warnings.push(DecodeWarning::Unparseable {
                tag,
                raw: raw.to_owned(),
            });
            None
        }
    }
}

fn parse_code(tag: &'static str, raw: &str, warnings: &mut Vec<DecodeWarning>) -> Option<u8> {
    match raw.parse::<u8>() {
        Ok(code) => Some(code),
        Err(_) => {
            warnings.push(DecodeWarning::Unparseable {
                tag,
                raw: raw.to_owned(),
            });
            None
        }
    }
}

fn parse_progress(raw: &str, warnings: &mut Vec<DecodeWarning>) -> Option<u8> {
    match raw.parse::<u8>() {
        Ok(v) if v > 100 => {
            warnings.push(DecodeWarning::OutOfRange {
                tag: "FP",
                raw: raw.to_owned(),
            });
            None
        }
        Ok(v) => Some(v),
        Err(_) => {
            warnings.push(DecodeWarning::Unparseable {
                tag: "FP",
                raw: raw.to_owned(),
            });
            None
        }
    }
}

fn parse_remaining(raw: &str, warnings: &mut Vec<DecodeWarning>) -> Option<u32> {
    match raw.parse::<u32>() {
        Ok(NO_REMAINING_TIME) => None,
        Ok(v) => Some(v),
        Err(_) => {
            warnings.push(DecodeWarning::Unparseable {
                tag: "CR",
                raw: raw.to_owned(),
            });
            None
        }
    }
}

fn parse_timestamp(raw: &str, warnings: &mut Vec<DecodeWarning>) -> Option<DateTime<Utc>> {
    let parsed = raw
        .parse::<i64>()
        .ok()
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0));
    if parsed.is_none() {
        warnings.push(DecodeWarning::Unparseable {
            tag: "UP",
            raw: raw.to_owned(),
        });
    }
    parsed
}
