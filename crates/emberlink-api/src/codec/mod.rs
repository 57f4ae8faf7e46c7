// Device codec
//
// The grill's control channel speaks a compact plaintext grammar in both
// directions: status frames come down as tagged, comma-delimited fields,
// commands go up as fixed-width tokens. Both sides terminate with `!`.
// This module is the single source of truth for that grammar.

pub mod command;
pub mod status;

pub use command::{
    EncodedCommand, GrillMode, Probe, ValidationError, power_off, power_on, set_grill_temp,
    set_probe_temp,
};
pub use status::{
    CookProfile, DecodeError, DecodeWarning, DecodedStatus, FireState, GrillState, GrillStatus,
    Warning, decode,
};
