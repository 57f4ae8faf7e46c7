// Command encoding
//
// User intents serialize to the device's plaintext command grammar:
//
//   UT{NNN}!   set grill target temp      150-550 °F
//   UF{NNN}!   set probe 1 target temp    100-250 °F
//   Uf{NNN}!   set probe 2 target temp    100-250 °F
//   UK001!     power on, grill mode
//   UK002!     power on, smoke mode
//   UK003!     power on, pizza mode
//   UN!        power off
//
// Numeric fields are zero-padded to width 3 and every command ends with
// the `!` terminator. Range validation happens before encoding; nothing
// is ever clamped -- a clamp could command an unintended temperature.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Valid grill chamber target range (°F).
pub const GRILL_TEMP_RANGE: RangeInclusive<u16> = 150..=550;

/// Valid food probe target range (°F).
pub const PROBE_TEMP_RANGE: RangeInclusive<u16> = 100..=250;

const TERMINATOR: char = '!';

/// Power-on mode selector.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GrillMode {
    Grill,
    Smoke,
    Pizza,
}

/// Food probe selector. The device distinguishes probes by command tag
/// case (`UF` vs `Uf`), not by an index digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Probe {
    One,
    Two,
}

impl Probe {
    fn tag(self) -> &'static str {
        match self {
            Self::One => "UF",
            Self::Two => "Uf",
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

/// A fully validated, wire-ready command string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCommand(String);

impl EncodedCommand {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0.into_bytes()
    }
}

impl fmt::Display for EncodedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rejection of an out-of-range command input, naming the violated bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{field} {value}°F out of range -- must be {min}-{max}°F")]
pub struct ValidationError {
    pub field: &'static str,
    pub value: u16,
    pub min: u16,
    pub max: u16,
}

fn check_range(
    field: &'static str,
    value: u16,
    range: &RangeInclusive<u16>,
) -> Result<(), ValidationError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

/// Encode a grill chamber target temperature (150-550 °F inclusive).
pub fn set_grill_temp(fahrenheit: u16) -> Result<EncodedCommand, ValidationError> {
    check_range("grill target temp", fahrenheit, &GRILL_TEMP_RANGE)?;
    Ok(EncodedCommand(format!("UT{fahrenheit:03}{TERMINATOR}")))
}

/// Encode a food probe target temperature (100-250 °F inclusive).
pub fn set_probe_temp(probe: Probe, fahrenheit: u16) -> Result<EncodedCommand, ValidationError> {
    check_range("probe target temp", fahrenheit, &PROBE_TEMP_RANGE)?;
    Ok(EncodedCommand(format!(
        "{}{fahrenheit:03}{TERMINATOR}",
        probe.tag()
    )))
}

/// Encode a power-on command for the given mode. Infallible -- the mode
/// enum is the whole input space.
pub fn power_on(mode: GrillMode) -> EncodedCommand {
    let code = match mode {
        GrillMode::Grill => 1,
        GrillMode::Smoke => 2,
        GrillMode::Pizza => 3,
    };
    EncodedCommand(format!("UK{code:03}{TERMINATOR}"))
}

/// Encode the power-off command.
pub fn power_off() -> EncodedCommand {
    EncodedCommand(format!("UN{TERMINATOR}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn grill_temp_wire_format() {
        assert_eq!(set_grill_temp(150).unwrap().as_str(), "UT150!");
        assert_eq!(set_grill_temp(225).unwrap().as_str(), "UT225!");
        assert_eq!(set_grill_temp(550).unwrap().as_str(), "UT550!");
    }

    #[test]
    fn grill_temp_bounds() {
        assert!(set_grill_temp(150).is_ok());
        assert!(set_grill_temp(550).is_ok());

        let low = set_grill_temp(149).unwrap_err();
        assert_eq!((low.value, low.min, low.max), (149, 150, 550));
        let high = set_grill_temp(551).unwrap_err();
        assert_eq!((high.value, high.min, high.max), (551, 150, 550));
    }

    #[test]
    fn probe_temp_wire_format() {
        assert_eq!(set_probe_temp(Probe::One, 100).unwrap().as_str(), "UF100!");
        assert_eq!(set_probe_temp(Probe::One, 165).unwrap().as_str(), "UF165!");
        assert_eq!(set_probe_temp(Probe::Two, 250).unwrap().as_str(), "Uf250!");
    }

    #[test]
    fn probe_temp_bounds() {
        assert!(set_probe_temp(Probe::One, 100).is_ok());
        assert!(set_probe_temp(Probe::Two, 250).is_ok());
        assert!(set_probe_temp(Probe::One, 99).is_err());
        assert!(set_probe_temp(Probe::Two, 251).is_err());
    }

    #[test]
    fn power_commands() {
        assert_eq!(power_on(GrillMode::Grill).as_str(), "UK001!");
        assert_eq!(power_on(GrillMode::Smoke).as_str(), "UK002!");
        assert_eq!(power_on(GrillMode::Pizza).as_str(), "UK003!");
        assert_eq!(power_off().as_str(), "UN!");
    }

    #[test]
    fn encoded_temp_round_trips_across_full_range() {
        for temp in GRILL_TEMP_RANGE {
            let encoded = set_grill_temp(temp).unwrap();
            let digits = &encoded.as_str()[2..5];
            assert_eq!(digits.parse::<u16>().unwrap(), temp, "frame {encoded}");
            assert!(encoded.as_str().ends_with('!'));
        }
        for temp in PROBE_TEMP_RANGE {
            let encoded = set_probe_temp(Probe::Two, temp).unwrap();
            let digits = &encoded.as_str()[2..5];
            assert_eq!(digits.parse::<u16>().unwrap(), temp);
        }
    }

    #[test]
    fn validation_error_names_bounds() {
        let err = set_probe_temp(Probe::One, 251).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("251"));
        assert!(msg.contains("100-250"));
    }

    #[test]
    fn mode_names_round_trip() {
        use std::str::FromStr;
        assert_eq!(GrillMode::from_str("smoke").unwrap(), GrillMode::Smoke);
        assert_eq!(GrillMode::Pizza.to_string(), "pizza");
    }
}
