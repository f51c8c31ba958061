//! Turns raw register words into display values.
//!
//! Decoding is driven entirely by the [`RegisterKind`] fixed when the catalog
//! was loaded:
//!
//! * `Text` - two Latin-1 characters per word, high byte first, trimmed of
//!   whitespace and NUL padding.
//! * `Scaled` - one word, optionally reinterpreted as `i16`, times the scale.
//! * `Spanning32` - two words, high word first, optionally reinterpreted as
//!   `i32`, times the scale.
//! * `Enumerated` - the raw code and its label, scale and unit ignored.
//!
//! Numbers are rendered with a precision chosen from the scale: integers for
//! `1.0`, one decimal for `0.1`, two for `0.01` and three for anything else.

use crate::enumeration::EnumerationResolver;
use crate::register::{RegisterDefinition, RegisterKind};

use serde::Serialize;

// tolerance when matching a scale against the 0.1 / 0.01 precision buckets
const SCALE_EPSILON: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecodedValue {
    Text(String),
    Numeric { value: f64, display: String },
    Enumerated { code: u16, label: String },
}

impl DecodedValue {
    /// The scaled value before formatting, for numeric kinds only.
    pub fn numeric(&self) -> Option<f64> {
        match self {
            Self::Numeric { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// The leading whitespace-delimited token of the display string, parsed
    /// as a float. `"230.0 V"` gives `230.0`, `"SolaX"` gives `None`.
    pub fn leading_number(&self) -> Option<f64> {
        self.to_string()
            .split_whitespace()
            .next()
            .and_then(|token| token.parse::<f64>().ok())
    }
}

impl std::fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{}", text),
            Self::Numeric { display, .. } => write!(f, "{}", display),
            Self::Enumerated { code, label } => write!(f, "{} => {}", code, label),
        }
    }
}

/// Decodes `raw`, which the caller guarantees holds `definition.length()`
/// words in address order. Missing words read as zero.
pub fn decode(
    definition: &RegisterDefinition,
    raw: &[u16],
    resolver: &EnumerationResolver,
) -> DecodedValue {
    match definition.kind() {
        RegisterKind::Text => DecodedValue::Text(registers_to_ascii(raw)),
        RegisterKind::Scaled => {
            let word = word_at(raw, 0);
            let value = if definition.is_signed() {
                word as i16 as f64
            } else {
                word as f64
            };
            numeric(definition, value * definition.scale())
        }
        RegisterKind::Spanning32 => {
            let combined = compose_u32(word_at(raw, 0), word_at(raw, 1));
            let value = if definition.is_signed() {
                combined as i32 as f64
            } else {
                combined as f64
            };
            numeric(definition, value * definition.scale())
        }
        RegisterKind::Enumerated => {
            let code = word_at(raw, 0);
            DecodedValue::Enumerated {
                code,
                label: resolver.resolve(definition.address(), code),
            }
        }
    }
}

fn numeric(definition: &RegisterDefinition, value: f64) -> DecodedValue {
    DecodedValue::Numeric {
        value,
        display: format_value(value, definition.scale(), definition.unit()),
    }
}

fn word_at(raw: &[u16], index: usize) -> u16 {
    raw.get(index).copied().unwrap_or_default()
}

/// `high` is the word at the lower address.
pub fn compose_u32(high: u16, low: u16) -> u32 {
    ((high as u32) << 16) | low as u32
}

pub fn registers_to_ascii(raw: &[u16]) -> String {
    let text: String = raw
        .iter()
        .flat_map(|word| [(word >> 8) as u8, (word & 0xFF) as u8])
        .map(char::from)
        .collect();

    text.trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string()
}

pub fn format_value(value: f64, scale: f64, unit: &str) -> String {
    let number = if scale == 1.0 {
        format!("{}", value.trunc() as i64)
    } else if (scale - 0.1).abs() < SCALE_EPSILON {
        format!("{:.1}", value)
    } else if (scale - 0.01).abs() < SCALE_EPSILON {
        format!("{:.2}", value)
    } else {
        format!("{:.3}", value)
    };

    if unit.is_empty() {
        number
    } else {
        format!("{} {}", number, unit)
    }
}

/// `1234` for one word, `[1, 2]` for several.
pub fn raw_text(raw: &[u16]) -> String {
    join_words(raw, |word| word.to_string())
}

/// `0x04D2` for one word, `[0x0001, 0x0002]` for several.
pub fn hex_text(raw: &[u16]) -> String {
    join_words(raw, |word| format!("0x{:04X}", word))
}

fn join_words<F: Fn(u16) -> String>(raw: &[u16], render: F) -> String {
    match raw {
        [single] => render(*single),
        _ => format!(
            "[{}]",
            raw.iter().map(|word| render(*word)).collect::<Vec<_>>().join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumeration::{EnumerationTable, SAFETY_STANDARD};
    use std::sync::Arc;

    fn resolver() -> EnumerationResolver {
        let mut resolver = EnumerationResolver::new();
        resolver.register(0x001D, Arc::new(EnumerationTable::builtin(SAFETY_STANDARD).unwrap()));
        resolver
    }

    fn decode_one(definition: &RegisterDefinition, raw: &[u16]) -> String {
        decode(definition, raw, &resolver()).to_string()
    }

    #[test]
    fn unscaled_unsigned_is_exact() {
        let definition = RegisterDefinition::new(0x001E, 1, "REV");
        for word in [0, 1, 255, 32767, 32768, 65535] {
            assert_eq!(decode_one(&definition, &[word]), word.to_string());
        }
    }

    #[test]
    fn scaled_with_unit() {
        let voltage = RegisterDefinition::new(0x0000, 1, "GridVoltage").with_scale(0.1).with_unit("V");
        assert_eq!(decode_one(&voltage, &[2301]), "230.1 V");

        let frequency = RegisterDefinition::new(0x0007, 1, "GridFrequency").with_scale(0.01).with_unit("Hz");
        assert_eq!(decode_one(&frequency, &[5002]), "50.02 Hz");
        assert_eq!(decode_one(&frequency, &[230]), "2.30 Hz");

        let seconds = RegisterDefinition::new(0x0016, 1, "TimeStart").with_scale(1.0).with_unit("s");
        assert_eq!(decode_one(&seconds, &[60]), "60 s");
    }

    #[test]
    fn empty_unit_has_no_trailing_space() {
        let pf = RegisterDefinition::new(0x0027, 1, "PowerfactorData").with_scale(0.01).with_unit("");
        assert_eq!(decode_one(&pf, &[95]), "0.95");
    }

    #[test]
    fn small_scales_use_three_decimals() {
        let gradient = RegisterDefinition::new(0x00F3, 1, "wPowerLimitGra").with_scale(0.0001).with_unit("");
        assert_eq!(decode_one(&gradient, &[1234]), "0.123");

        let cell = RegisterDefinition::new(0x0100, 1, "CellVoltage").with_scale(0.001).with_unit("V");
        assert_eq!(decode_one(&cell, &[3312]), "3.312 V");
    }

    #[test]
    fn signed_single_register() {
        let current = RegisterDefinition::new(0x0001, 1, "GridCurrent").with_scale(0.1).with_unit("A").signed();
        assert_eq!(decode(&current, &[0x8000], &resolver()).numeric(), Some(-32768.0 * 0.1));
        assert_eq!(decode(&current, &[0xFFFF], &resolver()).numeric(), Some(-0.1));
        assert_eq!(decode_one(&current, &[0xFFFF]), "-0.1 A");
        assert_eq!(decode_one(&current, &[0x7FFF]), "3276.7 A");

        let power = RegisterDefinition::new(0x0002, 1, "GridPower").with_scale(1.0).with_unit("W").signed();
        assert_eq!(decode_one(&power, &[0x8000]), "-32768 W");
        assert_eq!(decode_one(&power, &[0xFFFF]), "-1 W");
    }

    #[test]
    fn unsigned_ignores_top_bit() {
        let power = RegisterDefinition::new(0x000A, 1, "Powerdc1").with_scale(1.0).with_unit("W");
        assert_eq!(decode_one(&power, &[0xFFFF]), "65535 W");
    }

    #[test]
    fn spanning_32bit_values() {
        let energy = RegisterDefinition::new(0x0048, 2, "feedin_energy_total").with_scale(0.01).with_unit("kWh");
        // 0x0001_0000 = 65536
        assert_eq!(decode_one(&energy, &[0x0001, 0x0000]), "655.36 kWh");

        let feedin = RegisterDefinition::new(0x0046, 2, "feedin_power").with_scale(1.0).with_unit("W").signed();
        assert_eq!(decode_one(&feedin, &[0xFFFF, 0xFFFE]), "-2 W");
        assert_eq!(decode_one(&feedin, &[0x0000, 0x0064]), "100 W");
        assert_eq!(decode(&feedin, &[0x8000, 0x0000], &resolver()).numeric(), Some(i32::MIN as f64));

        let unsigned = RegisterDefinition::new(0x0092, 2, "EchargeTotal").with_scale(1.0).with_unit("kWh");
        assert_eq!(decode_one(&unsigned, &[0xFFFF, 0xFFFF]), "4294967295 kWh");
    }

    #[test]
    fn ascii_round_trip() {
        let text = RegisterDefinition::new(0x0000, 7, "SeriesNumber");

        let word = (('A' as u16) << 8) | 'B' as u16;
        assert_eq!(registers_to_ascii(&[word]), "AB");
        assert_eq!(decode_one(&text, &[word]), "AB");
    }

    #[test]
    fn ascii_block_trims_padding() {
        let serial = RegisterDefinition::new(0x0000, 7, "SeriesNumber");
        // "H34A" then NUL padding
        let raw = [0x4833, 0x3441, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000];
        assert_eq!(decode_one(&serial, &raw), "H34A");

        let padded = [0x2020, 0x5858, 0x2000];
        assert_eq!(registers_to_ascii(&padded), "XX");

        // reserved blocks of zeros render as nothing
        assert_eq!(decode_one(&RegisterDefinition::new(0x007E, 4, "REV"), &[0, 0, 0, 0]), "");
    }

    #[test]
    fn enumerated_safety_standard() {
        let safety = RegisterDefinition::new(0x001D, 1, "Safety Type")
            .with_scale(0.1)
            .with_unit("V")
            .with_enumeration(SAFETY_STANDARD);
        assert_eq!(decode_one(&safety, &[0]), "0 => VDE0126");
        assert_eq!(decode_one(&safety, &[999]), "999 => Unknown");

        let value = decode(&safety, &[1], &resolver());
        assert_eq!(
            value,
            DecodedValue::Enumerated {
                code: 1,
                label: "VDE4105".to_string()
            }
        );
        assert_eq!(value.numeric(), None);
    }

    #[test]
    fn leading_number_of_display() {
        let voltage = RegisterDefinition::new(0x0000, 1, "GridVoltage").with_scale(0.1).with_unit("V");
        assert_eq!(decode(&voltage, &[2300], &resolver()).leading_number(), Some(230.0));
        assert_eq!(DecodedValue::Text("SolaX".into()).leading_number(), None);
        assert_eq!(DecodedValue::Text(String::new()).leading_number(), None);
    }

    #[test]
    fn diagnostic_rendering() {
        assert_eq!(raw_text(&[1234]), "1234");
        assert_eq!(hex_text(&[1234]), "0x04D2");
        assert_eq!(raw_text(&[1, 2]), "[1, 2]");
        assert_eq!(hex_text(&[0x0001, 0xABCD]), "[0x0001, 0xABCD]");
    }

    #[test]
    fn short_reply_reads_as_zero() {
        let energy = RegisterDefinition::new(0x0048, 2, "energy").with_scale(1.0).with_unit("kWh");
        assert_eq!(decode_one(&energy, &[0x0001]), "65536 kWh");
    }
}
