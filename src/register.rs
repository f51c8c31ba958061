use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// The four independent address spaces of the inverter's register map.
///
/// Spaces never share state: the same address number in two spaces refers to
/// two different registers.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum AddressSpace {
    Holding,
    Input,
    SelfTest,
    Parallel,
}

impl AddressSpace {
    pub fn all() -> [AddressSpace; 4] {
        [Self::Holding, Self::Input, Self::SelfTest, Self::Parallel]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Holding => "holding",
            Self::Input => "input",
            Self::SelfTest => "self_test",
            Self::Parallel => "parallel",
        }
    }

    /// Register table the space is read from unless its catalog says otherwise.
    pub fn default_table(&self) -> RegisterTable {
        match self {
            Self::Holding => RegisterTable::Holding,
            Self::Input | Self::SelfTest | Self::Parallel => RegisterTable::Input,
        }
    }

    /// The parallel space addresses slave units that may be absent, so
    /// addresses the device refuses are remembered and skipped.
    pub fn tracks_invalid_addresses(&self) -> bool {
        matches!(self, Self::Parallel)
    }
}

impl std::fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Protocol-level register table, tagged with its read function code.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, IntoPrimitive, TryFromPrimitive,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RegisterTable {
    Holding = 0x03,
    Input = 0x04,
}

/// How a definition's raw words are turned into a value. Decided once when
/// the catalog is loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterKind {
    /// Multi-register ASCII block (also used for reserved ranges).
    #[default]
    Text,
    /// Single register, optionally signed, optionally scaled.
    Scaled,
    /// Two registers forming one 32-bit quantity, high word first.
    Spanning32,
    /// Single register whose code is looked up in an enumeration table.
    Enumerated,
}

impl RegisterKind {
    pub fn classify(length: u16, has_scale_or_unit: bool, enumerated: bool) -> Self {
        if enumerated {
            Self::Enumerated
        } else if length == 1 {
            Self::Scaled
        } else if length == 2 && has_scale_or_unit {
            Self::Spanning32
        } else {
            Self::Text
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Scaled | Self::Spanning32)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterDefinition {
    address: u16,
    length: u16,
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    signed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enumeration: Option<String>,
    #[serde(skip)]
    kind: RegisterKind,
}

impl RegisterDefinition {
    pub fn new<S: Into<String>>(address: u16, length: u16, description: S) -> Self {
        let mut definition = Self {
            address,
            length,
            description: description.into(),
            scale: None,
            unit: None,
            signed: false,
            enumeration: None,
            kind: RegisterKind::default(),
        };
        definition.refresh_kind();
        definition
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self.refresh_kind();
        self
    }

    pub fn with_unit<S: Into<String>>(mut self, unit: S) -> Self {
        self.unit = Some(unit.into());
        self.refresh_kind();
        self
    }

    pub fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    pub fn with_enumeration<S: Into<String>>(mut self, table: S) -> Self {
        self.enumeration = Some(table.into());
        self.refresh_kind();
        self
    }

    // must run after deserializing, the kind is not part of the table format
    pub(crate) fn refresh_kind(&mut self) {
        self.kind = RegisterKind::classify(
            self.length,
            self.scale.is_some() || self.unit.is_some(),
            self.enumeration.is_some(),
        );
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    /// One past the last address covered, widened so 0xFFFF-ending ranges fit.
    pub fn end(&self) -> u32 {
        self.address as u32 + self.length as u32
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Effective scale; an absent scale means raw integer display.
    pub fn scale(&self) -> f64 {
        self.scale.unwrap_or(1.0)
    }

    pub fn raw_scale(&self) -> Option<f64> {
        self.scale
    }

    pub fn unit(&self) -> &str {
        self.unit.as_deref().unwrap_or_default()
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn enumeration(&self) -> Option<&str> {
        self.enumeration.as_deref()
    }

    pub fn kind(&self) -> RegisterKind {
        self.kind
    }
}
