use crate::decoder::DecodedValue;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Direction of a value relative to the previous poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Same,
    Unknown,
}

impl Trend {
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Up => "+",
            Self::Down => "-",
            Self::Same => "=",
            Self::Unknown => " ",
        }
    }
}

/// Where the number compared between polls comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TrendSource {
    /// The scaled value before display formatting.
    #[default]
    Value,
    /// The leading number of the formatted display string, so trends follow
    /// exactly what is shown (and its rounding).
    Display,
}

impl TrendSource {
    pub fn numeric_input(&self, value: &DecodedValue) -> Option<f64> {
        match (self, value) {
            (Self::Value, _) => value.numeric(),
            (Self::Display, DecodedValue::Numeric { .. }) => value.leading_number(),
            (Self::Display, _) => None,
        }
    }
}

/// Last numeric value per address for one address space.
#[derive(Debug, Default)]
pub struct TrendTracker {
    previous: HashMap<u16, f64>,
}

impl TrendTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `value` against the last one seen at `address` and
    /// remembers it. A `None` forgets the address, so the next number seen
    /// there is `Unknown` again.
    pub fn observe(&mut self, address: u16, value: Option<f64>) -> Trend {
        let Some(value) = value else {
            self.previous.remove(&address);
            return Trend::Unknown;
        };

        match self.previous.insert(address, value) {
            Some(previous) if value > previous => Trend::Up,
            Some(previous) if value < previous => Trend::Down,
            Some(previous) if value == previous => Trend::Same,
            // no history, or NaN on either side
            _ => Trend::Unknown,
        }
    }

    pub fn previous(&self, address: u16) -> Option<f64> {
        self.previous.get(&address).copied()
    }

    pub fn len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }

    pub fn clear(&mut self) {
        self.previous.clear();
    }
}
