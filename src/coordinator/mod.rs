use crate::prelude::*;

pub mod stats;

pub use stats::PollStats;

use crate::catalog::Catalog;
use crate::decoder::{self, DecodedValue};
use crate::transport::{Transport, TransportError};
use crate::trend::{Trend, TrendSource, TrendTracker};

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashSet;

pub const ERROR_MARKER: &str = "Error reading";
pub const SKIPPED_MARKER: &str = "Invalid (skipped)";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum PollOutcome {
    Decoded(DecodedValue),
    /// The read failed; carries the transport's reason.
    ReadError(String),
    /// The address was refused earlier in this session and is no longer read.
    Skipped,
}

/// One catalog entry's result for one poll pass.
#[derive(Clone, Debug, Serialize)]
pub struct PollRow {
    pub space: AddressSpace,
    pub address: u16,
    pub description: String,
    pub outcome: PollOutcome,
    pub trend: Trend,
    pub raw: Vec<u16>,
    pub polled_at: DateTime<Local>,
}

impl PollRow {
    pub fn display(&self) -> String {
        match &self.outcome {
            PollOutcome::Decoded(value) => value.to_string(),
            PollOutcome::ReadError(_) => ERROR_MARKER.to_string(),
            PollOutcome::Skipped => SKIPPED_MARKER.to_string(),
        }
    }

    pub fn raw_text(&self) -> String {
        self.diagnostic(decoder::raw_text)
    }

    pub fn hex_text(&self) -> String {
        self.diagnostic(decoder::hex_text)
    }

    pub fn value(&self) -> Option<&DecodedValue> {
        match &self.outcome {
            PollOutcome::Decoded(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, PollOutcome::ReadError(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, PollOutcome::Skipped)
    }

    fn diagnostic(&self, render: fn(&[u16]) -> String) -> String {
        match self.outcome {
            PollOutcome::Decoded(_) => render(&self.raw),
            PollOutcome::ReadError(_) => "Error".to_string(),
            PollOutcome::Skipped => "Skipped".to_string(),
        }
    }
}

// Session state of one address space.
struct SpaceState {
    catalog: Catalog,
    trends: TrendTracker,
    invalid: HashSet<u16>,
}

/// A polling session over one or more address spaces.
///
/// Owns every piece of state that survives between passes: trend memory and
/// the parallel space's refused addresses. Dropping the coordinator or
/// calling [`Coordinator::reset`] ends the session.
pub struct Coordinator {
    spaces: Vec<SpaceState>,
    trend_source: TrendSource,
    stats: PollStats,
}

impl Coordinator {
    pub fn new(catalogs: Vec<Catalog>, trend_source: TrendSource) -> Self {
        Self {
            spaces: catalogs
                .into_iter()
                .map(|catalog| SpaceState {
                    catalog,
                    trends: TrendTracker::new(),
                    invalid: HashSet::new(),
                })
                .collect(),
            trend_source,
            stats: PollStats::default(),
        }
    }

    /// Spaces in the order their catalogs were given.
    pub fn spaces(&self) -> Vec<AddressSpace> {
        self.spaces.iter().map(|state| state.catalog.space()).collect()
    }

    pub fn catalog(&self, space: AddressSpace) -> Option<&Catalog> {
        self.state(space).map(|state| &state.catalog)
    }

    pub fn trend_source(&self) -> TrendSource {
        self.trend_source
    }

    pub fn stats(&self) -> &PollStats {
        &self.stats
    }

    pub fn is_invalid(&self, space: AddressSpace, address: u16) -> bool {
        self.state(space)
            .map(|state| state.invalid.contains(&address))
            .unwrap_or(false)
    }

    pub fn invalid_addresses(&self, space: AddressSpace) -> Vec<u16> {
        let mut addresses: Vec<u16> = self
            .state(space)
            .map(|state| state.invalid.iter().copied().collect())
            .unwrap_or_default();
        addresses.sort_unstable();
        addresses
    }

    pub fn previous_value(&self, space: AddressSpace, address: u16) -> Option<f64> {
        self.state(space)
            .and_then(|state| state.trends.previous(address))
    }

    /// Starts a fresh session: trend memory and refused addresses are
    /// forgotten. Statistics are kept.
    pub fn reset(&mut self) {
        for state in self.spaces.iter_mut() {
            state.trends.clear();
            state.invalid.clear();
        }
        info!("Polling session reset");
    }

    /// Reads and decodes every entry of `space`'s catalog, in catalog order,
    /// returning one row per entry.
    ///
    /// Failures never abort the pass. A failed connect marks every entry as
    /// an error without touching trend memory.
    pub async fn poll(
        &mut self,
        space: AddressSpace,
        transport: &mut dyn Transport,
    ) -> Result<Vec<PollRow>> {
        let trend_source = self.trend_source;
        let stats = &mut self.stats;
        let state = self
            .spaces
            .iter_mut()
            .find(|state| state.catalog.space() == space)
            .ok_or_else(|| file_error!("no catalog loaded for space {}", space))?;

        stats.record_pass(space);

        let connect_error = match transport.connect().await {
            Ok(()) => None,
            Err(err) => {
                warn!("{} pass: connect to {} failed: {}", space, transport.target(), err);
                stats.connect_failures += 1;
                Some(err.to_string())
            }
        };

        let table = state.catalog.table();
        let polled_at = Local::now();
        let mut rows = Vec::with_capacity(state.catalog.len());

        for definition in state.catalog.registers() {
            let address = definition.address();
            let row = |outcome: PollOutcome, trend: Trend, raw: Vec<u16>| PollRow {
                space,
                address,
                description: definition.description().to_string(),
                outcome,
                trend,
                raw,
                polled_at,
            };

            if state.invalid.contains(&address) {
                stats.skipped += 1;
                rows.push(row(PollOutcome::Skipped, Trend::Unknown, Vec::new()));
                continue;
            }

            if let Some(reason) = &connect_error {
                rows.push(row(PollOutcome::ReadError(reason.clone()), Trend::Unknown, Vec::new()));
                continue;
            }

            let reply = transport
                .read(table, address, definition.length())
                .await
                .and_then(|raw| check_length(definition, raw));

            match reply {
                Ok(raw) => {
                    let value = state.catalog.decode(definition, &raw);
                    let trend = state
                        .trends
                        .observe(address, trend_source.numeric_input(&value));
                    stats.reads_ok += 1;
                    rows.push(row(PollOutcome::Decoded(value), trend, raw));
                }
                Err(err) => {
                    warn!(
                        "{} 0x{:04X} ({}): {}",
                        space,
                        address,
                        definition.description(),
                        err
                    );
                    stats.record_error(space, err.to_string());

                    if space.tracks_invalid_addresses() && err.is_permanent() {
                        info!(
                            "{} 0x{:04X} refused by device, skipping it for this session",
                            space, address
                        );
                        state.invalid.insert(address);
                        stats.invalidated += 1;
                    }

                    rows.push(row(PollOutcome::ReadError(err.to_string()), Trend::Unknown, Vec::new()));
                }
            }
        }

        if connect_error.is_none() {
            transport.disconnect().await;
        }

        debug!(
            "{} pass: {} rows, {} errors, {} skipped",
            space,
            rows.len(),
            rows.iter().filter(|row| row.is_error()).count(),
            rows.iter().filter(|row| row.is_skipped()).count()
        );

        Ok(rows)
    }

    fn state(&self, space: AddressSpace) -> Option<&SpaceState> {
        self.spaces
            .iter()
            .find(|state| state.catalog.space() == space)
    }
}

fn check_length(definition: &RegisterDefinition, raw: Vec<u16>) -> Result<Vec<u16>, TransportError> {
    if raw.len() == definition.length() as usize {
        Ok(raw)
    } else {
        Err(TransportError::UnexpectedLength {
            expected: definition.length(),
            actual: raw.len(),
        })
    }
}
