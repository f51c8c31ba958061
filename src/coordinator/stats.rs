use crate::prelude::*;

use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PollStats {
    pub passes: u64,
    pub reads_ok: u64,
    pub read_errors: u64,
    pub skipped: u64,
    pub connect_failures: u64,
    pub invalidated: u64,
    // Passes per address space
    pub passes_by_space: BTreeMap<AddressSpace, u64>,
    // Last read error seen per address space
    pub last_errors: BTreeMap<AddressSpace, String>,
}

impl PollStats {
    pub fn record_pass(&mut self, space: AddressSpace) {
        self.passes += 1;
        *self.passes_by_space.entry(space).or_default() += 1;
    }

    pub fn record_error(&mut self, space: AddressSpace, message: String) {
        self.read_errors += 1;
        self.last_errors.insert(space, message);
    }

    pub fn print_summary(&self) {
        info!("Poll Statistics:");
        info!("  Total passes: {}", self.passes);
        for (space, count) in &self.passes_by_space {
            info!("    {}: {}", space, count);
        }
        info!("  Reads:");
        info!("    Successful: {}", self.reads_ok);
        info!("    Errors: {}", self.read_errors);
        info!("    Skipped: {}", self.skipped);
        info!("  Connection Stats:");
        info!("    Connect failures: {}", self.connect_failures);
        info!("    Invalidated addresses: {}", self.invalidated);
        for (space, message) in &self.last_errors {
            info!("    Last {} error: {}", space, message);
        }
    }
}
