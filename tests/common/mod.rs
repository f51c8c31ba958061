#![allow(dead_code)]

use solax_monitor::catalog::Catalog;
use solax_monitor::prelude::*;
use solax_monitor::transport::{Transport, TransportError};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Factory;

impl Factory {
    /// Small holding catalog: one scaled voltage, one signed current, one
    /// 32-bit energy counter, one text block and the safety standard.
    pub fn holding_catalog() -> Catalog {
        Catalog::from_yaml(
            AddressSpace::Holding,
            r#"
space: holding
registers:
  - { address: 0x0000, length: 2, description: "Serial" }
  - { address: 0x0002, length: 1, description: "Grid voltage", scale: 0.1, unit: "V" }
  - { address: 0x0003, length: 1, description: "Battery current", scale: 0.01, unit: "A", signed: true }
  - { address: 0x0004, length: 2, description: "Energy total", scale: 0.1, unit: "kWh" }
  - { address: 0x001D, length: 1, description: "Safety standard", enumeration: safety_standard }
"#,
        )
        .expect("holding catalog")
    }

    pub fn parallel_catalog() -> Catalog {
        Catalog::from_yaml(
            AddressSpace::Parallel,
            r#"
space: parallel
registers:
  - { address: 0x0001, length: 1, description: "Master power", unit: "W", signed: true }
  - { address: 0x0002, length: 1, description: "Slave1 power", unit: "W", signed: true }
  - { address: 0x0003, length: 1, description: "Slave2 power", unit: "W", signed: true }
"#,
        )
        .expect("parallel catalog")
    }

    pub fn illegal_address() -> TransportError {
        TransportError::exception(0x02, "IllegalDataAddress")
    }
}

#[derive(Default)]
pub struct MockState {
    // Per-address scripted replies, consumed front to back. The last one
    // repeats once the script runs out.
    pub replies: HashMap<u16, Vec<Result<Vec<u16>, TransportError>>>,
    pub connect_error: Option<TransportError>,
    pub reads: Vec<(RegisterTable, u16, u16)>,
    pub connects: u64,
    pub disconnects: u64,
}

/// Transport double. Addresses without a script read as zeros of the
/// requested length. Clones share state, so a test can keep a handle after
/// boxing one for the scheduler.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, address: u16, words: Vec<u16>) -> &Self {
        self.script(address, Ok(words))
    }

    pub fn fail(&self, address: u16, err: TransportError) -> &Self {
        self.script(address, Err(err))
    }

    pub fn script(&self, address: u16, reply: Result<Vec<u16>, TransportError>) -> &Self {
        self.lock().replies.entry(address).or_default().push(reply);
        self
    }

    pub fn fail_connect(&self, err: Option<TransportError>) {
        self.lock().connect_error = err;
    }

    pub fn reads(&self) -> Vec<(RegisterTable, u16, u16)> {
        self.lock().reads.clone()
    }

    pub fn reads_of(&self, address: u16) -> usize {
        self.lock()
            .reads
            .iter()
            .filter(|(_, a, _)| *a == address)
            .count()
    }

    pub fn connects(&self) -> u64 {
        self.lock().connects
    }

    pub fn disconnects(&self) -> u64 {
        self.lock().disconnects
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.connects += 1;
        match &state.connect_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn read(
        &mut self,
        table: RegisterTable,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let mut state = self.lock();
        state.reads.push((table, address, count));

        match state.replies.get_mut(&address) {
            Some(script) if script.len() > 1 => script.remove(0),
            Some(script) if script.len() == 1 => script[0].clone(),
            _ => Ok(vec![0; count as usize]),
        }
    }

    async fn disconnect(&mut self) {
        self.lock().disconnects += 1;
    }

    fn target(&self) -> String {
        "mock".to_string()
    }
}

/// `Write` into a buffer the test can still read after handing the writer
/// to a presenter.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("buffer poisoned")).into_owned()
    }
}

impl std::io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("buffer poisoned").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
