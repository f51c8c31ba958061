pub mod modbus;

pub use crate::error::TransportError;
pub use modbus::ModbusTcpTransport;

use crate::register::RegisterTable;

use async_trait::async_trait;

/// Register reads against one device.
///
/// A connection is opened at the start of each poll pass and closed at its
/// end; nothing is held between passes.
#[async_trait]
pub trait Transport: Send {
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Reads `count` consecutive registers starting at `address`, returned
    /// in address order.
    async fn read(
        &mut self,
        table: RegisterTable,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError>;

    async fn disconnect(&mut self);

    /// Human readable name of the device, for logs.
    fn target(&self) -> String;
}
