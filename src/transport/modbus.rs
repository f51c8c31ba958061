use crate::prelude::*;

use super::{Transport, TransportError};
use crate::register::RegisterTable;

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_modbus::client::{tcp, Context};
use tokio_modbus::prelude::*;

/// Modbus TCP client for the inverter, one connection per poll pass.
pub struct ModbusTcpTransport {
    host: String,
    port: u16,
    unit_id: u8,
    timeout: Duration,
    context: Option<Context>,
}

impl ModbusTcpTransport {
    pub fn new(inverter: &config::Inverter) -> Self {
        Self {
            host: inverter.host().to_string(),
            port: inverter.port(),
            unit_id: inverter.unit_id(),
            timeout: inverter.timeout(),
            context: None,
        }
    }
}

#[async_trait]
impl Transport for ModbusTcpTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.context.is_some() {
            return Ok(());
        }

        let target = self.target();
        debug!("connecting to {} (unit {})", target, self.unit_id);

        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(target.as_str()))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout.as_secs()))?
            .map_err(|err| TransportError::Connect {
                target: target.clone(),
                reason: err.to_string(),
            })?;
        stream.set_nodelay(true).ok();

        self.context = Some(tcp::attach_slave(stream, Slave(self.unit_id)));
        Ok(())
    }

    async fn read(
        &mut self,
        table: RegisterTable,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let timeout = self.timeout;
        let context = self.context.as_mut().ok_or(TransportError::NotConnected)?;

        trace!(
            "read function 0x{:02X} address 0x{:04X} count {}",
            u8::from(table),
            address,
            count
        );

        let request = async {
            match table {
                RegisterTable::Holding => context.read_holding_registers(address, count).await,
                RegisterTable::Input => context.read_input_registers(address, count).await,
            }
        };

        let reply = match tokio::time::timeout(timeout, request).await {
            Ok(reply) => reply.map_err(|err| TransportError::Io(err.to_string()))?,
            Err(_) => {
                // the request is still outstanding, its late reply would be
                // taken for the answer to the next one
                warn!("read 0x{:04X} from {} timed out, dropping connection", address, self.target());
                self.context = None;
                return Err(TransportError::Timeout(timeout.as_secs()));
            }
        };

        reply.map_err(exception_error)
    }

    async fn disconnect(&mut self) {
        if let Some(mut context) = self.context.take() {
            if let Err(err) = context.disconnect().await {
                debug!("disconnect from {} failed: {}", self.target(), err);
            }
        }
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn exception_error(code: Exception) -> TransportError {
    let name = format!("{:?}", code);
    TransportError::exception(u8::from(code), name)
}
