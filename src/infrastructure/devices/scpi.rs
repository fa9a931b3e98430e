//! SCPI instrument over a raw TCP socket (port 5025 by convention).

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{DeviceKind, MeasurementInstrument};

/// Line-oriented SCPI client. Commands end in `\n`; queries read one line.
///
/// Any transport failure drops the connection: a late reply left in the
/// socket would otherwise answer the next query. The next query reconnects
/// and re-sends the last `configure` settings.
#[derive(Debug)]
pub struct ScpiInstrument {
    name: String,
    address: String,
    io_timeout: Duration,
    stream: Option<BufReader<TcpStream>>,
    opened: bool,
    sample_count: Option<u32>,
}

impl ScpiInstrument {
    pub fn new(name: impl Into<String>, address: impl Into<String>, io_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            io_timeout,
            stream: None,
            opened: false,
            sample_count: None,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn stream(&mut self) -> DomainResult<&mut BufReader<TcpStream>> {
        let name = &self.name;
        self.stream
            .as_mut()
            .ok_or_else(|| DomainError::DeviceUnavailable(format!("instrument {name} is not open")))
    }

    async fn connect(&mut self) -> bool {
        match timeout(self.io_timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(stream)) => {
                debug!(instrument = %self.name, address = %self.address, "instrument connected");
                self.stream = Some(BufReader::new(stream));
                true
            }
            Ok(Err(e)) => {
                warn!(instrument = %self.name, address = %self.address, error = %e, "instrument connect failed");
                false
            }
            Err(_) => {
                warn!(instrument = %self.name, address = %self.address, "instrument connect timed out");
                false
            }
        }
    }

    /// Discard the connection together with any buffered or in-flight reply.
    fn disconnect(&mut self, cause: &DomainError) {
        if self.stream.take().is_some() {
            warn!(instrument = %self.name, error = %cause, "dropping instrument connection");
        }
    }

    /// Reconnect after a dropped connection. Never connects an instrument
    /// that was not opened.
    async fn ensure_connected(&mut self) -> DomainResult<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        if !self.opened {
            return Err(DomainError::DeviceUnavailable(format!(
                "instrument {} is not open",
                self.name
            )));
        }
        if !self.connect().await {
            return Err(DomainError::ReadFailure(format!(
                "could not reconnect to {}",
                self.address
            )));
        }
        if let Some(sample_count) = self.sample_count {
            self.apply_settings(sample_count).await?;
        }
        Ok(())
    }

    async fn apply_settings(&mut self, sample_count: u32) -> DomainResult<()> {
        // Four-wire resistance, fixed 1 MOhm range, integration over `sample_count` cycles.
        self.send("CONF:FRES 1MOHM, 0.000001MOHM").await?;
        self.send(&format!("SENSE:FRES:NPLC {sample_count}")).await
    }

    async fn send(&mut self, command: &str) -> DomainResult<()> {
        let io_timeout = self.io_timeout;
        let stream = self.stream()?;
        let line = format!("{command}\n");
        let sent = match timeout(io_timeout, stream.get_mut().write_all(line.as_bytes())).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(DomainError::ReadFailure(format!("failed to send '{command}': {e}"))),
            Err(_) => Err(DomainError::ReadFailure(format!("timed out sending '{command}'"))),
        };
        if let Err(e) = &sent {
            self.disconnect(e);
        }
        sent
    }
}

/// Parse an instrument response. Some meters append units after a comma.
pub fn parse_response(response: &str) -> DomainResult<f64> {
    let field = response.trim().split(',').next().unwrap_or_default().trim();
    field
        .parse::<f64>()
        .map_err(|_| DomainError::ReadFailure(format!("unparseable response '{}'", response.trim())))
}

#[async_trait]
impl MeasurementInstrument for ScpiInstrument {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Real
    }

    async fn open(&mut self) -> bool {
        if self.stream.is_some() {
            return true;
        }
        self.opened = self.connect().await;
        self.opened
    }

    async fn configure(&mut self, sample_count: u32) -> DomainResult<()> {
        self.sample_count = Some(sample_count);
        self.ensure_connected().await?;
        self.apply_settings(sample_count).await
    }

    async fn query(&mut self, command: &str) -> DomainResult<f64> {
        self.ensure_connected().await?;
        self.send(command).await?;
        let io_timeout = self.io_timeout;
        let stream = self.stream()?;
        let mut line = String::new();
        // `read_line` is not cancel-safe; a timed-out read leaves a partial
        // line behind, so the connection goes with it.
        let read = match timeout(io_timeout, stream.read_line(&mut line)).await {
            Ok(Ok(0)) => Err(DomainError::ReadFailure(
                "instrument closed the connection".to_string(),
            )),
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(DomainError::ReadFailure(format!("read of '{command}' failed: {e}"))),
            Err(_) => Err(DomainError::ReadFailure(format!("timed out waiting for '{command}'"))),
        };
        if let Err(e) = read {
            self.disconnect(&e);
            return Err(e);
        }
        parse_response(&line)
    }
}
