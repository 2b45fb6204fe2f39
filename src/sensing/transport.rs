use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serialport::SerialPort;

// Set to true to log every line read from the boards
const ENABLE_LOGS: bool = false;

use crate::log_debug;

/// A newline-delimited byte stream from one board.
///
/// Opened once at program start and closed once at exit; every run in
/// between reads from the same handle.
pub trait LineTransport: Send + 'static {
    /// Next line with the terminator stripped. `Ok` with an empty string means
    /// nothing complete arrived within the read timeout.
    fn read_line(&mut self) -> Result<String>;

    /// Port name or other label for log and console messages.
    fn describe(&self) -> &str;

    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Serial link settings shared by every board.
#[derive(Debug, Clone, Copy)]
pub struct SerialOptions {
    pub baud_rate: u32,
    pub read_timeout: Duration,
}

pub struct SerialTransport {
    port_name: String,
    reader: BufReader<Box<dyn SerialPort>>,
    // Bytes of a line cut short by the read timeout, completed on the next call.
    pending: Vec<u8>,
}

impl SerialTransport {
    pub fn open(port_name: &str, options: SerialOptions) -> Result<Self> {
        let port = serialport::new(normalize_port_name(port_name), options.baud_rate)
            .timeout(options.read_timeout)
            .flow_control(serialport::FlowControl::None)
            .open()
            .with_context(|| format!("failed to open serial port {port_name}"))?;

        Ok(Self {
            port_name: port_name.to_string(),
            reader: BufReader::new(port),
            pending: Vec::new(),
        })
    }
}

impl LineTransport for SerialTransport {
    fn read_line(&mut self) -> Result<String> {
        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) => Err(anyhow!("serial port {} closed", self.port_name)),
            Ok(_) if self.pending.ends_with(b"\n") => {
                let line = String::from_utf8_lossy(&self.pending).trim().to_string();
                self.pending.clear();
                log_debug!("{} <- {:?}", self.port_name, line);
                Ok(line)
            }
            // Partial line without terminator: keep it for the next read.
            Ok(_) => Ok(String::new()),
            Err(err) if err.kind() == io::ErrorKind::TimedOut => Ok(String::new()),
            Err(err) => {
                Err(anyhow::Error::new(err).context(format!("read from {} failed", self.port_name)))
            }
        }
    }

    fn describe(&self) -> &str {
        &self.port_name
    }

    fn close(self) -> Result<()> {
        // Dropping the handle releases the OS port.
        drop(self.reader);
        Ok(())
    }
}

/// Serial ports the OS currently reports, as `(name, description)`.
pub fn available_ports() -> Result<Vec<(String, String)>> {
    let ports = serialport::available_ports().context("failed to enumerate serial ports")?;
    Ok(ports
        .into_iter()
        .map(|port| {
            let description = match port.port_type {
                serialport::SerialPortType::UsbPort(info) => format!(
                    "USB {:04x}:{:04x} {}",
                    info.vid,
                    info.pid,
                    info.product.unwrap_or_default()
                ),
                serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                serialport::SerialPortType::PciPort => "PCI".to_string(),
                serialport::SerialPortType::Unknown => "unknown".to_string(),
            };
            (port.port_name, description)
        })
        .collect())
}

// On Windows, COM ports >= 10 need the \\.\COMxx form
#[cfg(target_os = "windows")]
fn normalize_port_name(port_name: &str) -> String {
    if port_name.starts_with("COM") && !port_name.starts_with(r"\\") {
        format!(r"\\.\{}", port_name)
    } else {
        port_name.to_string()
    }
}

#[cfg(not(target_os = "windows"))]
fn normalize_port_name(port_name: &str) -> String {
    port_name.to_string()
}
