//! Tracker console client.

use std::io::Read;
use std::time::{Duration, Instant};

use anyhow::Result;
use serialport::SerialPort;

/// Find the tracker's console port by scanning USB serial bridges.
pub fn find_console_port() -> Result<String> {
    let ports = serialport::available_ports()?;
    ports
        .into_iter()
        .map(|info| info.port_name)
        .find(|name| name.contains("ttyUSB") || name.contains("ttyACM"))
        .ok_or_else(|| anyhow::anyhow!("No console port found - ensure the tracker is connected"))
}

/// Resolve a port argument - returns the port path if not "auto", otherwise auto-detects.
pub fn resolve_port(port_arg: &str) -> Result<String> {
    if port_arg == "auto" {
        find_console_port()
    } else {
        Ok(port_arg.to_string())
    }
}

/// Line-oriented reader for the tracker's log output.
pub struct DeviceClient {
    port: Box<dyn SerialPort>,
    pending: Vec<u8>,
}

impl DeviceClient {
    /// Create a new device client.
    pub fn new(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(100))
            .open()?;

        Ok(Self {
            port,
            pending: Vec::new(),
        })
    }

    /// Reset the ESP32 through the bridge's RTS line (wired to EN).
    pub fn reset(&mut self) -> Result<()> {
        self.port.write_data_terminal_ready(false)?;
        self.port.write_request_to_send(true)?;
        std::thread::sleep(Duration::from_millis(100));
        self.port.write_request_to_send(false)?;
        self.clear_buffer()
    }

    /// Clear any pending data in the serial buffer.
    pub fn clear_buffer(&mut self) -> Result<()> {
        self.port.clear(serialport::ClearBuffer::All)?;
        self.pending.clear();
        Ok(())
    }

    /// Read the next complete console line.
    ///
    /// Returns `None` when no line arrives within `timeout`.
    pub fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        let start = Instant::now();
        let mut buf = [0u8; 256];

        loop {
            if let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.pending.drain(..=end).collect();
                let text = String::from_utf8_lossy(&line);
                return Ok(Some(text.trim_end().to_string()));
            }

            if start.elapsed() >= timeout {
                return Ok(None);
            }

            match self.port.read(&mut buf) {
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Wait for a line matching `predicate`, discarding the others.
    pub fn wait_for_line<F>(&mut self, timeout: Duration, mut predicate: F) -> Result<Option<String>>
    where
        F: FnMut(&str) -> bool,
    {
        let start = Instant::now();
        while let Some(remaining) = timeout.checked_sub(start.elapsed()) {
            match self.read_line(remaining)? {
                Some(line) if predicate(&line) => return Ok(Some(line)),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        Ok(None)
    }
}
