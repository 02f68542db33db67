use std::io::{self, Read};
use std::time::Duration;

use bd_core::CoreError;
use bd_core::traits::LineSource;
use serialport::SerialPort;

/// Timeout de lecture du port (les lectures ne portent que sur les octets
/// déjà disponibles, il ne sert qu'en cas de lien dégradé).
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Source vivante : port série du collecteur ESP32.
///
/// # Example
/// ```no_run
/// use bd_source::serial::SerialSource;
/// let source = SerialSource::open("/dev/ttyUSB0", 115_200).unwrap();
/// ```
pub struct SerialSource {
    port: Option<Box<dyn SerialPort>>,
    name: String,
}

impl SerialSource {
    /// Ouvre le port.
    ///
    /// # Errors
    /// Returns [`CoreError::SourceUnavailable`] if the port cannot be opened.
    pub fn open(name: &str, baud_rate: u32) -> Result<Self, CoreError> {
        let port = serialport::new(name, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| CoreError::SourceUnavailable {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        log::info!("Connecté à {name} @ {baud_rate} bauds");
        Ok(Self {
            port: Some(port),
            name: name.to_string(),
        })
    }
}

impl LineSource for SerialSource {
    fn poll(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "port fermé"))?;
        let available = port.bytes_to_read().map_err(io::Error::from)? as usize;
        if available == 0 {
            return Ok(0);
        }
        let start = buf.len();
        buf.resize(start + available, 0);
        match port.read(&mut buf[start..]) {
            Ok(n) => {
                buf.truncate(start + n);
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                buf.truncate(start);
                Ok(0)
            }
            Err(e) => {
                buf.truncate(start);
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_live(&self) -> bool {
        true
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            log::info!("Port {} fermé", self.name);
        }
    }
}
