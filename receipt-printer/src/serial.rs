//! Serial (RS-232 / USB-serial) thermal printer
//!
//! Text is sent line by line with a short pause so slow printers do not
//! overrun their receive buffer. One connection per printer instance:
//! concurrent jobs wait on the connection mutex.

use std::io::Write;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, instrument};

use crate::encoding::{TextEncoder, strip_non_printable};
use crate::error::{PrintError, PrintResult};
use crate::escpos::{encode_feed_and_cut, encode_init};

/// Baud rates accepted for receipt printers
pub const BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

/// Serial connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    /// Read/write timeout
    pub timeout: Duration,
    /// Pause after the init sequence
    pub init_pause: Duration,
    /// Pause after every text line
    pub line_pause: Duration,
}

impl SerialSettings {
    pub fn new(port: &str, baud_rate: u32, timeout: Duration) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            timeout,
            init_pause: Duration::from_millis(100),
            line_pause: Duration::from_millis(10),
        }
    }
}

/// An open serial link; dropping it closes the port
pub type SerialLink = Box<dyn Write + Send>;

/// Opens serial links
pub trait PortOpener: Send + Sync {
    fn open(&self, settings: &SerialSettings) -> PrintResult<SerialLink>;
}

/// Opens real serial ports through the OS
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPorts;

struct PortLink(Box<dyn serialport::SerialPort>);

impl Write for PortLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}

impl PortOpener for SystemPorts {
    fn open(&self, settings: &SerialSettings) -> PrintResult<SerialLink> {
        let port = serialport::new(&settings.port, settings.baud_rate)
            .timeout(settings.timeout)
            .open()?;
        Ok(Box::new(PortLink(port)))
    }
}

/// List serial ports present on the system
pub fn available_ports() -> PrintResult<Vec<String>> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect())
}

/// Serial thermal printer
pub struct SerialPrinter<O: PortOpener = SystemPorts> {
    settings: SerialSettings,
    opener: O,
    connection: Mutex<Option<SerialLink>>,
}

impl SerialPrinter<SystemPorts> {
    pub fn new(settings: SerialSettings) -> Self {
        Self::with_opener(settings, SystemPorts)
    }
}

impl<O: PortOpener> SerialPrinter<O> {
    pub fn with_opener(settings: SerialSettings, opener: O) -> Self {
        Self {
            settings,
            opener,
            connection: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    /// Print text lines followed by feed and partial cut
    ///
    /// Each line has non-printable characters removed before encoding.
    /// The port is closed before returning, whether or not printing
    /// succeeded.
    #[instrument(skip(self, lines, encoder), fields(port = %self.settings.port, lines = lines.len()))]
    pub fn print_lines<S: AsRef<str>>(&self, lines: &[S], encoder: &TextEncoder) -> PrintResult<()> {
        if self.settings.port.is_empty() {
            return Err(PrintError::InvalidConfig("No serial port configured".to_string()));
        }

        let mut slot = ConnectionSlot::lock(&self.connection);
        if slot.close() {
            debug!("Closed stale serial connection");
        }

        info!(baud = self.settings.baud_rate, "Opening serial port");
        let link = slot.insert(self.opener.open(&self.settings)?);

        link.write_all(&encode_init())?;
        thread::sleep(self.settings.init_pause);

        for line in lines {
            let mut data = encoder.encode(&strip_non_printable(line.as_ref()));
            data.push(b'\n');
            link.write_all(&data)?;
            link.flush()?;
            thread::sleep(self.settings.line_pause);
        }

        link.write_all(&encode_feed_and_cut())?;
        link.flush()?;

        info!("Serial print finished");
        Ok(())
    }
}

/// Holds the connection mutex and empties the slot on drop
struct ConnectionSlot<'a> {
    guard: MutexGuard<'a, Option<SerialLink>>,
}

impl<'a> ConnectionSlot<'a> {
    fn lock(mutex: &'a Mutex<Option<SerialLink>>) -> Self {
        // A panic mid-print leaves a stale link behind; it is closed below
        let guard = mutex.lock().unwrap_or_else(|e| e.into_inner());
        Self { guard }
    }

    /// Close any open link, returning whether one was open
    fn close(&mut self) -> bool {
        self.guard.take().is_some()
    }

    fn insert(&mut self, link: SerialLink) -> &mut SerialLink {
        self.guard.insert(link)
    }
}

impl Drop for ConnectionSlot<'_> {
    fn drop(&mut self) {
        if self.close() {
            debug!("Serial port closed");
        }
    }
}
