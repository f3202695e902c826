//! Serial port backend

use receipt_printer::{PortOpener, SerialPrinter, SerialSettings, SystemPorts, TextEncoder};
use tracing::instrument;

use super::{Delivery, PrintBackend};
use crate::config::BackendKind;
use crate::error::{BackendError, BackendResult};
use crate::job::PrintJob;

/// Streams the text lines to a thermal printer on a serial port
///
/// The QR raster is not sent over serial.
pub struct SerialPrinterBackend<O: PortOpener = SystemPorts> {
    printer: SerialPrinter<O>,
    encoder: TextEncoder,
}

impl SerialPrinterBackend<SystemPorts> {
    pub fn new(settings: SerialSettings, encoder: TextEncoder) -> Self {
        Self::with_opener(settings, SystemPorts, encoder)
    }
}

impl<O: PortOpener> SerialPrinterBackend<O> {
    pub fn with_opener(settings: SerialSettings, opener: O, encoder: TextEncoder) -> Self {
        Self {
            printer: SerialPrinter::with_opener(settings, opener),
            encoder,
        }
    }
}

impl<O: PortOpener> PrintBackend for SerialPrinterBackend<O> {
    fn kind(&self) -> BackendKind {
        BackendKind::Serial
    }

    #[instrument(skip(self, job), fields(order_id = %job.order_id))]
    fn send(&self, job: &PrintJob) -> BackendResult<Delivery> {
        if self.printer.settings().port.is_empty() {
            return Err(BackendError::Configuration(
                "No serial port configured".to_string(),
            ));
        }

        self.printer.print_lines(&job.lines, &self.encoder)?;
        Ok(Delivery::delivered())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use receipt_printer::{PrintError, PrintResult, SerialLink};
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Capture {
        bytes: Arc<Mutex<Vec<u8>>>,
        opened: Arc<Mutex<usize>>,
        refuse: bool,
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.bytes.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl PortOpener for Capture {
        fn open(&self, settings: &SerialSettings) -> PrintResult<SerialLink> {
            *self.opened.lock().unwrap() += 1;
            if self.refuse {
                return Err(PrintError::NotFound(settings.port.clone()));
            }
            Ok(Box::new(self.clone()))
        }
    }

    fn settings(port: &str) -> SerialSettings {
        let mut s = SerialSettings::new(port, 9600, Duration::from_secs(3));
        s.init_pause = Duration::ZERO;
        s.line_pause = Duration::ZERO;
        s
    }

    fn job() -> PrintJob {
        PrintJob::new("7", vec!["TOTAL: R$ 3,00".to_string()], vec![]).with_raster(vec![0xFF])
    }

    #[test]
    fn test_sends_text_only() {
        let cap = Capture::default();
        let backend = SerialPrinterBackend::with_opener(settings("COM3"), cap.clone(), TextEncoder::ascii());

        backend.send(&job()).unwrap();
        let bytes = cap.bytes.lock().unwrap().clone();
        assert_eq!(bytes, b"\x1B\x40TOTAL: R$ 3,00\n\n\n\n\n\x1D\x56\x01".to_vec());
    }

    #[test]
    fn test_empty_port_skips_io() {
        let cap = Capture::default();
        let backend = SerialPrinterBackend::with_opener(settings(""), cap.clone(), TextEncoder::ascii());

        assert!(matches!(backend.send(&job()), Err(BackendError::Configuration(_))));
        assert_eq!(*cap.opened.lock().unwrap(), 0);
    }

    #[test]
    fn test_open_failure_is_device_error() {
        let cap = Capture {
            refuse: true,
            ..Default::default()
        };
        let backend = SerialPrinterBackend::with_opener(settings("COM9"), cap, TextEncoder::ascii());

        assert!(matches!(
            backend.send(&job()),
            Err(BackendError::Device(PrintError::NotFound(_)))
        ));
    }
}
