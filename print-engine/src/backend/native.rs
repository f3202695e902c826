//! OS spooler backend

use receipt_printer::{
    EscPosBuilder, RawJob, Spooler, SystemSpooler, TextEncoder, encode_feed_and_cut,
    resolve_printer,
};
use tracing::{info, instrument, warn};

use super::{Delivery, PrintBackend};
use crate::config::BackendKind;
use crate::error::BackendResult;
use crate::job::PrintJob;

/// Sends the job as a RAW ESC/POS document to an installed printer
pub struct NativeSpoolerBackend<S: Spooler = SystemSpooler> {
    spooler: S,
    /// Configured printer name; empty = OS default
    printer: String,
    encoder: TextEncoder,
}

impl NativeSpoolerBackend<SystemSpooler> {
    pub fn new(printer: &str, encoder: TextEncoder) -> Self {
        Self::with_spooler(SystemSpooler::default(), printer, encoder)
    }
}

impl<S: Spooler> NativeSpoolerBackend<S> {
    pub fn with_spooler(spooler: S, printer: &str, encoder: TextEncoder) -> Self {
        Self {
            spooler,
            printer: printer.to_string(),
            encoder,
        }
    }

    /// Init, optional raster, blank line
    fn preamble(&self, job: &PrintJob) -> Vec<u8> {
        let mut b = EscPosBuilder::new(self.encoder);
        if let Some(raster) = &job.raster {
            b.raw(raster);
        }
        b.newline();
        b.build()
    }

    /// Encoded text followed by feed and cut
    fn body(&self, job: &PrintJob) -> Vec<u8> {
        let mut data = self.encoder.encode(&job.text());
        data.push(b'\n');
        data.extend_from_slice(&encode_feed_and_cut());
        data
    }
}

fn write_chunk(raw: &mut dyn RawJob, data: &[u8], chunk: &str) -> BackendResult<()> {
    let written = raw.write(data)?;
    if written < data.len() {
        warn!(chunk, written, expected = data.len(), "Short write to spooler");
    }
    Ok(())
}

impl<S: Spooler> PrintBackend for NativeSpoolerBackend<S> {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    #[instrument(skip(self, job), fields(order_id = %job.order_id, configured = %self.printer))]
    fn send(&self, job: &PrintJob) -> BackendResult<Delivery> {
        let resolved = resolve_printer(&self.spooler, &self.printer)?;

        {
            let mut raw = self
                .spooler
                .start_job(&resolved.name, &job.document_name())?;
            write_chunk(raw.as_mut(), &self.preamble(job), "preamble")?;
            write_chunk(raw.as_mut(), &self.body(job), "text")?;
        }

        info!(printer = %resolved.name, "Spooler job sent");
        if resolved.substituted {
            Ok(Delivery::substituted(resolved.name))
        } else {
            Ok(Delivery::delivered())
        }
    }
}
