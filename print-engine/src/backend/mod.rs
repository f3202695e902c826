//! Output backends
//!
//! Each backend delivers a [`PrintJob`] through one channel. A send either
//! hands the job off (`Ok`) or explains why it could not (`Err`); the
//! dispatcher decides what happens next.

mod browser;
mod native;
mod serial;

pub use browser::{BrowserBackend, DocumentViewer, SystemViewer, render_html};
pub use native::NativeSpoolerBackend;
pub use serial::SerialPrinterBackend;

use crate::config::BackendKind;
use crate::error::BackendResult;
use crate::job::PrintJob;

/// Result of a successful send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Set when the configured spooler printer was unknown and another one
    /// printed the job; the engine persists it as the new configured printer
    ///
    /// Only a successful send carries it, so a job that fails on the
    /// substitute leaves the configured name untouched.
    pub substituted_printer: Option<String>,
}

impl Delivery {
    pub fn delivered() -> Self {
        Self::default()
    }

    pub fn substituted(printer: impl Into<String>) -> Self {
        Self {
            substituted_printer: Some(printer.into()),
        }
    }
}

/// Output channel
pub trait PrintBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn send(&self, job: &PrintJob) -> BackendResult<Delivery>;
}
