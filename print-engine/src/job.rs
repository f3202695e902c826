//! Print job

use crate::config::BackendKind;

/// One formatted order on its way to a device
///
/// Plain data: backends read it, nothing mutates it once dispatch starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJob {
    pub order_id: String,
    pub lines: Vec<String>,
    /// ESC/POS raster command for the QR code, when one could be rendered
    pub raster: Option<Vec<u8>>,
    /// Backends to try, in order
    pub backends: Vec<BackendKind>,
}

impl PrintJob {
    pub fn new(order_id: impl Into<String>, lines: Vec<String>, backends: Vec<BackendKind>) -> Self {
        Self {
            order_id: order_id.into(),
            lines,
            raster: None,
            backends,
        }
    }

    pub fn with_raster(mut self, raster: Vec<u8>) -> Self {
        self.raster = Some(raster);
        self
    }

    /// Lines joined with `\n`
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Spooler document name
    pub fn document_name(&self) -> String {
        format!("Order {}", self.order_id)
    }
}
