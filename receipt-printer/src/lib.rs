//! # receipt-printer
//!
//! ESC/POS thermal printer library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS raster, init and cut commands
//! - QR code rasterization for 58mm paper
//! - Single-byte code page text encoding (CP850, CP437, ...)
//! - OS spooler printing (RAW jobs, Windows)
//! - Serial port printing
//!
//! Business logic (WHAT to print) stays in application code:
//! - Order normalization, layout and fallback → print-engine
//!
//! ## Example
//!
//! ```ignore
//! use receipt_printer::{EscPosBuilder, TextEncoder, center_on_canvas, encode_raster, render_qr};
//!
//! let qr = render_qr("1042", 150)?;
//! let canvas = center_on_canvas(&qr, 384)?;
//!
//! let mut builder = EscPosBuilder::new(TextEncoder::new("cp850"));
//! builder.raw(&encode_raster(&canvas)?);
//! builder.newline();
//! builder.line("Pedido: 1042");
//! builder.feed_and_cut();
//! let bytes = builder.build();
//! ```

mod encoding;
mod error;
mod escpos;
mod raster;
mod serial;
mod spooler;

// Re-exports
pub use encoding::{FALLBACK_CODE_PAGE, TextEncoder, strip_non_printable};
pub use error::{PrintError, PrintResult};
pub use escpos::{EscPosBuilder, encode_feed_and_cut, encode_init, encode_raster};
pub use raster::{CANVAS_WIDTH_58MM, center_on_canvas, left_margin, render_qr};
pub use serial::{
    BAUD_RATES, PortOpener, SerialLink, SerialPrinter, SerialSettings, SystemPorts,
    available_ports,
};
pub use spooler::{RawJob, ResolvedPrinter, Spooler, SystemSpooler, resolve_printer};

/// Monochrome bitmap type used for raster printing
pub use image::GrayImage;
