//! # print-engine
//!
//! Turns loosely structured order records into printed receipts.
//!
//! ```text
//! raw JSON ─► SchemaNormalizer ─► Order ─► LayoutFormatter ─► PrintJob
//!                                                                │
//!                      PrintDispatcher ◄─────────────────────────┘
//!                        native spooler → serial port → browser (configured order)
//! ```
//!
//! Device-level encoding lives in `receipt-printer`; this crate decides
//! what goes on the paper and which output gets it.

pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod job;
pub mod layout;
pub mod logger;
pub mod normalize;
pub mod types;

pub use backend::{Delivery, PrintBackend};
pub use config::{BackendKind, ConfigStore, DEFAULT_CONFIG_PATH, PrinterConfig};
pub use dispatcher::{Attempt, DispatchReport, DispatchState, PrintDispatcher};
pub use engine::{PrintEngine, PrintEngineBuilder};
pub use error::{BackendError, ConfigError, EngineError};
pub use job::PrintJob;
pub use layout::{LayoutFormatter, format_currency, format_order, format_quantity, wrap};
pub use normalize::{FieldRule, KeyPath, SchemaNormalizer};
pub use types::{LineItem, Order};
