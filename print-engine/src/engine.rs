//! Print engine facade
//!
//! Ties normalizer, layout, QR raster and dispatcher together. The active
//! configuration and its backend instances form one immutable snapshot;
//! a print clones the `Arc` up front, so reconfiguring never affects a
//! dispatch that is already running.

use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use chrono::Local;
use receipt_printer::{
    PrintResult, RawJob, SerialSettings, Spooler, SystemSpooler, TextEncoder, available_ports,
    center_on_canvas, encode_raster, render_qr,
};
use serde_json::{Value, json};
use tracing::{error, info, instrument, warn};

use crate::backend::{BrowserBackend, NativeSpoolerBackend, PrintBackend, SerialPrinterBackend};
use crate::config::{ConfigStore, PrinterConfig};
use crate::dispatcher::{DispatchReport, DispatchState, PrintDispatcher, log_transition};
use crate::error::{EngineError, EngineResult};
use crate::job::PrintJob;
use crate::layout::LayoutFormatter;
use crate::normalize::SchemaNormalizer;
use crate::types::Order;

/// Spooler shared between the engine and its native backend
#[derive(Clone)]
struct SharedSpooler(Arc<dyn Spooler>);

impl Spooler for SharedSpooler {
    fn printers(&self) -> PrintResult<Vec<String>> {
        self.0.printers()
    }

    fn default_printer(&self) -> PrintResult<Option<String>> {
        self.0.default_printer()
    }

    fn start_job<'a>(&'a self, printer: &str, doc_name: &str) -> PrintResult<Box<dyn RawJob + 'a>> {
        self.0.start_job(printer, doc_name)
    }
}

/// Configuration snapshot with the backends built from it
struct EngineState {
    config: PrinterConfig,
    dispatcher: PrintDispatcher,
}

/// Builder for [`PrintEngine`]
pub struct PrintEngineBuilder {
    store: ConfigStore,
    spooler: Arc<dyn Spooler>,
    overrides: Vec<Arc<dyn PrintBackend>>,
    normalizer: SchemaNormalizer,
}

impl PrintEngineBuilder {
    /// Use a specific spooler for native printing and printer discovery
    pub fn spooler(mut self, spooler: Arc<dyn Spooler>) -> Self {
        self.spooler = spooler;
        self
    }

    /// Replace the backend of the same kind built from the config
    ///
    /// Overrides are kept across `reconfigure`.
    pub fn backend(mut self, backend: Arc<dyn PrintBackend>) -> Self {
        self.overrides.push(backend);
        self
    }

    pub fn normalizer(mut self, normalizer: SchemaNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn build(self) -> PrintEngine {
        let engine = PrintEngine {
            state: RwLock::new(Arc::new(EngineState {
                config: PrinterConfig::default(),
                dispatcher: PrintDispatcher::new(),
            })),
            store: Mutex::new(self.store),
            spooler: self.spooler,
            overrides: self.overrides,
            normalizer: self.normalizer,
        };
        engine.refresh();
        engine
    }
}

/// Receipt print engine
pub struct PrintEngine {
    state: RwLock<Arc<EngineState>>,
    store: Mutex<ConfigStore>,
    spooler: Arc<dyn Spooler>,
    overrides: Vec<Arc<dyn PrintBackend>>,
    normalizer: SchemaNormalizer,
}

impl PrintEngine {
    /// Load the config at `path` (created with defaults if missing)
    pub fn open(path: impl AsRef<Path>) -> EngineResult<Self> {
        let store = ConfigStore::load(path.as_ref())?;
        Ok(Self::builder(store).build())
    }

    pub fn builder(store: ConfigStore) -> PrintEngineBuilder {
        PrintEngineBuilder {
            store,
            spooler: Arc::new(SystemSpooler::default()),
            overrides: Vec::new(),
            normalizer: SchemaNormalizer::default(),
        }
    }

    /// Current configuration
    pub fn config(&self) -> PrinterConfig {
        self.snapshot().config.clone()
    }

    /// Print an order record; true when some backend accepted it
    pub fn print(&self, raw: &Value) -> bool {
        self.print_report(raw).succeeded()
    }

    /// Print an order record and report every backend attempt
    #[instrument(skip(self, raw))]
    pub fn print_report(&self, raw: &Value) -> DispatchReport {
        let state = self.snapshot();

        let order = self.normalizer.normalize(raw);
        log_transition(&order.id, DispatchState::Idle, DispatchState::Formatting);
        let job = self.prepare(&state.config, &order);

        let report = state.dispatcher.dispatch(&job);
        if report.succeeded() {
            info!(order_id = %order.id, backend = ?report.delivered_by(), "Order printed");
        } else {
            error!(order_id = %order.id, attempts = report.attempts.len(), "Order not printed");
        }

        if let Some(printer) = report
            .delivery
            .as_ref()
            .and_then(|d| d.substituted_printer.as_deref())
        {
            self.persist_printer(printer);
        }
        report
    }

    /// [`print`](Self::print) on the blocking thread pool
    pub async fn print_async(self: Arc<Self>, raw: Value) -> EngineResult<bool> {
        tokio::task::spawn_blocking(move || self.print(&raw))
            .await
            .map_err(|e| EngineError::Task(e.to_string()))
    }

    /// Print a canned order to check the printer setup
    pub fn print_test(&self) -> bool {
        let now = Local::now();
        let order = json!({
            "numero": format!("TEST-{}", now.format("%H%M%S")),
            "data_pedido": now.format("%d/%m/%Y %H:%M:%S").to_string(),
            "cliente": { "nome": "Test Customer" },
            "itens": [{
                "quantidade": 1,
                "descricao": "Test Item",
                "preco": 15.90,
                "observacao": "Printer test"
            }],
            "total": 15.90,
            "observacao": "Automatic print system test"
        });
        info!("Printing test receipt");
        self.print(&order)
    }

    /// Layout lines for an order record, without printing
    pub fn preview(&self, raw: &Value) -> Vec<String> {
        let order = self.normalizer.normalize(raw);
        LayoutFormatter::new(self.snapshot().config.paper_width).format(&order)
    }

    /// Validate, persist and activate a new configuration
    #[instrument(skip(self, config))]
    pub fn reconfigure(&self, config: PrinterConfig) -> EngineResult<()> {
        self.lock_store().replace(config)?;
        self.refresh();
        info!("Print engine reconfigured");
        Ok(())
    }

    /// Installed spooler printers
    pub fn list_printers(&self) -> EngineResult<Vec<String>> {
        Ok(self.spooler.printers()?)
    }

    /// Serial ports present on the system
    pub fn list_serial_ports(&self) -> EngineResult<Vec<String>> {
        Ok(available_ports()?)
    }

    fn snapshot(&self) -> Arc<EngineState> {
        let guard = self.state.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    fn lock_store(&self) -> std::sync::MutexGuard<'_, ConfigStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Rebuild the snapshot from the stored config
    fn refresh(&self) {
        let config = self.lock_store().config().clone();
        let dispatcher = self.build_dispatcher(&config);
        let next = Arc::new(EngineState { config, dispatcher });
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = next;
    }

    fn build_dispatcher(&self, config: &PrinterConfig) -> PrintDispatcher {
        let encoder = TextEncoder::new(&config.encoding);
        let serial = SerialSettings::new(&config.serial_port, config.baud_rate, config.timeout());

        let mut dispatcher = PrintDispatcher::new()
            .with_backend(NativeSpoolerBackend::with_spooler(
                SharedSpooler(self.spooler.clone()),
                &config.native_printer,
                encoder,
            ))
            .with_backend(SerialPrinterBackend::new(serial, encoder))
            .with_backend(BrowserBackend::new());
        for backend in &self.overrides {
            dispatcher.register(backend.clone());
        }
        dispatcher
    }

    fn prepare(&self, config: &PrinterConfig, order: &Order) -> PrintJob {
        let lines = LayoutFormatter::new(config.paper_width).format(order);
        let job = PrintJob::new(&order.id, lines, config.backends.clone());

        match qr_raster(&order.id, config) {
            Ok(raster) => job.with_raster(raster),
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "QR code skipped");
                job
            }
        }
    }

    /// Remember the printer that replaced an unknown configured name
    fn persist_printer(&self, printer: &str) {
        let mut store = self.lock_store();
        let mut config = store.config().clone();
        config.native_printer = printer.to_string();

        match store.replace(config) {
            Ok(()) => {
                drop(store);
                self.refresh();
                info!(printer, "Configured printer updated");
            }
            Err(e) => warn!(printer, error = %e, "Failed to save substituted printer"),
        }
    }
}

/// QR code of `data`, centered on the raster canvas, as ESC/POS bytes
fn qr_raster(data: &str, config: &PrinterConfig) -> PrintResult<Vec<u8>> {
    let qr = render_qr(data, config.qr_size)?;
    let canvas = center_on_canvas(&qr, config.qr_canvas_width)?;
    encode_raster(&canvas)
}
