//! Printer configuration
//!
//! Persisted as pretty JSON. Files written by older installs use Portuguese
//! keys; those are accepted on read and rewritten with the current names on
//! the next save.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use receipt_printer::{BAUD_RATES, CANVAS_WIDTH_58MM};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{ConfigError, ConfigResult};

/// Default config file location, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/printer_config.json";

/// Output channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// OS print spooler (raw ESC/POS job)
    #[serde(alias = "windows")]
    Native,
    /// Thermal printer on a serial port
    Serial,
    /// HTML document opened in the browser
    #[serde(alias = "browser")]
    Html,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Native => "native",
            BackendKind::Serial => "serial",
            BackendKind::Html => "html",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Printer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Characters per line (20..=150)
    #[serde(alias = "largura_papel")]
    pub paper_width: usize,
    /// Backends in fallback order
    #[serde(alias = "metodos_impressao")]
    pub backends: Vec<BackendKind>,
    /// Spooler printer name; empty = OS default
    #[serde(alias = "impressora_windows")]
    pub native_printer: String,
    /// Serial port; empty = serial disabled
    #[serde(alias = "porta_serial")]
    pub serial_port: String,
    #[serde(alias = "baudrate")]
    pub baud_rate: u32,
    /// Serial read/write timeout in seconds (1..=60)
    #[serde(alias = "timeout")]
    pub timeout_secs: u64,
    /// Text code page, e.g. "cp850"
    pub encoding: String,
    /// Raster canvas width in pixels
    pub qr_canvas_width: u32,
    /// QR edge in pixels
    pub qr_size: u32,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            paper_width: 32,
            backends: vec![BackendKind::Native, BackendKind::Html],
            native_printer: String::new(),
            serial_port: String::new(),
            baud_rate: 9600,
            timeout_secs: 3,
            encoding: "cp850".to_string(),
            qr_canvas_width: CANVAS_WIDTH_58MM,
            qr_size: 150,
        }
    }
}

impl PrinterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check value ranges
    pub fn validate(&self) -> ConfigResult<()> {
        if !(20..=150).contains(&self.paper_width) {
            return Err(ConfigError::Invalid(format!(
                "paper_width must be between 20 and 150, got {}",
                self.paper_width
            )));
        }
        if !BAUD_RATES.contains(&self.baud_rate) {
            return Err(ConfigError::Invalid(format!(
                "baud_rate must be one of {:?}, got {}",
                BAUD_RATES, self.baud_rate
            )));
        }
        if !(1..=60).contains(&self.timeout_secs) {
            return Err(ConfigError::Invalid(format!(
                "timeout_secs must be between 1 and 60, got {}",
                self.timeout_secs
            )));
        }
        if self.qr_canvas_width == 0 || self.qr_size == 0 {
            return Err(ConfigError::Invalid(
                "qr_canvas_width and qr_size must be positive".to_string(),
            ));
        }
        if self.qr_size > self.qr_canvas_width {
            return Err(ConfigError::Invalid(format!(
                "qr_size ({}) exceeds qr_canvas_width ({})",
                self.qr_size, self.qr_canvas_width
            )));
        }
        Ok(())
    }
}

/// Config file bound to its path
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    config: PrinterConfig,
}

impl ConfigStore {
    /// Load and validate the config at `path`
    ///
    /// A missing file is created with default values.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            warn!("Config file not found, writing defaults");
            let store = Self {
                path,
                config: PrinterConfig::default(),
            };
            store.save()?;
            return Ok(store);
        }

        let content = std::fs::read_to_string(&path)?;
        let config: PrinterConfig = serde_json::from_str(&content)?;
        config.validate()?;

        info!(backends = ?config.backends, width = config.paper_width, "Config loaded");
        Ok(Self { path, config })
    }

    /// Wrap an in-memory config (validated) that saves to `path`
    pub fn with_config(path: impl Into<PathBuf>, config: PrinterConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            path: path.into(),
            config,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.config)?;
        std::fs::write(&self.path, content)?;
        info!(path = %self.path.display(), "Config saved");
        Ok(())
    }

    /// Validate, replace and persist
    pub fn replace(&mut self, config: PrinterConfig) -> ConfigResult<()> {
        config.validate()?;
        self.config = config;
        self.save()
    }
}
