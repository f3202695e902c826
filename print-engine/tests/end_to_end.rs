use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use print_engine::backend::{BrowserBackend, DocumentViewer};
use print_engine::{BackendKind, ConfigStore, PrintEngine, PrinterConfig, SchemaNormalizer, format_order};
use serde_json::json;

#[derive(Clone, Default)]
struct Opened(Arc<Mutex<Vec<PathBuf>>>);

impl DocumentViewer for Opened {
    fn open(&self, path: &Path) -> std::io::Result<()> {
        self.0.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

fn coffee_order() -> serde_json::Value {
    json!({
        "numero": "1042",
        "itens": [{ "descricao": "Coffee", "quantidade": 2, "preco": 5.50 }],
        "total": 11.00
    })
}

#[test]
fn test_coffee_receipt_layout() {
    let order = SchemaNormalizer::default().normalize(&coffee_order());
    let lines = format_order(&order, 32);

    assert!(lines.iter().any(|l| l == "2x Coffee"));
    assert!(lines.iter().any(|l| l.starts_with("TOTAL:") && l.contains("R$ 11,00")));
    assert!(lines.iter().all(|l| l.chars().count() <= 32));
}

#[test]
fn test_html_backend_receives_the_receipt() {
    let dir = tempfile::tempdir().unwrap();
    let config = PrinterConfig {
        backends: vec![BackendKind::Serial, BackendKind::Html],
        ..Default::default()
    };
    let store = ConfigStore::with_config(dir.path().join("printer.json"), config).unwrap();

    let opened = Opened::default();
    let html = BrowserBackend::with_viewer(opened.clone()).output_dir(dir.path());
    let engine = PrintEngine::builder(store).backend(Arc::new(html)).build();

    // No serial port configured: serial is skipped, browser prints
    let report = engine.print_report(&coffee_order());
    assert!(report.succeeded());
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(report.delivered_by(), Some(BackendKind::Html));

    let files = opened.0.lock().unwrap().clone();
    assert_eq!(files.len(), 1);
    let page = std::fs::read_to_string(&files[0]).unwrap();
    assert!(page.contains("2x Coffee"));
    assert!(page.contains("TOTAL: R$ 11,00"));
}

#[test]
fn test_test_receipt_prints() {
    let dir = tempfile::tempdir().unwrap();
    let config = PrinterConfig {
        backends: vec![BackendKind::Html],
        ..Default::default()
    };
    let store = ConfigStore::with_config(dir.path().join("printer.json"), config).unwrap();

    let opened = Opened::default();
    let html = BrowserBackend::with_viewer(opened.clone()).output_dir(dir.path());
    let engine = PrintEngine::builder(store).backend(Arc::new(html)).build();

    assert!(engine.print_test());
    let page = std::fs::read_to_string(&opened.0.lock().unwrap()[0]).unwrap();
    assert!(page.contains("1x Test Item"));
    assert!(page.contains("R$ 15,90"));
}

#[tokio::test]
async fn test_print_async() {
    let dir = tempfile::tempdir().unwrap();
    let config = PrinterConfig {
        backends: vec![BackendKind::Html],
        ..Default::default()
    };
    let store = ConfigStore::with_config(dir.path().join("printer.json"), config).unwrap();

    let opened = Opened::default();
    let html = BrowserBackend::with_viewer(opened.clone()).output_dir(dir.path());
    let engine = Arc::new(PrintEngine::builder(store).backend(Arc::new(html)).build());

    assert!(engine.clone().print_async(coffee_order()).await.unwrap());
    assert!(engine.print_async(json!("garbage")).await.unwrap());
    assert_eq!(opened.0.lock().unwrap().len(), 2);
}
