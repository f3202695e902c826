use print_engine::{BackendKind, ConfigError, ConfigStore, PrinterConfig};

#[test]
fn test_missing_file_writes_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config").join("printer.json");

    let store = ConfigStore::load(&path).unwrap();

    assert!(path.exists());
    assert_eq!(store.config(), &PrinterConfig::default());
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("printer.json");

    let mut store = ConfigStore::load(&path).unwrap();
    store
        .replace(PrinterConfig {
            backends: vec![BackendKind::Serial, BackendKind::Html],
            serial_port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115200,
            ..Default::default()
        })
        .unwrap();

    let reloaded = ConfigStore::load(&path).unwrap();
    assert_eq!(reloaded.config(), store.config());

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"serial_port\": \"/dev/ttyUSB0\""));
}

#[test]
fn test_legacy_file_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("impressora_config.json");
    std::fs::write(
        &path,
        r#"{"metodos_impressao": ["windows", "html"], "largura_papel": 40, "baudrate": 38400}"#,
    )
    .unwrap();

    let store = ConfigStore::load(&path).unwrap();
    assert_eq!(store.config().backends, vec![BackendKind::Native, BackendKind::Html]);
    assert_eq!(store.config().paper_width, 40);
    assert_eq!(store.config().baud_rate, 38400);
}

#[test]
fn test_invalid_files_are_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{ not json").unwrap();
    assert!(matches!(ConfigStore::load(&broken), Err(ConfigError::Parse(_))));

    let out_of_range = dir.path().join("range.json");
    std::fs::write(&out_of_range, r#"{"paper_width": 300}"#).unwrap();
    assert!(matches!(ConfigStore::load(&out_of_range), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_replace_keeps_old_config_on_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ConfigStore::load(dir.path().join("printer.json")).unwrap();

    let result = store.replace(PrinterConfig {
        timeout_secs: 120,
        ..Default::default()
    });

    assert!(result.is_err());
    assert_eq!(store.config().timeout_secs, 3);
}
