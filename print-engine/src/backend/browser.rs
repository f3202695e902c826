//! Browser backend
//!
//! Writes the receipt to an HTML file and hands it to the platform viewer,
//! where the operator prints it with the browser's own dialog.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use super::{Delivery, PrintBackend};
use crate::config::BackendKind;
use crate::error::BackendResult;
use crate::job::PrintJob;

/// Opens a document for the user
pub trait DocumentViewer: Send + Sync {
    fn open(&self, path: &Path) -> std::io::Result<()>;
}

/// Default browser / file handler of the OS
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemViewer;

impl DocumentViewer for SystemViewer {
    fn open(&self, path: &Path) -> std::io::Result<()> {
        open::that(path)
    }
}

/// HTML fallback backend
pub struct BrowserBackend<V: DocumentViewer = SystemViewer> {
    viewer: V,
    /// Output directory; the system temp dir when unset
    dir: Option<PathBuf>,
}

impl BrowserBackend<SystemViewer> {
    pub fn new() -> Self {
        Self::with_viewer(SystemViewer)
    }
}

impl Default for BrowserBackend<SystemViewer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: DocumentViewer> BrowserBackend<V> {
    pub fn with_viewer(viewer: V) -> Self {
        Self { viewer, dir: None }
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Write the document to a kept temp file and return its path
    fn write_document(&self, job: &PrintJob) -> BackendResult<PathBuf> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("order_").suffix(".html");
        let mut file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        file.write_all(render_html(job).as_bytes())?;
        file.flush()?;

        let (_, path) = file.keep().map_err(|e| e.error)?;
        Ok(path)
    }
}

impl<V: DocumentViewer> PrintBackend for BrowserBackend<V> {
    fn kind(&self) -> BackendKind {
        BackendKind::Html
    }

    #[instrument(skip(self, job), fields(order_id = %job.order_id))]
    fn send(&self, job: &PrintJob) -> BackendResult<Delivery> {
        let path = self.write_document(job)?;
        info!(path = %path.display(), "HTML document created");

        self.viewer.open(&path)?;
        info!("HTML document opened");
        Ok(Delivery::delivered())
    }
}

/// Minimal printable page for the receipt text
pub fn render_html(job: &PrintJob) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Order {id}</title>
    <style>
        body {{ font-family: monospace; font-size: 12pt; }}
        pre {{ white-space: pre-wrap; }}
        @media print {{
            body {{ margin: 0; }}
            .actions {{ display: none; }}
        }}
    </style>
</head>
<body>
    <div class="actions">
        <button onclick="window.print()">Print</button>
    </div>
    <pre>{text}</pre>
</body>
</html>
"#,
        id = escape_html(&job.order_id),
        text = escape_html(&job.text()),
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        opened: Mutex<Vec<PathBuf>>,
        fail: bool,
    }

    impl DocumentViewer for Recorder {
        fn open(&self, path: &Path) -> std::io::Result<()> {
            if self.fail {
                return Err(std::io::Error::other("no browser"));
            }
            self.opened.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn test_writes_and_opens_document() {
        let dir = tempfile::tempdir().unwrap();
        let backend = BrowserBackend::with_viewer(Recorder::default()).output_dir(dir.path());
        let job = PrintJob::new("1042", vec!["2x Coffee <hot>".to_string()], vec![]);

        backend.send(&job).unwrap();

        let opened = backend.viewer.opened.lock().unwrap().clone();
        assert_eq!(opened.len(), 1);
        let name = opened[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("order_") && name.ends_with(".html"));

        let html = std::fs::read_to_string(&opened[0]).unwrap();
        assert!(html.contains("2x Coffee &lt;hot&gt;"));
        assert!(html.contains("@media print"));
    }

    #[test]
    fn test_viewer_failure_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = BrowserBackend::with_viewer(Recorder {
            fail: true,
            ..Default::default()
        })
        .output_dir(dir.path());
        let job = PrintJob::new("1", vec![], vec![]);

        assert!(matches!(backend.send(&job), Err(BackendError::Io(_))));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"a&b<"c">'"#), "a&amp;b&lt;&quot;c&quot;&gt;&#39;");
    }
}
