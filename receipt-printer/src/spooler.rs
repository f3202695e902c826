//! OS print spooler adapter
//!
//! Sends RAW (pass-through) jobs to installed printers. Windows uses the
//! Win32 spooler API; other platforms report `NotSupported` so callers can
//! fall through to another output.

use crate::error::{PrintError, PrintResult};
use tracing::{info, instrument, warn};

/// Print spooler capable of raw pass-through jobs
pub trait Spooler: Send + Sync {
    /// Names of installed (non-virtual) printers
    fn printers(&self) -> PrintResult<Vec<String>>;

    /// The OS default printer, if one is set
    fn default_printer(&self) -> PrintResult<Option<String>>;

    /// Open a RAW document on `printer`
    ///
    /// The returned job ends the document and releases the printer handle
    /// when dropped.
    fn start_job<'a>(&'a self, printer: &str, doc_name: &str) -> PrintResult<Box<dyn RawJob + 'a>>;
}

/// An open RAW document
pub trait RawJob {
    /// Write bytes, returning how many the spooler accepted
    fn write(&mut self, data: &[u8]) -> PrintResult<usize>;
}

/// Outcome of printer name resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPrinter {
    pub name: String,
    /// True when the configured name was unknown and the default was used
    pub substituted: bool,
}

/// Resolve a configured printer name
///
/// Empty names resolve to the OS default. Names that do not match any
/// installed printer are replaced by the OS default (`substituted = true`).
#[instrument(skip(spooler))]
pub fn resolve_printer(spooler: &dyn Spooler, configured: &str) -> PrintResult<ResolvedPrinter> {
    let default = || {
        spooler
            .default_printer()?
            .ok_or_else(|| PrintError::NotFound("No default printer".to_string()))
    };

    if configured.is_empty() {
        let name = default()?;
        info!(printer = %name, "Using default printer");
        return Ok(ResolvedPrinter {
            name,
            substituted: false,
        });
    }

    if spooler.printers()?.iter().any(|p| p == configured) {
        return Ok(ResolvedPrinter {
            name: configured.to_string(),
            substituted: false,
        });
    }

    let name = default()?;
    warn!(configured, printer = %name, "Printer not found, using default printer");
    Ok(ResolvedPrinter {
        name,
        substituted: true,
    })
}

#[cfg(windows)]
pub use windows_spooler::WindowsSpooler as SystemSpooler;

#[cfg(not(windows))]
pub use unsupported::UnsupportedSpooler as SystemSpooler;

#[cfg(windows)]
mod windows_spooler {
    use super::{RawJob, Spooler};
    use crate::error::{PrintError, PrintResult};
    use core::ffi::c_void;
    use tracing::debug;
    use windows::Win32::Graphics::Printing::{
        ClosePrinter, DOC_INFO_1W, EndDocPrinter, EndPagePrinter, EnumPrintersW,
        GetDefaultPrinterW, OpenPrinterW, PRINTER_ENUM_CONNECTIONS, PRINTER_ENUM_LOCAL,
        PRINTER_HANDLE, PRINTER_INFO_5W, StartDocPrinterW, StartPagePrinter, WritePrinter,
    };
    use windows::core::{PCWSTR, PWSTR};

    fn to_wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    /// Win32 spooler
    #[derive(Debug, Default, Clone, Copy)]
    pub struct WindowsSpooler;

    impl WindowsSpooler {
        /// Check if a port is a virtual printer port
        fn is_virtual_port(port: &str) -> bool {
            let p = port.to_lowercase();
            p == "file:"
                || p == "portprompt:"
                || p == "xpsport:"
                || p.starts_with("onenote")
                || p == "nul:"
                || p.starts_with("wfsport:")
        }
    }

    impl Spooler for WindowsSpooler {
        fn printers(&self) -> PrintResult<Vec<String>> {
            unsafe {
                let flags = PRINTER_ENUM_LOCAL | PRINTER_ENUM_CONNECTIONS;
                let mut needed: u32 = 0;
                let mut returned: u32 = 0;

                let _ = EnumPrintersW(flags, None, 5, None, &mut needed, &mut returned);

                if needed == 0 {
                    return Ok(Vec::new());
                }

                let mut buf: Vec<u8> = vec![0; needed as usize];
                EnumPrintersW(
                    flags,
                    None,
                    5,
                    Some(buf.as_mut_slice()),
                    &mut needed,
                    &mut returned,
                )
                .map_err(|_| PrintError::WindowsPrinter("EnumPrintersW failed".to_string()))?;

                let ptr = buf.as_ptr() as *const PRINTER_INFO_5W;
                let slice = std::slice::from_raw_parts(ptr, returned as usize);

                let mut result: Vec<String> = Vec::new();
                for info in slice.iter() {
                    if info.pPrinterName.is_null() {
                        continue;
                    }
                    let name = PWSTR(info.pPrinterName.0).to_string().unwrap_or_default();
                    let port = if info.pPortName.is_null() {
                        String::new()
                    } else {
                        PWSTR(info.pPortName.0).to_string().unwrap_or_default()
                    };

                    if !Self::is_virtual_port(&port) {
                        result.push(name);
                    }
                }

                Ok(result)
            }
        }

        fn default_printer(&self) -> PrintResult<Option<String>> {
            unsafe {
                let mut needed: u32 = 0;
                let _ = GetDefaultPrinterW(None, &mut needed);

                if needed == 0 {
                    return Ok(None);
                }

                let mut buf: Vec<u16> = vec![0; needed as usize];
                let ok = GetDefaultPrinterW(Some(PWSTR(buf.as_mut_ptr())), &mut needed);

                if !ok.as_bool() {
                    return Ok(None);
                }

                let name = PWSTR(buf.as_mut_ptr()).to_string().map_err(|e| {
                    PrintError::WindowsPrinter(format!("UTF-16 decode failed: {}", e))
                })?;

                Ok(Some(name))
            }
        }

        fn start_job<'a>(
            &'a self,
            printer: &str,
            doc_name: &str,
        ) -> PrintResult<Box<dyn RawJob + 'a>> {
            unsafe {
                let mut handle: PRINTER_HANDLE = PRINTER_HANDLE::default();
                let name_w = to_wide(printer);

                OpenPrinterW(PCWSTR::from_raw(name_w.as_ptr()), &mut handle, None)
                    .map_err(|_| PrintError::WindowsPrinter("OpenPrinterW failed".to_string()))?;

                let doc_name_w = to_wide(doc_name);
                let datatype_w = to_wide("RAW");
                let doc_info = DOC_INFO_1W {
                    pDocName: PWSTR(doc_name_w.as_ptr() as *mut _),
                    pOutputFile: PWSTR::null(),
                    pDatatype: PWSTR(datatype_w.as_ptr() as *mut _),
                };

                let job_id = StartDocPrinterW(handle, 1, &doc_info as *const DOC_INFO_1W);
                if job_id == 0 {
                    let _ = ClosePrinter(handle);
                    return Err(PrintError::WindowsPrinter(
                        "StartDocPrinter failed".to_string(),
                    ));
                }

                if !StartPagePrinter(handle).as_bool() {
                    let _ = EndDocPrinter(handle);
                    let _ = ClosePrinter(handle);
                    return Err(PrintError::WindowsPrinter(
                        "StartPagePrinter failed".to_string(),
                    ));
                }

                debug!(job_id, printer, "RAW job started");
                Ok(Box::new(WindowsRawJob { handle }))
            }
        }
    }

    struct WindowsRawJob {
        handle: PRINTER_HANDLE,
    }

    impl RawJob for WindowsRawJob {
        fn write(&mut self, data: &[u8]) -> PrintResult<usize> {
            let mut written: u32 = 0;
            let ok = unsafe {
                WritePrinter(
                    self.handle,
                    data.as_ptr() as *const c_void,
                    data.len() as u32,
                    &mut written,
                )
            };

            if !ok.as_bool() {
                return Err(PrintError::WindowsPrinter("WritePrinter failed".to_string()));
            }
            Ok(written as usize)
        }
    }

    impl Drop for WindowsRawJob {
        fn drop(&mut self) {
            unsafe {
                let _ = EndPagePrinter(self.handle);
                let _ = EndDocPrinter(self.handle);
                let _ = ClosePrinter(self.handle);
            }
            debug!("RAW job closed");
        }
    }
}

#[cfg(not(windows))]
mod unsupported {
    use super::{RawJob, Spooler};
    use crate::error::{PrintError, PrintResult};

    /// Spooler for platforms without raw spooler support
    #[derive(Debug, Default, Clone, Copy)]
    pub struct UnsupportedSpooler;

    impl Spooler for UnsupportedSpooler {
        fn printers(&self) -> PrintResult<Vec<String>> {
            Ok(Vec::new())
        }

        fn default_printer(&self) -> PrintResult<Option<String>> {
            Ok(None)
        }

        fn start_job<'a>(
            &'a self,
            _printer: &str,
            _doc_name: &str,
        ) -> PrintResult<Box<dyn RawJob + 'a>> {
            Err(PrintError::NotSupported(
                "Raw spooler printing requires Windows".to_string(),
            ))
        }
    }
}
