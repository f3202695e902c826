//! Single-byte text encoding for thermal printers
//!
//! Most receipt printers ship with a DOS code page selected (CP850 or CP437).
//! This module provides utilities for:
//! - Resolving a configured code page name, with a secondary fallback
//! - Lossy encoding (unmappable characters become `?`)
//! - Stripping non-printable characters before serial transmission

use oem_cp::code_table::{ENCODING_TABLE_CP437, ENCODING_TABLE_CP850, ENCODING_TABLE_CP860};
use oem_cp::encode_string_lossy;
use tracing::{instrument, warn};

/// Code page used when the configured one is unavailable
pub const FALLBACK_CODE_PAGE: &str = "cp437";

/// Resolved text codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Codec {
    /// DOS/OEM code page (437, 850, 860)
    Oem(u16),
    /// Any encoding known to encoding_rs (windows-1252, iso-8859-1, ...)
    Whatwg(&'static encoding_rs::Encoding),
    /// Last resort: 7-bit ASCII
    Ascii,
}

/// Text encoder bound to a resolved code page
///
/// Encoding never fails: characters the code page cannot represent are
/// replaced with `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEncoder {
    codec: Codec,
}

impl TextEncoder {
    /// Resolve `name`, falling back to CP437 and then ASCII
    #[instrument]
    pub fn new(name: &str) -> Self {
        if let Some(codec) = resolve(name) {
            return Self { codec };
        }
        warn!(encoding = name, fallback = FALLBACK_CODE_PAGE, "Code page unavailable, falling back");
        if let Some(codec) = resolve(FALLBACK_CODE_PAGE) {
            return Self { codec };
        }
        warn!(encoding = name, "No code page available, using ASCII");
        Self::ascii()
    }

    /// Plain ASCII encoder
    pub fn ascii() -> Self {
        Self { codec: Codec::Ascii }
    }

    /// Name of the resolved code page
    pub fn name(&self) -> String {
        match self.codec {
            Codec::Oem(cp) => format!("cp{}", cp),
            Codec::Whatwg(enc) => enc.name().to_lowercase(),
            Codec::Ascii => "ascii".to_string(),
        }
    }

    /// Encode text, replacing unmappable characters with `?`
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self.codec {
            Codec::Oem(cp) => oem_encode(cp, text).unwrap_or_else(|| ascii_lossy(text)),
            Codec::Whatwg(enc) => whatwg_lossy(enc, text),
            Codec::Ascii => ascii_lossy(text),
        }
    }
}

impl Default for TextEncoder {
    fn default() -> Self {
        Self::new("cp850")
    }
}

/// Keep only printable ASCII (0x20..=0x7E)
pub fn strip_non_printable(line: &str) -> String {
    line.chars().filter(|c| (' '..='~').contains(c)).collect()
}

fn resolve(name: &str) -> Option<Codec> {
    let label = name.trim().to_ascii_lowercase();
    if label.is_empty() {
        return None;
    }
    if matches!(label.as_str(), "ascii" | "us-ascii") {
        return Some(Codec::Ascii);
    }
    if let Some(cp) = oem_code_page(&label) {
        return Some(Codec::Oem(cp));
    }
    encoding_rs::Encoding::for_label(label.as_bytes()).map(Codec::Whatwg)
}

/// Parse "cp850", "ibm850", "850", "pc-850" into a supported OEM code page
fn oem_code_page(label: &str) -> Option<u16> {
    let digits = ["cp", "ibm", "pc", "oem"]
        .iter()
        .find_map(|p| label.strip_prefix(p))
        .unwrap_or(label)
        .trim_start_matches(['-', '_']);
    let cp: u16 = digits.parse().ok()?;
    oem_encode(cp, "").map(|_| cp)
}

fn oem_encode(cp: u16, text: &str) -> Option<Vec<u8>> {
    match cp {
        437 => Some(encode_string_lossy(text, &ENCODING_TABLE_CP437)),
        850 => Some(encode_string_lossy(text, &ENCODING_TABLE_CP850)),
        860 => Some(encode_string_lossy(text, &ENCODING_TABLE_CP860)),
        _ => None,
    }
}

fn whatwg_lossy(enc: &'static encoding_rs::Encoding, text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c as u8);
            continue;
        }
        let (cow, _, had_errors) = enc.encode(c.encode_utf8(&mut buf));
        if had_errors {
            out.push(b'?');
        } else {
            out.extend_from_slice(&cow);
        }
    }
    out
}

fn ascii_lossy(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}
