//! ESC/POS command encoder
//!
//! Covers the subset receipt printing needs: reset, raster image (GS v 0),
//! paper feed and partial cut.

use image::GrayImage;
use tracing::instrument;

use crate::encoding::TextEncoder;
use crate::error::{PrintError, PrintResult};

/// ESC @ - Initialize printer
pub const INIT: [u8; 2] = [0x1B, 0x40];

/// GS V 1 - Partial cut
pub const CUT_PARTIAL: [u8; 3] = [0x1D, 0x56, 0x01];

/// Blank lines fed before cutting so the last line clears the cutter
pub const FEED_LINES: usize = 4;

/// Pixels with luma below this are printed
const DARK_THRESHOLD: u8 = 128;

/// Printer reset sequence
pub fn encode_init() -> Vec<u8> {
    INIT.to_vec()
}

/// Paper advance followed by a partial cut
pub fn encode_feed_and_cut() -> Vec<u8> {
    let mut data = vec![b'\n'; FEED_LINES];
    data.extend_from_slice(&CUT_PARTIAL);
    data
}

/// Encode a bitmap as a GS v 0 raster image
///
/// Rows are packed 8 pixels per byte, most significant bit first.
/// A set bit prints a dot; the trailing partial byte of each row is
/// zero padded.
#[instrument(skip(bitmap), fields(width = bitmap.width(), height = bitmap.height()))]
pub fn encode_raster(bitmap: &GrayImage) -> PrintResult<Vec<u8>> {
    let (width, height) = bitmap.dimensions();
    let x_bytes = width.div_ceil(8);

    if x_bytes > u16::MAX as u32 || height > u16::MAX as u32 {
        return Err(PrintError::Encoding(format!(
            "Raster too large: {}x{}",
            width, height
        )));
    }

    let mut data = Vec::with_capacity(8 + (x_bytes * height) as usize);

    // GS v 0 m xL xH yL yH
    data.extend_from_slice(&[0x1D, 0x76, 0x30, 0x00]);
    data.extend_from_slice(&(x_bytes as u16).to_le_bytes());
    data.extend_from_slice(&(height as u16).to_le_bytes());

    for y in 0..height {
        for x_byte in 0..x_bytes {
            let mut byte = 0u8;
            for bit in 0..8 {
                let x = x_byte * 8 + bit;
                if x < width && bitmap.get_pixel(x, y)[0] < DARK_THRESHOLD {
                    byte |= 1 << (7 - bit);
                }
            }
            data.push(byte);
        }
    }

    Ok(data)
}

/// ESC/POS payload builder
///
/// Accumulates commands and pre-encoded text into one byte buffer.
pub struct EscPosBuilder {
    buf: Vec<u8>,
    encoder: TextEncoder,
}

impl EscPosBuilder {
    /// Create a builder that starts with the printer reset sequence
    pub fn new(encoder: TextEncoder) -> Self {
        let mut buf = Vec::with_capacity(4096);
        buf.extend_from_slice(&INIT);
        Self { buf, encoder }
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        let bytes = self.encoder.encode(s);
        self.buf.extend_from_slice(&bytes);
        self.buf.push(b'\n');
        self
    }

    /// Write every line
    pub fn lines<S: AsRef<str>>(&mut self, lines: &[S]) -> &mut Self {
        for l in lines {
            self.line(l.as_ref());
        }
        self
    }

    /// Write empty line
    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(b'\n');
        self
    }

    /// Write raw bytes directly
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Feed paper and cut (partial)
    pub fn feed_and_cut(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&encode_feed_and_cut());
        self
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_raster_header_and_body_length() {
        for (w, h) in [(1u32, 1u32), (8, 3), (9, 2), (384, 150), (13, 7)] {
            let img = GrayImage::from_pixel(w, h, Luma([255]));
            let data = encode_raster(&img).unwrap();
            let x_bytes = w.div_ceil(8);

            assert_eq!(&data[..4], &[0x1D, 0x76, 0x30, 0x00]);
            assert_eq!(u16::from_le_bytes([data[4], data[5]]) as u32, x_bytes);
            assert_eq!(u16::from_le_bytes([data[6], data[7]]) as u32, h);
            assert_eq!(data.len() - 8, (x_bytes * h) as usize);
        }
    }

    #[test]
    fn test_raster_bit_packing() {
        // 10 px wide: black, white, black, then white, last pixel black
        let mut img = GrayImage::from_pixel(10, 1, Luma([255]));
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(2, 0, Luma([0]));
        img.put_pixel(9, 0, Luma([0]));

        let data = encode_raster(&img).unwrap();
        assert_eq!(&data[8..], &[0b1010_0000, 0b0100_0000]);
    }

    #[test]
    fn test_raster_too_tall() {
        let img = GrayImage::new(8, 70_000);
        assert!(matches!(encode_raster(&img), Err(PrintError::Encoding(_))));
    }

    #[test]
    fn test_init_and_cut_sequences() {
        assert_eq!(encode_init(), vec![0x1B, 0x40]);
        assert_eq!(encode_feed_and_cut(), b"\n\n\n\n\x1D\x56\x01".to_vec());
    }

    #[test]
    fn test_builder_payload() {
        let mut b = EscPosBuilder::new(TextEncoder::ascii());
        b.lines(&["ORDER", "2x Coffee"]).feed_and_cut();

        let data = b.build();
        assert!(data.starts_with(&INIT));
        assert!(data.ends_with(&CUT_PARTIAL));
        let s = String::from_utf8_lossy(&data);
        assert!(s.contains("ORDER\n2x Coffee\n"));
    }
}
