//! QR code raster generation
//!
//! Renders a QR code to a monochrome bitmap and places it on a
//! printer-wide canvas for GS v 0 printing.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use qrcode::{Color, EcLevel, QrCode};
use tracing::{debug, instrument};

use crate::error::{PrintError, PrintResult};

/// Printable width of 58mm paper in dots
pub const CANVAS_WIDTH_58MM: u32 = 384;

/// Quiet zone around the symbol, in modules
pub const QR_BORDER: u32 = 2;

/// Pixels per module before scaling
pub const QR_MODULE_PX: u32 = 2;

const BLACK: Luma<u8> = Luma([0]);
const WHITE: Luma<u8> = Luma([255]);

/// Render `data` as a `size` x `size` QR bitmap (error correction L)
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn render_qr(data: &str, size: u32) -> PrintResult<GrayImage> {
    if size == 0 {
        return Err(PrintError::Encoding("QR size must be positive".to_string()));
    }

    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::L)
        .map_err(|e| PrintError::Encoding(format!("QR encode failed: {}", e)))?;

    let modules = code.width() as u32;
    let colors = code.to_colors();
    let side = (modules + 2 * QR_BORDER) * QR_MODULE_PX;

    let mut img = GrayImage::from_pixel(side, side, WHITE);
    for (idx, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let mx = idx as u32 % modules + QR_BORDER;
        let my = idx as u32 / modules + QR_BORDER;
        for dy in 0..QR_MODULE_PX {
            for dx in 0..QR_MODULE_PX {
                img.put_pixel(mx * QR_MODULE_PX + dx, my * QR_MODULE_PX + dy, BLACK);
            }
        }
    }

    debug!(modules, side, size, "QR symbol rendered");
    Ok(imageops::resize(&img, size, size, FilterType::Nearest))
}

/// Left offset that horizontally centers `qr_width` on `canvas_width`
pub fn left_margin(canvas_width: u32, qr_width: u32) -> u32 {
    canvas_width.saturating_sub(qr_width) / 2
}

/// Place `qr` on a white canvas, centered horizontally and anchored at the top
pub fn center_on_canvas(qr: &GrayImage, canvas_width: u32) -> PrintResult<GrayImage> {
    if qr.width() > canvas_width {
        return Err(PrintError::Encoding(format!(
            "QR width {} exceeds canvas width {}",
            qr.width(),
            canvas_width
        )));
    }

    let mut canvas = GrayImage::from_pixel(canvas_width, qr.height(), WHITE);
    let x = left_margin(canvas_width, qr.width());
    imageops::replace(&mut canvas, qr, x as i64, 0);
    Ok(canvas)
}
