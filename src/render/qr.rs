//! QR code generation as inline PNG data URIs

use std::io::Cursor;

use base64::Engine;
use image::{GrayImage, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("Could not encode QR code: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("Could not write PNG: {0}")]
    Png(#[from] image::ImageError),

    #[error("QR image too large: {modules} modules at {module_size} px with a {border}-module border")]
    TooLarge {
        modules: u32,
        module_size: u32,
        border: u32,
    },
}

/// Largest accepted pixels per module
pub const MAX_MODULE_SIZE: u32 = 100;

/// Largest accepted quiet zone, in modules
pub const MAX_BORDER: u32 = 64;

/// Error correction level, as the single-letter names used in settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorCorrection {
    L,
    #[default]
    M,
    Q,
    H,
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::L => EcLevel::L,
            ErrorCorrection::M => EcLevel::M,
            ErrorCorrection::Q => EcLevel::Q,
            ErrorCorrection::H => EcLevel::H,
        }
    }
}

/// QR rendering options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrOptions {
    pub error_correction: ErrorCorrection,
    /// Pixels per module
    pub module_size: u32,
    /// Quiet zone width in modules
    pub border: u32,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            error_correction: ErrorCorrection::M,
            module_size: 10,
            border: 4,
        }
    }
}

/// Renders URLs to QR code images
#[derive(Debug, Clone, Default)]
pub struct QrGenerator {
    options: QrOptions,
}

impl QrGenerator {
    pub fn new(options: QrOptions) -> Self {
        Self { options }
    }

    /// Grayscale image of the code, black on white
    pub fn render(&self, data: &str) -> Result<GrayImage, QrError> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), self.options.error_correction.into())?;

        let modules = code.width() as u32;
        let scale = self.options.module_size.max(1);
        let border = self.options.border;
        let too_large = || QrError::TooLarge {
            modules,
            module_size: scale,
            border,
        };
        if scale > MAX_MODULE_SIZE || border > MAX_BORDER {
            return Err(too_large());
        }
        let side = border
            .checked_mul(2)
            .and_then(|b| b.checked_add(modules))
            .and_then(|m| m.checked_mul(scale))
            .ok_or_else(too_large)?;

        let mut img = GrayImage::from_pixel(side, side, Luma([255u8]));
        for (idx, color) in code.to_colors().into_iter().enumerate() {
            if color != Color::Dark {
                continue;
            }
            let mx = idx as u32 % modules + border;
            let my = idx as u32 / modules + border;
            for dy in 0..scale {
                for dx in 0..scale {
                    img.put_pixel(mx * scale + dx, my * scale + dy, Luma([0u8]));
                }
            }
        }

        Ok(img)
    }

    /// PNG bytes
    pub fn png(&self, data: &str) -> Result<Vec<u8>, QrError> {
        let img = self.render(data)?;
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        Ok(buf)
    }

    /// `data:image/png;base64,...` for embedding in an `<img>` tag
    pub fn data_uri(&self, data: &str) -> Result<String, QrError> {
        let png = self.png(data)?;
        Ok(format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png)
        ))
    }

    /// Like [`Self::data_uri`], logging and returning `None` on failure
    pub fn data_uri_or_log(&self, data: &str) -> Option<String> {
        match self.data_uri(data) {
            Ok(uri) => Some(uri),
            Err(e) => {
                tracing::warn!("QR code for {} failed: {}", data, e);
                None
            }
        }
    }
}
