//! Vision/OCR Layer
//!
//! Validates uploaded label photos and turns them into a text block.
//! Recognition is delegated to a remote OCR service behind the
//! [`TextRecognizer`] trait.

pub mod google;

pub use google::GoogleVisionOcr;

use async_trait::async_trait;
use image::ImageError;
use thiserror::Error;

/// Failure reported by an OCR backend
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// The service processed the request and reported an error
    #[error("OCR service error: {0}")]
    Service(String),
    /// The request never produced a usable response
    #[error("OCR request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The response did not have the expected shape
    #[error("OCR response malformed: {0}")]
    Malformed(String),
}

/// Anything that can read the text printed in an image
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Recognize all text in an encoded image; empty when none is found
    async fn recognize_text(&self, image: &[u8]) -> Result<String, RecognitionError>;
}

/// Decoded image dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

/// Check that the bytes decode as an image that converts to RGB
pub fn validate_image(bytes: &[u8]) -> Result<ImageInfo, ImageError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(ImageInfo { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 128]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_validate_png() {
        let info = validate_image(&png_bytes(3, 2)).unwrap();
        assert_eq!(info, ImageInfo { width: 3, height: 2 });
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert!(validate_image(b"definitely not an image").is_err());
        assert!(validate_image(&[]).is_err());
    }

    #[test]
    fn test_validate_rejects_truncated_png() {
        let bytes = png_bytes(8, 8);
        assert!(validate_image(&bytes[..bytes.len() / 2]).is_err());
    }
}
