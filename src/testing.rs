//! Test doubles for the OCR and classifier collaborators

use anyhow::Result;
use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::classifier::{Classification, IngredientClassifier};
use crate::vision::{RecognitionError, TextRecognizer};

/// A small valid PNG
pub fn png_bytes() -> Vec<u8> {
    let img = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Recognizer that returns a canned text or error and counts calls
pub struct FixedRecognizer {
    result: Result<String, String>,
    calls: AtomicUsize,
}

impl FixedRecognizer {
    pub fn text(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextRecognizer for FixedRecognizer {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn recognize_text(&self, _image: &[u8]) -> Result<String, RecognitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(RecognitionError::Service)
    }
}

/// Classifier that gives every ingredient the same answer
pub struct FixedClassifier {
    result: Option<Classification>,
}

impl FixedClassifier {
    pub fn harmless() -> Self {
        Self {
            result: Some(Classification::new("harmless", 0.95)),
        }
    }

    pub fn failing() -> Self {
        Self { result: None }
    }
}

impl IngredientClassifier for FixedClassifier {
    fn classify(&self, _text: &str) -> Result<Classification> {
        match &self.result {
            Some(c) => Ok(c.clone()),
            None => anyhow::bail!("classifier unavailable"),
        }
    }
}
