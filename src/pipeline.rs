//! Scan pipeline
//!
//! Owns the collaborators that are loaded once at startup and runs one label
//! photo through validation, OCR, extraction and analysis.

use image::ImageError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::analysis::{aggregate, KeywordSets, ScanReport};
use crate::classifier::{IngredientClassifier, ModelManager, OnnxClassifier};
use crate::config::AppConfig;
use crate::extract::extract_label;
use crate::vision::{validate_image, GoogleVisionOcr, RecognitionError, TextRecognizer};

/// Why a scan produced no report
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid image")]
    InvalidImage(#[source] ImageError),
    #[error("No text")]
    NoText,
    #[error(transparent)]
    Recognition(#[from] RecognitionError),
    #[error("Classification failed: {0:#}")]
    Classification(anyhow::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Immutable per-process scanning context
///
/// Cheap to share: every collaborator sits behind an `Arc` and none of them
/// is mutated after construction.
pub struct LabelScanner {
    recognizer: Arc<dyn TextRecognizer>,
    classifier: Arc<dyn IngredientClassifier>,
    keywords: Arc<KeywordSets>,
}

impl LabelScanner {
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        classifier: Arc<dyn IngredientClassifier>,
        keywords: KeywordSets,
    ) -> Self {
        Self {
            recognizer,
            classifier,
            keywords: Arc::new(keywords),
        }
    }

    /// Build the production scanner: Google Vision OCR and the ONNX classifier
    ///
    /// Missing classifier artifacts are downloaded first when URLs are configured.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let manager = ModelManager::new(config.artifact_sources());
        if !manager.are_artifacts_ready() {
            info!("Classifier artifacts missing, fetching");
            manager.ensure_all().await?;
        }

        let sources = manager.sources();
        let classifier = OnnxClassifier::load(
            &sources.model_path,
            &sources.vocabulary_path,
            config.classifier.input_type,
        )?;
        let recognizer = GoogleVisionOcr::new(config.vision_config())?;

        Ok(Self::new(
            Arc::new(recognizer),
            Arc::new(classifier),
            config.keyword_sets(),
        ))
    }

    pub fn keywords(&self) -> &KeywordSets {
        &self.keywords
    }

    /// Scan an uploaded label photo
    #[instrument(skip_all, fields(scan_id = %uuid::Uuid::new_v4(), bytes = image.len()))]
    pub async fn scan(&self, image: Vec<u8>) -> Result<ScanReport, ScanError> {
        let (image, info) =
            tokio::task::spawn_blocking(move || validate_image(&image).map(|info| (image, info)))
                .await
                .map_err(|e| ScanError::Internal(e.to_string()))?
                .map_err(ScanError::InvalidImage)?;
        debug!("Upload is {}x{}", info.width, info.height);

        let text = self.recognizer.recognize_text(&image).await?;
        debug!(
            "{} returned {} characters",
            self.recognizer.name(),
            text.len()
        );
        if text.trim().is_empty() {
            return Err(ScanError::NoText);
        }

        let classifier = Arc::clone(&self.classifier);
        let keywords = Arc::clone(&self.keywords);
        let report = tokio::task::spawn_blocking(move || analyze(&text, &keywords, classifier.as_ref()))
            .await
            .map_err(|e| ScanError::Internal(e.to_string()))??;

        info!(
            "Scanned {:?}: {} ingredients, animal={}, alcohol={}",
            report.product_name,
            report.ingredients_list.len(),
            report.detected.has_animal_ingredients,
            report.detected.has_alcohol
        );
        Ok(report)
    }

    /// Analyze an OCR text block directly, skipping image handling
    pub fn analyze_text(&self, text: &str) -> Result<ScanReport, ScanError> {
        analyze(text, &self.keywords, self.classifier.as_ref())
    }
}

fn analyze(
    text: &str,
    keywords: &KeywordSets,
    classifier: &dyn IngredientClassifier,
) -> Result<ScanReport, ScanError> {
    let label = extract_label(text);
    debug!(
        "Extracted product {:?} with {} ingredient tokens",
        label.product_name,
        label.ingredients.len()
    );
    aggregate(label, keywords, classifier).map_err(ScanError::Classification)
}
