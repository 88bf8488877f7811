//! Ingredient harm classifier
//!
//! A small text classifier scores each ingredient. The label vocabulary comes
//! from the model artifact, so labels stay opaque strings; only
//! [`HARMLESS_LABEL`] has meaning to the rest of the crate.

pub mod models;
pub mod vocabulary;

pub use models::{ArtifactSources, ModelManager};
pub use vocabulary::Vocabulary;

use anyhow::{Context, Result};
use ndarray::Array2;
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::{DynValue, Value},
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Label the classifier uses for ingredients that are not harmful
pub const HARMLESS_LABEL: &str = "harmless";

/// Outcome of classifying one ingredient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// Label from the model's label set
    pub label: String,
    /// Probability of the label (0.0 - 1.0, 4 decimals)
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Result used when there is nothing to classify
    pub fn harmless() -> Self {
        Self::new(HARMLESS_LABEL, 0.0)
    }

    pub fn is_harmless(&self) -> bool {
        self.label == HARMLESS_LABEL
    }
}

/// Anything that can label a short ingredient string
pub trait IngredientClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<Classification>;
}

/// Element type of the model's input tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    /// keras exports through tf2onnx usually take float token ids
    #[default]
    Float32,
    Int32,
    Int64,
}

/// Classifier backed by an ONNX export of the keras model
pub struct OnnxClassifier {
    session: Mutex<Session>,
    vocabulary: Vocabulary,
    input_name: String,
    output_name: String,
    input_type: InputType,
}

impl OnnxClassifier {
    /// Load the model and its vocabulary
    pub fn load(model_path: &Path, vocabulary_path: &Path, input_type: InputType) -> Result<Self> {
        let vocabulary = Vocabulary::load(vocabulary_path)?;

        info!("Loading ONNX classifier from {:?}", model_path);
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(model_path)
            .context("Failed to load ONNX model")?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .context("Classifier model has no inputs")?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .context("Classifier model has no outputs")?;

        info!(
            "Classifier loaded. Input: {}, Output: {}, input type: {:?}",
            input_name, output_name, input_type
        );

        Ok(Self {
            session: Mutex::new(session),
            vocabulary,
            input_name,
            output_name,
            input_type,
        })
    }

    /// Run the model on one padded sequence and return the output row
    fn predict(&self, sequence: &[i64]) -> Result<Vec<f32>> {
        let shape = (1, sequence.len());
        let mut session = self.session.lock();

        let input: DynValue = match self.input_type {
            InputType::Float32 => {
                let data: Vec<f32> = sequence.iter().map(|&v| v as f32).collect();
                Value::from_array(Array2::from_shape_vec(shape, data)?)?.into_dyn()
            }
            InputType::Int32 => {
                let data: Vec<i32> = sequence.iter().map(|&v| v as i32).collect();
                Value::from_array(Array2::from_shape_vec(shape, data)?)?.into_dyn()
            }
            InputType::Int64 => {
                Value::from_array(Array2::from_shape_vec(shape, sequence.to_vec())?)?.into_dyn()
            }
        };

        let outputs = session.run(inputs![self.input_name.as_str() => input])?;
        let row: Vec<f32> = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()?
            .iter()
            .copied()
            .collect();

        Ok(row)
    }
}

impl IngredientClassifier for OnnxClassifier {
    fn classify(&self, text: &str) -> Result<Classification> {
        let sequence = self.vocabulary.encode(text);
        let probabilities = self
            .predict(&sequence)
            .with_context(|| format!("Classifier inference failed for {:?}", text))?;

        let (index, probability) =
            argmax(&probabilities).context("Classifier produced an empty output")?;
        let label = self.vocabulary.label(index).with_context(|| {
            format!(
                "Classifier output index {} has no label ({} labels known)",
                index,
                self.vocabulary.labels.len()
            )
        })?;

        debug!("Classified {:?} as {} ({:.4})", text, label, probability);
        Ok(Classification::new(label, round_confidence(probability)))
    }
}

/// Index and value of the largest element; first one wins on ties
fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
}

/// Round to 4 decimals, clamped to the probability range
fn round_confidence(value: f32) -> f32 {
    ((value * 10_000.0).round() / 10_000.0).clamp(0.0, 1.0)
}
