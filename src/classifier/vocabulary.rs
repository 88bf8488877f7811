//! Classifier vocabulary and text preprocessing
//!
//! Mirrors the keras `Tokenizer.texts_to_sequences` and `pad_sequences`
//! behaviour the classifier was trained with, so that a word maps to the same
//! index here as it did during training.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use super::HARMLESS_LABEL;

/// Characters keras strips from text before splitting
pub const DEFAULT_FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

/// Tokenizer state exported alongside the ONNX model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Word to index mapping (indices start at 1, 0 is padding)
    pub word_index: HashMap<String, i64>,
    /// Fixed sequence length the model expects
    pub max_len: usize,
    /// Output index to label
    pub labels: Vec<String>,
    /// Token used for out-of-vocabulary words, if the tokenizer had one
    #[serde(default)]
    pub oov_token: Option<String>,
    /// Only indices below this are kept; 0 disables the limit
    #[serde(default)]
    pub num_words: Option<i64>,
    #[serde(default = "default_lower")]
    pub lower: bool,
    #[serde(default = "default_filters")]
    pub filters: String,
    #[serde(default = "default_split")]
    pub split: String,
}

fn default_lower() -> bool {
    true
}

fn default_filters() -> String {
    DEFAULT_FILTERS.to_string()
}

fn default_split() -> String {
    " ".to_string()
}

impl Vocabulary {
    /// Load and validate a vocabulary file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vocabulary file {:?}", path))?;
        let vocabulary: Vocabulary = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse vocabulary file {:?}", path))?;
        vocabulary.validate()?;

        info!(
            "Loaded vocabulary: {} words, max_len {}, labels {:?}",
            vocabulary.word_index.len(),
            vocabulary.max_len,
            vocabulary.labels
        );
        Ok(vocabulary)
    }

    /// Check the invariants inference relies on
    pub fn validate(&self) -> Result<()> {
        if self.max_len == 0 {
            anyhow::bail!("Vocabulary max_len must be greater than zero");
        }
        if self.labels.is_empty() {
            anyhow::bail!("Vocabulary has no labels");
        }
        if self.split.is_empty() {
            anyhow::bail!("Vocabulary split string must not be empty");
        }
        if !self.labels.iter().any(|l| l == HARMLESS_LABEL) {
            warn!(
                "Vocabulary labels {:?} do not include '{}'; every ingredient will be reported harmful",
                self.labels, HARMLESS_LABEL
            );
        }
        Ok(())
    }

    /// Split text into words the way keras `text_to_word_sequence` does
    pub fn text_to_words(&self, text: &str) -> Vec<String> {
        let text = if self.lower {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        let mut translated = String::with_capacity(text.len());
        for c in text.chars() {
            if self.filters.contains(c) {
                translated.push_str(&self.split);
            } else {
                translated.push(c);
            }
        }

        translated
            .split(self.split.as_str())
            .filter(|word| !word.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Map text to word indices, unpadded
    pub fn text_to_sequence(&self, text: &str) -> Vec<i64> {
        let oov_index = self
            .oov_token
            .as_ref()
            .and_then(|token| self.word_index.get(token).copied());

        let mut sequence = Vec::new();
        for word in self.text_to_words(text) {
            match self.word_index.get(&word).copied() {
                Some(index) => match self.num_words {
                    Some(limit) if limit > 0 && index >= limit => {
                        if let Some(oov) = oov_index {
                            sequence.push(oov);
                        }
                    }
                    _ => sequence.push(index),
                },
                None => {
                    if let Some(oov) = oov_index {
                        sequence.push(oov);
                    }
                }
            }
        }
        sequence
    }

    /// Pre-truncate and pre-pad with zeros to `max_len`
    pub fn pad(&self, sequence: &[i64]) -> Vec<i64> {
        let kept = &sequence[sequence.len().saturating_sub(self.max_len)..];
        let mut padded = vec![0; self.max_len - kept.len()];
        padded.extend_from_slice(kept);
        padded
    }

    /// Full preprocessing: words, indices, padding
    pub fn encode(&self, text: &str) -> Vec<i64> {
        self.pad(&self.text_to_sequence(text))
    }

    /// Label for an output index
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }
}
