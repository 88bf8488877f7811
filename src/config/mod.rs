//! Application Configuration
//!
//! Service settings stored in TOML format. Every section has defaults, so a
//! config file only needs the values it changes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analysis::KeywordSets;
use crate::classifier::{ArtifactSources, InputType};
use crate::vision::google::{GoogleVisionConfig, DEFAULT_ENDPOINT};

/// Environment variable overriding `server.bind_addr`
pub const ENV_BIND: &str = "LABEL_SCAN_BIND";
/// Environment variable overriding `ocr.api_key`
pub const ENV_API_KEY: &str = "GOOGLE_VISION_API_KEY";
/// Environment variable overriding `ocr.access_token`
pub const ENV_ACCESS_TOKEN: &str = "GOOGLE_VISION_ACCESS_TOKEN";

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// OCR service settings
    pub ocr: OcrSettings,
    /// Classifier artifact settings
    pub classifier: ClassifierSettings,
    /// Keyword list overrides
    pub keywords: KeywordSettings,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind_addr: String,
    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// OCR service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Vision API annotate endpoint
    pub endpoint: String,
    /// API key (prefer the environment variable)
    pub api_key: Option<String>,
    /// OAuth access token (prefer the environment variable)
    pub access_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Language hints passed to the OCR service
    pub language_hints: Vec<String>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            access_token: None,
            timeout_secs: 30,
            language_hints: Vec::new(),
        }
    }
}

/// Classifier artifact settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// ONNX model, relative paths resolve against the data directory
    pub model_path: PathBuf,
    /// Vocabulary JSON, relative paths resolve against the data directory
    pub vocabulary_path: PathBuf,
    /// Element type of the model input tensor
    pub input_type: InputType,
    /// Where to download the model from when it is missing
    pub model_url: Option<String>,
    /// Where to download the vocabulary from when it is missing
    pub vocabulary_url: Option<String>,
    /// Expected SHA256 of the downloaded model
    pub model_sha256: Option<String>,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/classifier.onnx"),
            vocabulary_path: PathBuf::from("models/vocabulary.json"),
            input_type: InputType::default(),
            model_url: None,
            vocabulary_url: None,
            model_sha256: None,
        }
    }
}

/// Keyword list overrides; unset lists use the built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordSettings {
    pub animal: Option<Vec<String>>,
    pub alcohol: Option<Vec<String>>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup; empty values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bind) = get(ENV_BIND) {
            self.server.bind_addr = bind;
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.ocr.api_key = Some(key);
        }
        if let Some(token) = get(ENV_ACCESS_TOKEN) {
            self.ocr.access_token = Some(token);
        }
    }

    /// Make relative artifact paths absolute against `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.classifier.model_path,
            &mut self.classifier.vocabulary_path,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Classifier artifact locations and sources
    pub fn artifact_sources(&self) -> ArtifactSources {
        ArtifactSources {
            model_path: self.classifier.model_path.clone(),
            vocabulary_path: self.classifier.vocabulary_path.clone(),
            model_url: self.classifier.model_url.clone(),
            vocabulary_url: self.classifier.vocabulary_url.clone(),
            model_sha256: self.classifier.model_sha256.clone(),
        }
    }

    /// OCR client settings
    pub fn vision_config(&self) -> GoogleVisionConfig {
        GoogleVisionConfig {
            endpoint: self.ocr.endpoint.clone(),
            api_key: self.ocr.api_key.clone(),
            access_token: self.ocr.access_token.clone(),
            timeout: Duration::from_secs(self.ocr.timeout_secs),
            language_hints: self.ocr.language_hints.clone(),
        }
    }

    /// Keyword sets with configured overrides applied
    pub fn keyword_sets(&self) -> KeywordSets {
        KeywordSets::with_overrides(
            self.keywords.animal.as_deref(),
            self.keywords.alcohol.as_deref(),
        )
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
