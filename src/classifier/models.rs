//! Classifier artifact management
//!
//! Handles downloading, verifying and caching the classifier model and its
//! vocabulary file.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Files that make up the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// ONNX export of the classifier network
    Model,
    /// Tokenizer word index, sequence length and labels
    Vocabulary,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::Model, ArtifactKind::Vocabulary];

    /// Display name for logs
    pub fn display_name(&self) -> &'static str {
        match self {
            ArtifactKind::Model => "Classifier Model",
            ArtifactKind::Vocabulary => "Classifier Vocabulary",
        }
    }
}

/// Where each artifact lives locally and where to fetch it from
#[derive(Debug, Clone, Default)]
pub struct ArtifactSources {
    pub model_path: PathBuf,
    pub vocabulary_path: PathBuf,
    pub model_url: Option<String>,
    pub vocabulary_url: Option<String>,
    /// Expected SHA256 of the model file, lowercase hex
    pub model_sha256: Option<String>,
}

impl ArtifactSources {
    pub fn path(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Model => &self.model_path,
            ArtifactKind::Vocabulary => &self.vocabulary_path,
        }
    }

    pub fn url(&self, kind: ArtifactKind) -> Option<&str> {
        match kind {
            ArtifactKind::Model => self.model_url.as_deref(),
            ArtifactKind::Vocabulary => self.vocabulary_url.as_deref(),
        }
    }

    pub fn expected_sha256(&self, kind: ArtifactKind) -> Option<&str> {
        match kind {
            ArtifactKind::Model => self.model_sha256.as_deref(),
            ArtifactKind::Vocabulary => None,
        }
    }
}

/// Record of downloaded artifacts
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ArtifactManifest {
    pub version: String,
    pub artifacts: Vec<ArtifactInfo>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ArtifactInfo {
    pub kind: String,
    pub filename: String,
    pub source_url: String,
    pub size_bytes: u64,
    pub sha256: String,
    /// Unix timestamp in seconds
    pub downloaded_at: u64,
}

impl Default for ArtifactManifest {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            artifacts: Vec::new(),
        }
    }
}

/// Keeps the classifier artifacts present on disk
pub struct ModelManager {
    sources: ArtifactSources,
    manifest_path: PathBuf,
}

impl ModelManager {
    /// Create a manager; the manifest lives next to the model file
    pub fn new(sources: ArtifactSources) -> Self {
        let manifest_path = sources
            .model_path
            .parent()
            .map(|dir| dir.join("manifest.json"))
            .unwrap_or_else(|| PathBuf::from("manifest.json"));
        Self {
            sources,
            manifest_path,
        }
    }

    pub fn sources(&self) -> &ArtifactSources {
        &self.sources
    }

    /// Check if an artifact is present and non-empty
    pub fn is_available(&self, kind: ArtifactKind) -> bool {
        std::fs::metadata(self.sources.path(kind))
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }

    /// Check if every artifact is present
    pub fn are_artifacts_ready(&self) -> bool {
        ArtifactKind::ALL.iter().all(|&kind| self.is_available(kind))
    }

    /// Availability and size of every artifact
    pub fn status(&self) -> Vec<(ArtifactKind, bool, Option<u64>)> {
        ArtifactKind::ALL
            .iter()
            .map(|&kind| {
                let size = std::fs::metadata(self.sources.path(kind)).ok().map(|m| m.len());
                (kind, self.is_available(kind), size)
            })
            .collect()
    }

    /// Download every missing artifact
    pub async fn ensure_all(&self) -> Result<()> {
        for kind in ArtifactKind::ALL {
            self.ensure(kind).await?;
        }
        Ok(())
    }

    /// Download an artifact if it is not already on disk
    pub async fn ensure(&self, kind: ArtifactKind) -> Result<PathBuf> {
        let path = self.sources.path(kind).to_path_buf();

        if self.is_available(kind) {
            info!("{} already available at {:?}", kind.display_name(), path);
            return Ok(path);
        }

        let Some(url) = self.sources.url(kind) else {
            anyhow::bail!(
                "{} missing at {:?} and no download URL is configured",
                kind.display_name(),
                path
            );
        };

        if std::env::var("LABEL_SCAN_OFFLINE").is_ok() {
            anyhow::bail!(
                "Offline mode: cannot download {}. Please download manually from {} and place at {:?}",
                kind.display_name(),
                url,
                path
            );
        }

        info!("Downloading {} from {}", kind.display_name(), url);
        self.download(kind, url, &path).await?;
        info!("Successfully downloaded {}", kind.display_name());

        Ok(path)
    }

    async fn download(&self, kind: ArtifactKind, url: &str, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {:?}", dir))?;
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        let response = client
            .get(url)
            .send()
            .await
            .context("Failed to send download request")?;

        if !response.status().is_success() {
            anyhow::bail!("Download failed with status {}: {}", response.status(), url);
        }

        let total_size = response.content_length();
        debug!("Download size: {:?} bytes", total_size);

        let temp_path = path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).context("Failed to create temp file")?;

        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Error reading download stream")?;
            file.write_all(&chunk).context("Failed to write to temp file")?;
            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
            debug!("{:?}: {} / {:?} bytes", kind, downloaded, total_size);
        }

        file.flush().context("Failed to flush temp file")?;
        drop(file);

        if downloaded == 0 {
            std::fs::remove_file(&temp_path).ok();
            anyhow::bail!("Downloaded {} is empty: {}", kind.display_name(), url);
        }

        let hash = format!("{:x}", hasher.finalize());
        if let Err(e) = verify_checksum(&hash, self.sources.expected_sha256(kind)) {
            std::fs::remove_file(&temp_path).ok();
            return Err(e.context(format!("Checksum mismatch for {:?}", path)));
        }

        std::fs::rename(&temp_path, path)
            .context("Failed to move downloaded file to final location")?;

        self.record_download(kind, url, downloaded, hash)
    }

    fn record_download(&self, kind: ArtifactKind, url: &str, size: u64, sha256: String) -> Result<()> {
        let mut manifest = self.load_manifest().unwrap_or_default();
        let filename = self
            .sources
            .path(kind)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let info = ArtifactInfo {
            kind: format!("{:?}", kind),
            filename,
            source_url: url.to_string(),
            size_bytes: size,
            sha256,
            downloaded_at: unix_now(),
        };

        if let Some(existing) = manifest.artifacts.iter_mut().find(|a| a.kind == info.kind) {
            *existing = info;
        } else {
            manifest.artifacts.push(info);
        }

        self.save_manifest(&manifest)
    }

    /// Load the artifact manifest
    pub fn load_manifest(&self) -> Result<ArtifactManifest> {
        if self.manifest_path.exists() {
            let content = std::fs::read_to_string(&self.manifest_path)?;
            let manifest: ArtifactManifest = serde_json::from_str(&content)?;
            Ok(manifest)
        } else {
            Ok(ArtifactManifest::default())
        }
    }

    /// Save the artifact manifest
    pub fn save_manifest(&self, manifest: &ArtifactManifest) -> Result<()> {
        let content = serde_json::to_string_pretty(manifest)?;
        std::fs::write(&self.manifest_path, content)?;
        Ok(())
    }
}

/// Compare a computed hash with the expected one, if any
fn verify_checksum(actual: &str, expected: Option<&str>) -> Result<()> {
    match expected {
        Some(expected) if !expected.eq_ignore_ascii_case(actual) => {
            anyhow::bail!("expected {}, got {}", expected, actual)
        }
        _ => Ok(()),
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
