//! Google Cloud Vision OCR backend
//!
//! Sends the image to the `images:annotate` REST endpoint with a
//! `TEXT_DETECTION` feature and returns the full-text description of the
//! first annotation.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{RecognitionError, TextRecognizer};

pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Connection settings for the Vision API
#[derive(Debug, Clone)]
pub struct GoogleVisionConfig {
    pub endpoint: String,
    /// API key sent as the `key` query parameter
    pub api_key: Option<String>,
    /// OAuth access token sent as a bearer token
    pub access_token: Option<String>,
    pub timeout: Duration,
    /// BCP-47 language hints, e.g. `en`
    pub language_hints: Vec<String>,
}

impl Default for GoogleVisionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            access_token: None,
            timeout: Duration::from_secs(30),
            language_hints: Vec::new(),
        }
    }
}

/// OCR client for the Google Cloud Vision REST API
pub struct GoogleVisionOcr {
    client: reqwest::Client,
    config: GoogleVisionConfig,
}

impl GoogleVisionOcr {
    pub fn new(config: GoogleVisionConfig) -> Result<Self, RecognitionError> {
        if config.api_key.is_none() && config.access_token.is_none() {
            warn!("No Google Vision credentials configured; OCR requests will be rejected");
        }

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        info!("Google Vision OCR client ready ({})", config.endpoint);
        Ok(Self { client, config })
    }
}

#[async_trait]
impl TextRecognizer for GoogleVisionOcr {
    fn name(&self) -> &'static str {
        "google_vision"
    }

    async fn recognize_text(&self, image: &[u8]) -> Result<String, RecognitionError> {
        let body = build_request(image, &self.config.language_hints);

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.query(&[("key", key)]);
        }
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let payload = response.bytes().await?;
        debug!("Vision API answered {} ({} bytes)", status, payload.len());

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorEnvelope>(&payload)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&payload).into_owned());
            return Err(RecognitionError::Service(format!("{}: {}", status, message)));
        }

        let parsed: AnnotateResponse = serde_json::from_slice(&payload)
            .map_err(|e| RecognitionError::Malformed(e.to_string()))?;
        extract_text(parsed)
    }
}

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_context: Option<ImageContext>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext {
    language_hints: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Status,
}

fn build_request(image: &[u8], language_hints: &[String]) -> AnnotateRequest {
    let image_context = if language_hints.is_empty() {
        None
    } else {
        Some(ImageContext {
            language_hints: language_hints.to_vec(),
        })
    };

    AnnotateRequest {
        requests: vec![AnnotateImageRequest {
            image: ImageContent {
                content: STANDARD.encode(image),
            },
            features: vec![Feature {
                kind: "TEXT_DETECTION",
            }],
            image_context,
        }],
    }
}

/// Full text of the first annotation, or empty when nothing was found
fn extract_text(response: AnnotateResponse) -> Result<String, RecognitionError> {
    let Some(first) = response.responses.into_iter().next() else {
        return Ok(String::new());
    };

    if let Some(error) = first.error {
        if !error.message.is_empty() {
            return Err(RecognitionError::Service(format!(
                "code {}: {}",
                error.code, error.message
            )));
        }
    }

    Ok(first
        .text_annotations
        .into_iter()
        .next()
        .map(|a| a.description)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<String, RecognitionError> {
        extract_text(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_request_shape() {
        let request = build_request(b"abc", &[]);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "requests": [{
                    "image": {"content": "YWJj"},
                    "features": [{"type": "TEXT_DETECTION"}]
                }]
            })
        );
    }

    #[test]
    fn test_request_with_language_hints() {
        let request = build_request(b"abc", &["en".to_string()]);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value["requests"][0]["imageContext"]["languageHints"],
            serde_json::json!(["en"])
        );
    }

    #[test]
    fn test_first_annotation_is_full_text() {
        let text = parse(
            r#"{"responses": [{"textAnnotations": [
                {"description": "ACME\nIngredients: salt"},
                {"description": "ACME"}
            ]}]}"#,
        )
        .unwrap();
        assert_eq!(text, "ACME\nIngredients: salt");
    }

    #[test]
    fn test_no_text_is_empty_string() {
        assert_eq!(parse(r#"{"responses": [{}]}"#).unwrap(), "");
        assert_eq!(parse(r#"{"responses": []}"#).unwrap(), "");
        assert_eq!(parse(r#"{}"#).unwrap(), "");
    }

    #[test]
    fn test_service_error_is_reported() {
        let err = parse(r#"{"responses": [{"error": {"code": 3, "message": "Bad image data."}}]}"#)
            .unwrap_err();
        assert!(matches!(err, RecognitionError::Service(ref m) if m.contains("Bad image data.")));
    }

    #[test]
    fn test_empty_error_message_is_ignored() {
        let text = parse(
            r#"{"responses": [{"error": {"code": 0, "message": ""},
                "textAnnotations": [{"description": "ok"}]}]}"#,
        )
        .unwrap();
        assert_eq!(text, "ok");
    }

    #[test]
    fn test_client_builds_without_credentials() {
        assert!(GoogleVisionOcr::new(GoogleVisionConfig::default()).is_ok());
    }
}
