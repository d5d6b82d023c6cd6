//! Item image generation
//!
//! The generator is an external collaborator: it turns a prompt into image
//! bytes or fails. `GeminiImageGenerator` talks to the Gemini
//! `generateContent` endpoint; tests and other hosts plug in their own.

use crate::config::{DEFAULT_IMAGE_CONTENT_TYPE, GENERATION_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::schedule::{display_name, is_book};
use crate::services::settings::ImageGenerationSettings;
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Raw output of a generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage>;
}

pub fn book_prompt(title: &str) -> String {
    format!(
        "The front cover of the school book titled \"{}\". Vibrant colors, educational style, high quality illustration.",
        title
    )
}

pub fn object_prompt(item: &str) -> String {
    format!(
        "A high-quality 3D render of a {} for school. Clean white background, studio lighting, professional product photography.",
        item
    )
}

/// Books get a cover illustration, everything else a product shot
pub fn prompt_for(item_name: &str) -> String {
    if is_book(item_name) {
        book_prompt(display_name(item_name))
    } else {
        object_prompt(item_name.trim())
    }
}

/// Generator backed by the Gemini image model
pub struct GeminiImageGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiImageGenerator {
    pub fn new(endpoint: &str, model: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(GENERATION_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Build a generator from settings; `None` when generation is off or has no key
    pub fn from_settings(settings: &ImageGenerationSettings) -> Result<Option<Self>> {
        match settings.active_api_key() {
            Some(key) => Ok(Some(Self::new(&settings.endpoint, &settings.model, key)?)),
            None => Ok(None),
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        tracing::debug!("Requesting image from {}", self.model);

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "imageConfig": { "aspectRatio": "1:1" } }
        });

        let response: GenerateContentResponse = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        extract_image(response)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

/// First inline image of the first candidate
fn extract_image(response: GenerateContentResponse) -> Result<GeneratedImage> {
    let inline = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().find_map(|p| p.inline_data))
        .ok_or_else(|| AppError::Generation("response contained no image".to_string()))?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(inline.data.as_bytes())
        .map_err(|e| AppError::Generation(format!("invalid image data: {}", e)))?;

    Ok(GeneratedImage {
        bytes,
        content_type: inline
            .mime_type
            .unwrap_or_else(|| DEFAULT_IMAGE_CONTENT_TYPE.to_string()),
    })
}
