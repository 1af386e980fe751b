use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use base64::Engine as _;

/// Generative-model capability consumed by the pipeline. Injected as a
/// handle so tests can substitute a double for the real API client.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> anyhow::Result<String>;

    /// Ask the image-capable model for an illustration. `Ok(None)` means
    /// the model answered without producing an image.
    async fn generate_image(&self, prompt: &str) -> anyhow::Result<Option<Vec<u8>>>;
}

/// Client for the Generative Language `generateContent` REST API.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    text_model: String,
    image_model: String,
}

impl GeminiModel {
    pub fn new(
        base_url: &str,
        api_key: &str,
        text_model: &str,
        image_model: &str,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("build http client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            text_model: text_model.to_owned(),
            image_model: image_model.to_owned(),
        })
    }

    /// Build a client with the API key taken from `GEMINI_API_KEY`.
    pub fn from_env(base_url: &str, text_model: &str, image_model: &str) -> anyhow::Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY is not set"))?;
        Self::new(base_url, &api_key, text_model, image_model)
    }

    fn endpoint(&self, model: &str) -> String {
        generate_endpoint(&self.base_url, model)
    }

    async fn generate_content(
        &self,
        model: &str,
        body: &serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        let endpoint = self.endpoint(model);
        let response = self
            .client
            .post(&endpoint)
            .header("x-goog-api-key", self.api_key.as_str())
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {endpoint}"))?;

        let status = response.status();
        let raw = response.text().await.context("read model response body")?;
        if !status.is_success() {
            let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
            anyhow::bail!("model API error ({status}): {message}");
        }

        serde_json::from_str(&raw).context("parse model response")
    }
}

#[async_trait]
impl TextModel for GeminiModel {
    async fn generate_text(&self, prompt: &str) -> anyhow::Result<String> {
        let body = serde_json::json!({
            "contents": [ { "parts": [ { "text": prompt } ] } ],
        });
        let value = self.generate_content(&self.text_model, &body).await?;
        extract_candidate_text(&value).context("extract output text")
    }

    async fn generate_image(&self, prompt: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let body = serde_json::json!({
            "contents": [ { "parts": [ { "text": prompt } ] } ],
            "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
        });
        let value = self.generate_content(&self.image_model, &body).await?;
        extract_inline_image(&value).context("extract inline image")
    }
}

pub fn generate_endpoint(base_url: &str, model: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/models/{model}:generateContent")
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

fn candidate_parts(value: &serde_json::Value) -> Option<&Vec<serde_json::Value>> {
    value
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()
}

fn extract_candidate_text(value: &serde_json::Value) -> anyhow::Result<String> {
    let parts = candidate_parts(value)
        .ok_or_else(|| anyhow::anyhow!("missing `candidates[0].content.parts` in response"))?;

    let mut text = String::new();
    for part in parts {
        let Some(part_text) = part.get("text").and_then(|v| v.as_str()) else {
            continue;
        };
        text.push_str(part_text);
    }

    if text.trim().is_empty() {
        anyhow::bail!("model output text is empty");
    }
    Ok(text.trim().to_owned())
}

fn extract_inline_image(value: &serde_json::Value) -> anyhow::Result<Option<Vec<u8>>> {
    let Some(parts) = candidate_parts(value) else {
        return Ok(None);
    };

    for part in parts {
        let Some(data) = part
            .get("inlineData")
            .and_then(|inline| inline.get("data"))
            .and_then(|v| v.as_str())
        else {
            continue;
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .context("decode inline image data")?;
        return Ok(Some(bytes));
    }

    Ok(None)
}
