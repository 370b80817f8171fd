//! External API providers for chat models.
//! Supports OpenAI-style chat completions and Gemini-style generateContent.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{GenerationConfig, LanguageModel, ProviderFamily};
use crate::types::{ChatMessage, ChatRole};

/// Harm categories configured to block-none for the Gemini family.
const GEMINI_HARM_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// External API provider for a single resolved model.
pub struct ExternalProvider {
    family: ProviderFamily,
    api_key: String,
    base_url: String,
    model: String,
    generation: GenerationConfig,
    client: Client,
}

impl ExternalProvider {
    pub fn new(
        family: ProviderFamily,
        api_key: &str,
        base_url: &str,
        model: &str,
        generation: GenerationConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(15))
            .timeout(std::time::Duration::from_secs(300))
            .tcp_nodelay(true)
            .build()?;

        Ok(Self {
            family,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            generation,
            client,
        })
    }

    /// Parse a response body as JSON, returning a clear error if the server
    /// returned HTML.
    async fn parse_json_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        endpoint: &str,
    ) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response body from {}: {}", endpoint, e))?;
        let trimmed = body.trim_start();
        if trimmed.starts_with('<') || trimmed.starts_with("<!") {
            let preview: String = trimmed.chars().take(200).collect();
            return Err(anyhow!(
                "Endpoint {} returned HTML instead of JSON (HTTP {}) — service may be down. Response: {}",
                endpoint,
                status,
                preview
            ));
        }
        serde_json::from_str::<T>(&body).map_err(|e| {
            let preview: String = body.chars().take(300).collect();
            anyhow!(
                "Failed to parse JSON from {} (HTTP {}): {}. Body: {}",
                endpoint,
                status,
                e,
                preview
            )
        })
    }

    fn openai_request_body(
        &self,
        system: Option<&str>,
        messages: &[ChatMessage],
    ) -> serde_json::Value {
        let mut wire: Vec<serde_json::Value> = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = system {
            wire.push(json!({"role": "system", "content": system}));
        }
        for message in messages {
            wire.push(json!({"role": message.role.as_str(), "content": message.content}));
        }

        json!({
            "model": self.model,
            "messages": wire,
            "max_tokens": self.generation.max_tokens,
            "temperature": self.generation.temperature,
        })
    }

    fn gemini_request_body(
        &self,
        system: Option<&str>,
        messages: &[ChatMessage],
    ) -> serde_json::Value {
        // The API has no system role in this configuration: system messages
        // are converted to human (user) content at the head of the contents.
        let mut contents: Vec<serde_json::Value> = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = system {
            contents.push(json!({"role": "user", "parts": [{"text": system}]}));
        }
        for message in messages {
            let role = match message.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "model",
            };
            contents.push(json!({"role": role, "parts": [{"text": message.content}]}));
        }

        let safety_settings: Vec<serde_json::Value> = GEMINI_HARM_CATEGORIES
            .iter()
            .map(|category| json!({"category": category, "threshold": "BLOCK_NONE"}))
            .collect();

        json!({
            "contents": contents,
            "generationConfig": {
                "temperature": self.generation.temperature,
                "maxOutputTokens": self.generation.max_tokens,
            },
            "safetySettings": safety_settings,
        })
    }

    async fn openai_generate(
        &self,
        system: Option<&str>,
        messages: &[ChatMessage],
    ) -> Result<String> {
        let endpoint = format!("{}/chat/completions", self.base_url);
        let request = self.openai_request_body(system, messages);

        let response = self
            .client
            .post(&endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("Request to {} timed out — check network connectivity", endpoint)
                } else if e.is_connect() {
                    anyhow!("Failed to connect to {}: {}", endpoint, e)
                } else {
                    anyhow!("Request to {} failed: {}", endpoint, e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await?;
            return Err(anyhow!("Chat API error ({}): {}", status, error));
        }

        let result: OpenAiResponse = Self::parse_json_response(response, &endpoint).await?;
        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("Chat API returned empty choices array"))
    }

    async fn gemini_generate(
        &self,
        system: Option<&str>,
        messages: &[ChatMessage],
    ) -> Result<String> {
        let endpoint = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = self.gemini_request_body(system, messages);

        let response = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Request to {} failed: {}", endpoint, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await?;
            return Err(anyhow!("Gemini API error ({}): {}", status, error));
        }

        let result: GeminiResponse = Self::parse_json_response(response, &endpoint).await?;
        result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| anyhow!("Gemini returned no candidates"))
    }
}

#[async_trait]
impl LanguageModel for ExternalProvider {
    async fn generate(&self, system: Option<&str>, messages: &[ChatMessage]) -> Result<String> {
        match self.family {
            ProviderFamily::OpenAi => self.openai_generate(system, messages).await,
            ProviderFamily::Gemini => self.gemini_generate(system, messages).await,
        }
    }
}

/// Response structures
#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: String,
}
