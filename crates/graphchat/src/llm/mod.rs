//! Chat model interface and model-name resolution.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

pub mod external;

pub use external::ExternalProvider;

use crate::config::LlmConfig;
use crate::error::SetupError;
use crate::types::ChatMessage;

/// Provider families, distinguished by wire format and safety configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFamily {
    /// OpenAI-style chat completions: flat temperature/token-limit settings.
    OpenAi,
    /// Gemini-style generateContent: harm-category safety thresholds set to
    /// block-none, and system messages converted to human messages.
    Gemini,
}

/// Generation settings applied to every call on a provider handle.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub max_tokens: usize,
    pub temperature: f32,
}

/// Capability interface for chat models: role-tagged messages plus an
/// optional system prompt in, one text completion out.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, system: Option<&str>, messages: &[ChatMessage]) -> Result<String>;
}

/// A resolved model: the client handle plus the concrete version string
/// reported back in the response envelope.
#[derive(Clone)]
pub struct ModelSelection {
    pub llm: Arc<dyn LanguageModel>,
    pub version: String,
}

impl std::fmt::Debug for ModelSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSelection")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Human-readable model names and the provider/version pairs they map to.
const MODEL_VERSIONS: &[(&str, ProviderFamily, &str)] = &[
    ("OpenAI GPT 3.5", ProviderFamily::OpenAi, "gpt-3.5-turbo-16k"),
    ("OpenAI GPT 4", ProviderFamily::OpenAi, "gpt-4-0125-preview"),
    ("OpenAI GPT 4o", ProviderFamily::OpenAi, "gpt-4o"),
    ("Diffbot", ProviderFamily::OpenAi, "gpt-4-0125-preview"),
    ("Gemini Pro", ProviderFamily::Gemini, "gemini-1.0-pro-001"),
    ("Gemini 1.5 Pro", ProviderFamily::Gemini, "gemini-1.5-pro-preview-0409"),
];

/// Look up the provider family and version for a model name.
pub fn model_version(name: &str) -> Option<(ProviderFamily, &'static str)> {
    MODEL_VERSIONS
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, family, version)| (*family, *version))
}

/// Resolve a model name into a client handle.
///
/// Unknown names are a soft failure: logged and returned as
/// [`SetupError::UnknownModel`] for the caller to handle before proceeding.
pub fn resolve_model(
    name: &str,
    config: &LlmConfig,
    max_tokens: Option<usize>,
) -> Result<ModelSelection, SetupError> {
    let Some((family, version)) = model_version(name) else {
        error!(model = name, "unsupported model");
        return Err(SetupError::UnknownModel(name.to_string()));
    };

    info!(model = name, version, "resolved chat model");

    let generation = GenerationConfig {
        max_tokens: max_tokens.unwrap_or(config.max_tokens),
        temperature: config.temperature,
    };

    let (api_key, base_url) = match family {
        ProviderFamily::OpenAi => (&config.openai_api_key, &config.openai_base_url),
        ProviderFamily::Gemini => (&config.google_api_key, &config.google_base_url),
    };

    let provider = ExternalProvider::new(family, api_key, base_url, version, generation)
        .map_err(|e| SetupError::Connection(e.to_string()))?;

    Ok(ModelSelection {
        llm: Arc::new(provider),
        version: version.to_string(),
    })
}
