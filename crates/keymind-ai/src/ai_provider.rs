use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::AiError;
use crate::providers::google::GoogleGenAiProvider;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Trait for AI providers
#[async_trait]
pub trait AiProviderTrait: Send + Sync {
    /// Generate text response for a given prompt
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}

/// Connection settings for the AI provider
///
/// Holds no credential: the key is read from the user's
/// settings on every decision and handed to [`create_provider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiConfig {
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl AiConfig {
    /// Build an HTTP client that enforces the configured request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised
    pub fn build_client(&self) -> Result<Client, AiError> {
        Ok(Client::builder().timeout(self.timeout).build()?)
    }
}

/// Create a provider instance for the given credential
///
/// # Errors
///
/// Returns an error if the API key is blank.
pub fn create_provider(
    client: &Client,
    config: &AiConfig,
    api_key: &str,
) -> Result<Box<dyn AiProviderTrait>, AiError> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(AiError::MissingApiKey {
            provider: GoogleGenAiProvider::NAME,
        });
    }

    Ok(Box::new(GoogleGenAiProvider::new(
        client.clone(),
        api_key,
        &config.model,
        &config.base_url,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_key_is_rejected() {
        let config = AiConfig::default();
        let client = Client::new();

        let err = create_provider(&client, &config, "   ").err().unwrap();
        assert!(matches!(err, AiError::MissingApiKey { .. }));
    }

    #[test]
    fn test_provider_uses_configured_model() {
        let config = AiConfig {
            model: String::from("gemini-test"),
            ..AiConfig::default()
        };
        let client = Client::new();

        let provider = create_provider(&client, &config, "key").unwrap();
        assert_eq!(provider.model_name(), "gemini-test");
    }
}
