use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::ai_provider::AiProviderTrait;
use crate::error::AiError;

/// Google GenAI (Gemini) Provider
pub struct GoogleGenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GoogleGenAiProvider {
    pub const NAME: &'static str = "Google AI";

    #[must_use]
    pub fn new(client: Client, api_key: &str, model: &str, base_url: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AiProviderTrait for GoogleGenAiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let body = json!({
            "contents": [{
                "parts": [{
                    "text": prompt
                }]
            }]
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                provider: Self::NAME,
                status: status.as_u16(),
                body: error_text,
            });
        }

        let json: serde_json::Value = response.json().await?;

        // Extract text from: candidates[0].content.parts[0].text
        json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| {
                AiError::InvalidResponse(String::from("missing candidates[0].content.parts[0].text"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> GoogleGenAiProvider {
        GoogleGenAiProvider::new(Client::new(), "test-key", "gemini-1.5-flash", &server.uri())
    }

    #[tokio::test]
    async fn test_generate_extracts_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "1\n"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider_for(&server).generate("prompt").await.unwrap();
        assert_eq!(text, "1\n");
    }

    #[tokio::test]
    async fn test_generate_reports_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let err = provider_for(&server).generate("prompt").await.unwrap_err();
        match err {
            AiError::Api { status, body, .. } => {
                assert_eq!(status, 403);
                assert!(body.contains("not valid"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_generate_rejects_unexpected_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let err = provider_for(&server).generate("prompt").await.unwrap_err();
        assert!(matches!(err, AiError::InvalidResponse(_)));
    }
}
