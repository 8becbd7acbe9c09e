use async_trait::async_trait;
use reqwest::Client;

use crate::ai_provider::{create_provider, AiConfig};
use crate::error::AiError;

/// Asks a language model whether an activity is relevant to a task
///
/// Implementations return the model's raw answer; interpreting it is left to
/// the caller so the contract stays a plain text exchange.
#[async_trait]
pub trait RelevanceJudge: Send + Sync {
    async fn judge(&self, api_key: &str, task: &str, activity: &str) -> Result<String, AiError>;
}

/// Build the relevance prompt for a task/activity pair
#[must_use]
pub fn build_relevance_prompt(task: &str, activity: &str) -> String {
    format!(
        "Given a task and a current activity, determine if they are relevant to each other.\n\
         Output ONLY the number 1 if relevant, or 0 if not relevant.\n\
         \n\
         Task: {task}\n\
         Current Activity: {activity}\n"
    )
}

/// Relevance judge backed by the configured AI provider
pub struct AiRelevanceService {
    client: Client,
    config: AiConfig,
}

impl AiRelevanceService {
    /// Create the service
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(config: AiConfig) -> Result<Self, AiError> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl RelevanceJudge for AiRelevanceService {
    async fn judge(&self, api_key: &str, task: &str, activity: &str) -> Result<String, AiError> {
        let provider = create_provider(&self.client, &self.config, api_key)?;
        let prompt = build_relevance_prompt(task, activity);
        log::debug!(
            "Asking {} about activity '{activity}'",
            provider.model_name()
        );
        provider.generate(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_prompt_contains_task_and_activity() {
        let prompt = build_relevance_prompt("write report", "Docs - Chrome");
        assert!(prompt.contains("Task: write report"));
        assert!(prompt.contains("Current Activity: Docs - Chrome"));
        assert!(prompt.contains("Output ONLY the number 1"));
    }

    #[tokio::test]
    async fn test_judge_without_key_never_calls_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let service = AiRelevanceService::new(AiConfig {
            base_url: server.uri(),
            ..AiConfig::default()
        })
        .unwrap();

        let err = service.judge("", "task", "activity").await.unwrap_err();
        assert!(matches!(err, AiError::MissingApiKey { .. }));
    }

    #[tokio::test]
    async fn test_judge_sends_prompt_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Current Activity: Reddit - Firefox"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "0"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = AiRelevanceService::new(AiConfig {
            base_url: server.uri(),
            ..AiConfig::default()
        })
        .unwrap();

        let answer = service
            .judge("key", "write report", "Reddit - Firefox")
            .await
            .unwrap();
        assert_eq!(answer, "0");
    }

    #[tokio::test]
    async fn test_judge_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let service = AiRelevanceService::new(AiConfig {
            base_url: server.uri(),
            timeout: Duration::from_millis(100),
            ..AiConfig::default()
        })
        .unwrap();

        let err = service.judge("key", "task", "activity").await.unwrap_err();
        assert!(err.is_timeout());
    }
}
