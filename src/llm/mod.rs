//! Chat completion client
//!
//! Sends the context-stuffed prompt to the OpenAI chat completions API
//! as a single user message. A mock implementation backs the "mock"
//! API key for offline runs.

use crate::config::OpenAiConfig;
use crate::errors::AppError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Trait for answer generation
#[async_trait]
pub trait AnswerModel: Send + Sync {
    /// Complete a prompt and return the model's text
    async fn complete(&self, prompt: &str) -> Result<String, AppError>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI chat completions client
pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    timeout_secs: u64,
}

impl OpenAiChat {
    /// Create a new chat client from configuration
    pub fn new(config: &OpenAiConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::ModelError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.chat_model.clone(),
            base_url: config.api_base.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        })
    }

    fn build_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
        })
    }
}

#[async_trait]
impl AnswerModel for OpenAiChat {
    async fn complete(&self, prompt: &str) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.build_body(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::ModelError(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    AppError::ModelError(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(30);
            return Err(AppError::RateLimitExceeded { retry_after_secs });
        }

        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("unknown API error");
            return Err(AppError::ModelError(format!(
                "API error ({}): {}",
                status.as_u16(),
                message
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::ModelError(format!("Failed to parse response: {}", e)))?;

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock model for running without API access
pub struct MockAnswerModel;

#[async_trait]
impl AnswerModel for MockAnswerModel {
    async fn complete(&self, _prompt: &str) -> Result<String, AppError> {
        Ok("I don't know.".to_string())
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}

/// Create an answer model based on configuration
pub fn create_answer_model(config: &OpenAiConfig) -> Result<Arc<dyn AnswerModel>, AppError> {
    if config.is_mock() {
        tracing::info!("Using mock answer model");
        return Ok(Arc::new(MockAnswerModel));
    }
    Ok(Arc::new(OpenAiChat::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn test_config(base_url: &str) -> OpenAiConfig {
        OpenAiConfig {
            api_key: "sk-test".to_string(),
            api_base: base_url.to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            timeout_secs: 5,
            max_retries: 1,
            provider: "openai".to_string(),
        }
    }

    #[test]
    fn test_body_is_single_user_message_at_temperature_zero() {
        let chat = OpenAiChat::new(&test_config("http://localhost")).unwrap();
        let body = chat.build_body("What was the holding?");

        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "What was the holding?");
    }

    #[tokio::test]
    async fn test_complete_parses_choice_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer sk-test");
                then.status(200).json_body(serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": "The court affirmed."}}]
                }));
            })
            .await;

        let chat = OpenAiChat::new(&test_config(&server.base_url())).unwrap();
        let answer = chat.complete("What was the holding?").await.unwrap();

        assert_eq!(answer, "The court affirmed.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_rate_limited() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429).header("Retry-After", "12");
            })
            .await;

        let chat = OpenAiChat::new(&test_config(&server.base_url())).unwrap();
        let err = chat.complete("q").await.unwrap_err();

        assert!(matches!(
            err,
            AppError::RateLimitExceeded {
                retry_after_secs: 12
            }
        ));
    }

    #[tokio::test]
    async fn test_complete_surfaces_api_error_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(400)
                    .json_body(serde_json::json!({"error": {"message": "model not found"}}));
            })
            .await;

        let chat = OpenAiChat::new(&test_config(&server.base_url())).unwrap();
        let err = chat.complete("q").await.unwrap_err();

        match err {
            AppError::ModelError(message) => assert!(message.contains("model not found")),
            other => panic!("expected model error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mock_answer_model() {
        let model = MockAnswerModel;
        assert_eq!(model.complete("anything").await.unwrap(), "I don't know.");
        assert_eq!(model.model_name(), "mock-chat");
    }
}
