use crate::error::GenerationError;
use crate::prompt::ChatMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.1,
            max_tokens: 1_000,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChatClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    options: CompletionOptions,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiChatClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        options: CompletionOptions,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder().timeout(options.timeout).build()?;

        Ok(Self {
            client,
            endpoint: Url::parse(&format!(
                "{}/chat/completions",
                base_url.trim_end_matches('/')
            ))?,
            api_key: api_key.into(),
            options,
        })
    }
}

fn answer_from(response: CompletionResponse) -> Result<String, GenerationError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| GenerationError::Malformed("no message content in choices".to_string()))
}

#[async_trait]
impl CompletionClient for OpenAiChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        debug!(model = %self.options.model, messages = messages.len(), "requesting completion");

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model: &self.options.model,
                messages,
                temperature: self.options.temperature,
                max_tokens: self.options.max_tokens,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                details,
            });
        }

        let body = response.text().await?;
        let parsed: CompletionResponse = serde_json::from_str(&body)
            .map_err(|error| GenerationError::Malformed(error.to_string()))?;
        answer_from(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Role;

    #[test]
    fn answer_is_first_choice_trimmed() {
        let response: CompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Revenue was $4.2M.\n"}}]}"#,
        )
        .unwrap();
        assert_eq!(answer_from(response).unwrap(), "Revenue was $4.2M.");
    }

    #[test]
    fn empty_choices_are_malformed() {
        let response: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            answer_from(response),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn network_failure_is_a_generation_error() {
        let client = OpenAiChatClient::new(
            "http://127.0.0.1:9/v1",
            "sk-test",
            CompletionOptions {
                timeout: Duration::from_secs(2),
                ..CompletionOptions::default()
            },
        )
        .unwrap();

        let result = client
            .complete(&[ChatMessage::new(Role::User, "hello")])
            .await;
        assert!(matches!(result, Err(GenerationError::Http(_))));
    }
}
