use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RagError, Result};
use crate::retry::RetryPolicy;
use crate::state::RagConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Opaque text-completion capability: messages in, reply text out.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, messages: &[Message]) -> Result<String>;
}

/// OpenAI-compatible chat completions client.
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(config: &RagConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RagError::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: config.api_key.clone(),
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    /// Resolve the chat completions endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    async fn chat_once(&self, messages: &[Message]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });

        let mut req = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| RagError::Generation(format!("request failed: {}", e)))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| RagError::Generation(format!("failed to read response: {}", e)))?;
        if !status.is_success() {
            return Err(RagError::Generation(format!("HTTP {}: {}", status, text)));
        }

        let content = parse_completion(&text)?;
        debug!(model = %self.model, reply_len = content.len(), "completion received");
        Ok(content)
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn chat(&self, messages: &[Message]) -> Result<String> {
        self.retry
            .run("chat completion", || self.chat_once(messages))
            .await
    }
}

/// Pull `choices[0].message.content` out of a completion response body.
fn parse_completion(body: &str) -> Result<String> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| RagError::Generation(format!("failed to parse response JSON: {}", e)))?;

    if let Some(err) = json.get("error") {
        return Err(RagError::Generation(format!("backend error: {}", err)));
    }

    let choice = json["choices"]
        .get(0)
        .ok_or_else(|| RagError::Generation("response has no choices".to_string()))?;

    // A null content (e.g. refusal) is an empty reply, not a transport failure.
    Ok(choice["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string())
}


#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> LlmClient {
        let config = RagConfig {
            base_url: base_url.to_string(),
            ..RagConfig::default()
        };
        LlmClient::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_resolution() {
        assert_eq!(
            client("https://api.openai.com/v1").endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            client("http://localhost:1234/").endpoint(),
            "http://localhost:1234/v1/chat/completions"
        );
        assert_eq!(
            client("http://proxy/v1/chat/completions").endpoint(),
            "http://proxy/v1/chat/completions"
        );
    }

    #[test]
    fn test_parse_completion_content() {
        let body = r#"{"id":"chatcmpl-1","choices":[{"message":{"role":"assistant","content":"A契約,C契約"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "A契約,C契約");
    }

    #[test]
    fn test_parse_completion_null_content_is_empty() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "");
    }

    #[test]
    fn test_parse_completion_errors() {
        assert!(matches!(
            parse_completion("not json"),
            Err(RagError::Generation(_))
        ));
        assert!(matches!(
            parse_completion(r#"{"choices":[]}"#),
            Err(RagError::Generation(_))
        ));
        let err = parse_completion(r#"{"error":{"message":"invalid api key"}}"#).unwrap_err();
        assert!(err.to_string().contains("invalid api key"));
    }
}
