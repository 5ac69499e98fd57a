pub mod providers;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Error types for text and vision service calls
#[derive(thiserror::Error, Debug)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{provider:?} API error {status}: {body}")]
    Api {
        provider: LLMProvider,
        status: u16,
        body: String,
    },

    #[error("No response from {0:?}")]
    EmptyResponse(LLMProvider),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// LLM provider types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LLMProvider {
    LMStudio,
    OpenAI,
    /// OpenAI-compatible deployment that authenticates with a custom header
    Custom,
    Gemini,
}

pub const LMSTUDIO_ENDPOINT: &str = "http://localhost:1234/v1/chat/completions";
pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    /// Header carrying the API key for `Custom` deployments
    pub api_key_header: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::LMStudio,
            endpoint: None,
            api_key: None,
            api_key_header: "api-key".to_string(),
            model: "local-model".to_string(),
            temperature: 0.3,
            timeout_seconds: 120,
        }
    }
}

impl LLMConfig {
    /// Configured endpoint, or the provider's public one when unset.
    /// `Custom` deployments have no default.
    pub fn endpoint_or_default(&self) -> Option<&str> {
        self.endpoint.as_deref().or(match self.provider {
            LLMProvider::LMStudio => Some(LMSTUDIO_ENDPOINT),
            LLMProvider::OpenAI => Some(OPENAI_ENDPOINT),
            LLMProvider::Gemini => Some(GEMINI_BASE_URL),
            LLMProvider::Custom => None,
        })
    }
}

/// Inline image reference, usually a `data:` URL
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
}

/// One part of a multimodal message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// Message body: plain text or a list of text/image parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// Chat message for LLM communication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message carrying a prompt and one inline image
    pub fn user_with_image(text: impl Into<String>, image_data_url: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_data_url.into(),
                    },
                },
            ]),
        }
    }

    /// Concatenated text parts, images skipped
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn images(&self) -> Vec<&str> {
        match &self.content {
            MessageContent::Text(_) => Vec::new(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::ImageUrl { image_url } => Some(image_url.url.as_str()),
                    ContentPart::Text { .. } => None,
                })
                .collect(),
        }
    }
}

/// LLM response
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub tokens_used: Option<u32>,
}

/// Trait for text-generation and vision providers
#[async_trait]
pub trait LLM: Send + Sync {
    async fn chat(&self, messages: Vec<ChatMessage>, max_tokens: u32) -> Result<LLMResponse>;
    fn provider_type(&self) -> LLMProvider;
}

/// Create LLM instance based on configuration
pub fn create_llm(config: &LLMConfig) -> Result<Box<dyn LLM>> {
    match config.provider {
        LLMProvider::LMStudio | LLMProvider::OpenAI | LLMProvider::Custom => Ok(Box::new(
            providers::ChatCompletionsProvider::new(config.clone())?,
        )),
        LLMProvider::Gemini => Ok(Box::new(providers::GeminiProvider::new(config.clone())?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_message_serializes_as_content_parts() {
        let message = ChatMessage::user_with_image("Describe", "data:image/jpeg;base64,AAAA");
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["role"], "user");
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][0]["text"], "Describe");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(json["content"][1]["image_url"]["url"], "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn test_text_message_serializes_as_string() {
        let json = serde_json::to_value(ChatMessage::user("hello")).unwrap();
        assert_eq!(json["content"], "hello");
    }

    #[test]
    fn test_text_and_images_accessors() {
        let message = ChatMessage::user_with_image("prompt", "data:image/jpeg;base64,QQ==");
        assert_eq!(message.text(), "prompt");
        assert_eq!(message.images(), vec!["data:image/jpeg;base64,QQ=="]);
        assert!(ChatMessage::user("x").images().is_empty());
    }

    #[test]
    fn test_endpoint_defaults_follow_provider() {
        for (provider, expected) in [
            (LLMProvider::LMStudio, Some(LMSTUDIO_ENDPOINT)),
            (LLMProvider::OpenAI, Some(OPENAI_ENDPOINT)),
            (LLMProvider::Gemini, Some(GEMINI_BASE_URL)),
            (LLMProvider::Custom, None),
        ] {
            let config = LLMConfig {
                provider,
                ..LLMConfig::default()
            };
            assert_eq!(config.endpoint_or_default(), expected);
        }

        let config = LLMConfig {
            provider: LLMProvider::OpenAI,
            endpoint: Some("https://proxy.example.com/v1/chat/completions".to_string()),
            ..LLMConfig::default()
        };
        assert_eq!(
            config.endpoint_or_default(),
            Some("https://proxy.example.com/v1/chat/completions")
        );
    }

    #[test]
    fn test_gemini_requires_api_key() {
        let config = LLMConfig {
            provider: LLMProvider::Gemini,
            ..LLMConfig::default()
        };
        assert!(matches!(create_llm(&config), Err(LLMError::Configuration(_))));
    }
}
