use super::{ChatMessage, LLMConfig, LLMError, LLMProvider, LLMResponse, Result, LLM};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// OpenAI-style chat completions provider.
///
/// Serves LMStudio (no auth), OpenAI (bearer token) and custom deployments
/// that expect the key in a dedicated header.
pub struct ChatCompletionsProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<ChatCompletionsChoice>,
    usage: Option<ChatCompletionsUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsChoice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsUsage {
    total_tokens: u32,
}

impl ChatCompletionsProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        match config.provider {
            LLMProvider::OpenAI if config.api_key.is_none() => {
                return Err(LLMError::Configuration("OpenAI API key required".to_string()));
            }
            LLMProvider::Custom if config.api_key.is_none() || config.endpoint.is_none() => {
                return Err(LLMError::Configuration(
                    "Custom provider requires both endpoint and API key".to_string(),
                ));
            }
            _ => {}
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> Result<&str> {
        self.config
            .endpoint_or_default()
            .ok_or_else(|| LLMError::Configuration("endpoint not configured".to_string()))
    }
}

#[async_trait]
impl LLM for ChatCompletionsProvider {
    async fn chat(&self, messages: Vec<ChatMessage>, max_tokens: u32) -> Result<LLMResponse> {
        let endpoint = self.endpoint()?;
        let request = ChatCompletionsRequest {
            model: &self.config.model,
            messages,
            max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending request to {:?} at {}", self.config.provider, endpoint);

        let mut builder = self.client.post(endpoint).json(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = match self.config.provider {
                LLMProvider::Custom => builder.header(self.config.api_key_header.as_str(), api_key),
                _ => builder.bearer_auth(api_key),
            };
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::Api {
                provider: self.config.provider.clone(),
                status,
                body,
            });
        }

        let completion: ChatCompletionsResponse = response.json().await?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LLMError::EmptyResponse(self.config.provider.clone()))?;

        Ok(LLMResponse {
            content,
            tokens_used: completion.usage.map(|u| u.total_tokens),
        })
    }

    fn provider_type(&self) -> LLMProvider {
        self.config.provider.clone()
    }
}

/// Gemini provider implementation
pub struct GeminiProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "totalTokenCount")]
    total_token_count: u32,
}

/// Split a `data:<mime>;base64,<payload>` URL into its mime type and payload
fn split_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    Some((mime, payload))
}

impl GeminiProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(LLMError::Configuration("Gemini API key required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    fn to_parts(messages: &[ChatMessage]) -> Vec<GeminiPart> {
        let mut parts = vec![GeminiPart::Text {
            text: messages
                .iter()
                .map(|msg| format!("{}: {}", msg.role, msg.text()))
                .collect::<Vec<_>>()
                .join("\n"),
        }];

        for image in messages.iter().flat_map(|msg| msg.images()) {
            if let Some((mime_type, data)) = split_data_url(image) {
                parts.push(GeminiPart::InlineData {
                    inline_data: GeminiInlineData {
                        mime_type: mime_type.to_string(),
                        data: data.to_string(),
                    },
                });
            }
        }

        parts
    }
}

#[async_trait]
impl LLM for GeminiProvider {
    async fn chat(&self, messages: Vec<ChatMessage>, max_tokens: u32) -> Result<LLMResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| LLMError::Configuration("Gemini API key not configured".to_string()))?;

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: Self::to_parts(&messages),
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: max_tokens,
                temperature: self.config.temperature,
            },
        };

        let base = self
            .config
            .endpoint_or_default()
            .ok_or_else(|| LLMError::Configuration("Gemini endpoint not configured".to_string()))?
            .trim_end_matches('/');
        let url = format!("{}/v1beta/models/{}:generateContent", base, self.config.model);

        debug!("Sending request to Gemini API");

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::Api {
                provider: LLMProvider::Gemini,
                status,
                body,
            });
        }

        let gemini_response: GeminiResponse = response.json().await?;

        let content = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| {
                c.content.parts.into_iter().find_map(|part| match part {
                    GeminiPart::Text { text } => Some(text),
                    GeminiPart::InlineData { .. } => None,
                })
            })
            .ok_or(LLMError::EmptyResponse(LLMProvider::Gemini))?;

        Ok(LLMResponse {
            content,
            tokens_used: gemini_response.usage_metadata.map(|u| u.total_token_count),
        })
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::Gemini
    }
}
