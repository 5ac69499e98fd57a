use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::llm::{LLMConfig, LLMProvider};

/// Configuration for the sports news generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Frame sampling and grouping
    pub sampling: SamplingConfig,

    /// Audio extraction settings
    pub audio: AudioConfig,

    /// Speech-to-text settings
    pub transcription: TranscriptionConfig,

    /// Text and vision service settings
    pub llm: LLMConfig,

    /// Article generation defaults
    pub article: ArticleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Target samples per second of video
    pub target_fps: f64,

    /// Frames per group
    pub group_size: usize,

    /// Stride used when the native frame rate cannot be read
    pub fallback_stride: u32,

    /// Working directory for extracted frames, wiped and recreated per run.
    /// Unset means a fresh uniquely named directory under the system temp dir.
    pub frames_dir: Option<PathBuf>,

    /// JPEG quality passed to ffmpeg (2 = best, 31 = worst)
    pub jpeg_quality: u8,

    /// Accepted video container extensions
    pub supported_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Target sample rate for transcription
    pub target_sample_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum WhisperBackend {
    /// Probe whisper.cpp first, then Python Whisper
    Auto,
    Cpp,
    Python,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub backend: WhisperBackend,

    /// Whisper model name
    pub model: String,

    /// Directory holding ggml models for whisper.cpp
    pub model_dir: PathBuf,

    /// Timeout for the whole transcription (seconds)
    pub timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleConfig {
    /// Spoken language hint when none is given
    pub default_spoken_language: Option<String>,

    /// Output language when none is given
    pub default_language: String,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            target_fps: 1.0,
            group_size: 5,
            fallback_stride: 30,
            frames_dir: None,
            jpeg_quality: 2,
            supported_extensions: vec![
                "mp4".to_string(),
                "mkv".to_string(),
                "mov".to_string(),
                "avi".to_string(),
            ],
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // Optimal for Whisper
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            backend: WhisperBackend::Auto,
            model: "medium".to_string(),
            model_dir: PathBuf::from("models"),
            timeout: 1800,
        }
    }
}

impl Default for ArticleConfig {
    fn default() -> Self {
        Self {
            default_spoken_language: Some("en".to_string()),
            default_language: "English".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sampling: SamplingConfig::default(),
            audio: AudioConfig::default(),
            transcription: TranscriptionConfig::default(),
            llm: LLMConfig::default(),
            article: ArticleConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the first config file found, then apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let config_paths = ["sports-news.toml", "config/sports-news.toml"];

        for path in &config_paths {
            if Path::new(path).exists() {
                match Self::from_file(Path::new(path)) {
                    Ok(config) => return Ok(config.with_env_overrides()),
                    Err(e) => tracing::warn!("Failed to parse config file {}: {:#}", path, e),
                }
            }
        }

        Err(anyhow!("No configuration file found"))
    }

    /// Load configuration from an explicit path, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config.with_env_overrides())
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("SPORTS_NEWS_LLM_ENDPOINT") {
            self.llm.endpoint = Some(endpoint);
        }

        if let Ok(api_key) = std::env::var("SPORTS_NEWS_API_KEY") {
            self.llm.api_key = Some(api_key);
        }

        if let Ok(model) = std::env::var("SPORTS_NEWS_MODEL") {
            self.llm.model = model;
        }

        if let Ok(fps) = std::env::var("SPORTS_NEWS_FPS") {
            match fps.parse() {
                Ok(fps) => self.sampling.target_fps = fps,
                Err(_) => tracing::warn!("Ignoring invalid SPORTS_NEWS_FPS: {}", fps),
            }
        }

        if let Ok(group_size) = std::env::var("SPORTS_NEWS_GROUP_SIZE") {
            match group_size.parse() {
                Ok(size) => self.sampling.group_size = size,
                Err(_) => tracing::warn!("Ignoring invalid SPORTS_NEWS_GROUP_SIZE: {}", group_size),
            }
        }

        if let Ok(model) = std::env::var("SPORTS_NEWS_WHISPER_MODEL") {
            self.transcription.model = model;
        }

        self
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.sampling.target_fps.is_finite() && self.sampling.target_fps > 0.0) {
            return Err(anyhow!("target_fps must be a positive number"));
        }

        if self.sampling.group_size == 0 {
            return Err(anyhow!("group_size must be greater than 0"));
        }

        if self.sampling.fallback_stride == 0 {
            return Err(anyhow!("fallback_stride must be greater than 0"));
        }

        if self.audio.target_sample_rate == 0 {
            return Err(anyhow!("target_sample_rate must be greater than 0"));
        }

        if let Some(endpoint) = &self.llm.endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| anyhow!("Invalid LLM endpoint {}: {}", endpoint, e))?;
        }

        match self.llm.provider {
            LLMProvider::OpenAI | LLMProvider::Gemini | LLMProvider::Custom => {
                if self.llm.api_key.is_none() {
                    return Err(anyhow!(
                        "API key required for {:?} provider",
                        self.llm.provider
                    ));
                }
            }
            LLMProvider::LMStudio => {}
        }

        if self.llm.endpoint_or_default().is_none() {
            return Err(anyhow!("Endpoint required for {:?} provider", self.llm.provider));
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Sports News Configuration:\n\
            - Sampling: {} fps, groups of {}\n\
            - Frames Directory: {}\n\
            - Whisper: {:?} ({})\n\
            - LLM Provider: {:?} ({})\n\
            - Article Language: {}",
            self.sampling.target_fps,
            self.sampling.group_size,
            self.sampling
                .frames_dir
                .as_ref()
                .map(|dir| dir.display().to_string())
                .unwrap_or_else(|| "temporary".to_string()),
            self.transcription.backend,
            self.transcription.model,
            self.llm.provider,
            self.llm.model,
            self.article.default_language
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_target_fps(mut self, fps: f64) -> Self {
        self.config.sampling.target_fps = fps;
        self
    }

    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.config.sampling.group_size = group_size;
        self
    }

    pub fn with_frames_dir(mut self, dir: PathBuf) -> Self {
        self.config.sampling.frames_dir = Some(dir);
        self
    }

    pub fn with_llm(mut self, llm: LLMConfig) -> Self {
        self.config.llm = llm;
        self
    }

    pub fn with_whisper_model(mut self, model: String) -> Self {
        self.config.transcription.model = model;
        self
    }

    pub fn with_article_language(mut self, language: String) -> Self {
        self.config.article.default_language = language;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
