/// Sports News Generator - Rust Implementation
///
/// Turns a football match video (or raw match data) into a short news
/// article: frames are sampled and scored by a vision model, the commentary
/// is transcribed with Whisper, and a text model writes the article.

pub mod article;
pub mod audio;
pub mod config;
pub mod frames;
pub mod llm;
pub mod pipeline;
pub mod reducer;
pub mod scoring;
pub mod session;
pub mod transcription;
pub mod video;
pub mod workspace;

// Re-export main types for easy access
pub use crate::article::{is_sentinel, ArticleComposer, QuickEdit};
pub use crate::audio::AudioExtractor;
pub use crate::config::{Config, ConfigBuilder};
pub use crate::frames::{Frame, FrameGroup, ScoredFrame};
pub use crate::llm::{create_llm, LLMConfig, LLMProvider, LLM};
pub use crate::pipeline::{ArticlePipeline, GeneratedArticle, PipelineOutcome};
pub use crate::reducer::{best_of_group, global_best, GroupAnalysis};
pub use crate::scoring::FrameScorer;
pub use crate::session::{ArticleSession, ArticleSource};
pub use crate::transcription::WhisperTranscriber;
pub use crate::video::{FrameSampler, VideoInfo};
pub use crate::workspace::FrameWorkspace;
