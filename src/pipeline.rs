//! End-to-end article generation: video or raw match data in, article out.

use anyhow::{anyhow, bail, Context, Result};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::article::{is_sentinel, ArticleComposer};
use crate::audio::AudioExtractor;
use crate::config::Config;
use crate::frames::{FrameGroup, ScoredFrame};
use crate::llm::{create_llm, LLM};
use crate::scoring::FrameScorer;
use crate::transcription::WhisperTranscriber;
use crate::video::FrameSampler;
use crate::workspace::FrameWorkspace;

/// A finished article with its optional illustration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedArticle {
    pub article: String,
    /// Base64 JPEG of the key moment; always `None` for text input
    pub image_b64: Option<String>,
    pub caption: Option<String>,
    pub language: String,
    pub key_moment: Option<ScoredFrame>,
    pub transcript: Option<String>,
}

impl GeneratedArticle {
    /// True when the text service failed and `article` is a placeholder
    pub fn is_error(&self) -> bool {
        is_sentinel(&self.article)
    }
}

#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Generated(GeneratedArticle),
    /// No frame could be decoded from the video
    NoFrames,
    /// Frames were extracted but none was scored
    NoScoredFrames,
    /// Raw input was empty or whitespace
    EmptyInput,
}

pub struct ArticlePipeline {
    config: Config,
    sampler: FrameSampler,
    scorer: FrameScorer,
    transcriber: WhisperTranscriber,
    composer: ArticleComposer,
}

impl ArticlePipeline {
    /// Build the pipeline with the provider named in `config.llm`
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let llm: Arc<dyn LLM> = Arc::from(create_llm(&config.llm)?);
        Self::with_llm(config, llm)
    }

    /// Build the pipeline around an existing service client
    pub fn with_llm(config: Config, llm: Arc<dyn LLM>) -> Result<Self> {
        let sampler = FrameSampler::new(&config.sampling)?;
        let transcriber = WhisperTranscriber::new(
            config.transcription.clone(),
            AudioExtractor::new(&config.audio),
        );

        info!("🔧 Article pipeline ready: {:?} ({})", llm.provider_type(), config.llm.model);

        Ok(Self {
            sampler,
            scorer: FrameScorer::new(llm.clone()),
            composer: ArticleComposer::new(llm),
            transcriber,
            config,
        })
    }

    pub fn composer(&self) -> &ArticleComposer {
        &self.composer
    }

    /// Generate an article from a video.
    ///
    /// The frame directory lives only for the duration of this call and is
    /// removed on every return path.
    pub async fn process_video(
        &self,
        video_path: &Path,
        spoken_language: Option<&str>,
        article_language: &str,
    ) -> Result<PipelineOutcome> {
        let start_time = Instant::now();
        info!("🎬 Processing video: {}", video_path.display());

        let frames_dir = self.config.sampling.frames_dir.as_deref();
        let workspace = FrameWorkspace::open(frames_dir)
            .await
            .context("Cannot create frame directory")?;

        let groups = self
            .sampler
            .sample(video_path, workspace.path())
            .await
            .with_context(|| format!("Frame sampling failed for {}", video_path.display()))?;

        if groups.is_empty() {
            warn!("No frames extracted from {}", video_path.display());
            return Ok(PipelineOutcome::NoFrames);
        }

        let transcript = self
            .transcriber
            .transcribe_video(video_path, spoken_language)
            .await;

        let outcome = self
            .process_sampled(workspace, &groups, transcript, article_language)
            .await;

        info!(
            "✅ Video processed in {:.1}s",
            start_time.elapsed().as_secs_f64()
        );
        Ok(outcome)
    }

    /// Score already sampled frames and write the article.
    ///
    /// `groups` must live inside `workspace`, which is consumed and removed
    /// once the key frame has been read.
    pub async fn process_sampled(
        &self,
        workspace: FrameWorkspace,
        groups: &[FrameGroup],
        transcript: String,
        article_language: &str,
    ) -> PipelineOutcome {
        let analysis = self.scorer.score_groups(groups).await;
        let Some(best) = analysis.global_best().cloned() else {
            warn!("No frame in {} could be scored", workspace.path().display());
            return PipelineOutcome::NoScoredFrames;
        };

        info!(
            "⭐ Key moment: {} scored {}/10 (t≈{})",
            best.frame.path().display(),
            best.score(),
            best.frame.approx_timestamp
        );

        let image_b64 = match tokio::fs::read(best.frame.path()).await {
            Ok(bytes) => Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
            Err(e) => {
                warn!("Cannot read key frame {}: {}", best.frame.path().display(), e);
                None
            }
        };
        drop(workspace);

        let article = self
            .composer
            .generate_from_analysis(&transcript, &analysis.all_frames, &best, article_language)
            .await;
        let caption = self
            .composer
            .generate_caption(&best.description, article_language)
            .await;

        info!("📰 Article written from {} frames", analysis.all_frames.len());

        PipelineOutcome::Generated(GeneratedArticle {
            article,
            image_b64,
            caption: Some(caption),
            language: article_language.to_string(),
            key_moment: Some(best),
            transcript: Some(transcript),
        })
    }

    /// Generate an article from raw match data. Never has an image.
    pub async fn process_text(&self, raw_data: &str, article_language: &str) -> PipelineOutcome {
        let raw_data = raw_data.trim();
        if raw_data.is_empty() {
            warn!("No match data provided");
            return PipelineOutcome::EmptyInput;
        }

        let article = self
            .composer
            .generate_from_text(raw_data, article_language)
            .await;

        PipelineOutcome::Generated(GeneratedArticle {
            article,
            image_b64: None,
            caption: None,
            language: article_language.to_string(),
            key_moment: None,
            transcript: None,
        })
    }

    /// Generate an article from a `.json`, `.csv` or `.txt` data file
    pub async fn process_data_file(&self, path: &Path, article_language: &str) -> Result<PipelineOutcome> {
        let raw_data = load_match_data(path).await?;
        Ok(self.process_text(&raw_data, article_language).await)
    }
}

/// Read a match data file as prompt text. JSON is re-serialized pretty
/// printed; CSV and plain text are passed through.
pub async fn load_match_data(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| anyhow!("Data file has no extension: {}", path.display()))?;

    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Cannot read data file {}", path.display()))?;

    match extension.as_str() {
        "json" => {
            let value: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", path.display()))?;
            Ok(serde_json::to_string_pretty(&value)?)
        }
        "csv" | "txt" => Ok(content),
        other => bail!("Unsupported data file type '.{}' (expected json, csv or txt)", other),
    }
}
