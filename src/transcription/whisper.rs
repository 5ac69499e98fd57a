use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::audio::AudioExtractor;
use crate::config::{TranscriptionConfig, WhisperBackend};

/// Returned when the audio track cannot be extracted
pub const AUDIO_EXTRACTION_ERROR: &str = "[Error: Could not extract audio]";

#[derive(thiserror::Error, Debug)]
pub enum TranscriptionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No Whisper backend found. Please install whisper.cpp or openai-whisper")]
    NoBackend,

    #[error("{backend} failed: {message}")]
    Backend { backend: &'static str, message: String },

    #[error("transcription timed out after {0}s")]
    Timeout(u64),
}

/// Collapse Whisper's per-segment text output into one paragraph
pub fn clean_transcript(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Local Whisper speech-to-text, driven through its command-line tools
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    config: TranscriptionConfig,
    audio_extractor: AudioExtractor,
}

impl WhisperTranscriber {
    pub fn new(config: TranscriptionConfig, audio_extractor: AudioExtractor) -> Self {
        Self {
            config,
            audio_extractor,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Transcribe the speech in `video_path`.
    ///
    /// Never fails: extraction problems yield [`AUDIO_EXTRACTION_ERROR`],
    /// anything else `[Error transcribing audio: ...]`. The temporary audio
    /// file is removed before returning.
    pub async fn transcribe_video(&self, video_path: &Path, language: Option<&str>) -> String {
        let audio = match self.audio_extractor.extract_for_transcription(video_path).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!("Audio extraction failed for {}: {}", video_path.display(), e);
                return AUDIO_EXTRACTION_ERROR.to_string();
            }
        };

        match self.transcribe_audio(audio.path(), language).await {
            Ok(text) => {
                info!("🎧 Transcribed {} characters", text.len());
                text
            }
            Err(e) => {
                warn!("Transcription failed for {}: {}", video_path.display(), e);
                format!("[Error transcribing audio: {}]", e)
            }
        }
    }

    /// Transcribe a WAV file with the configured backend
    pub async fn transcribe_audio(
        &self,
        audio_path: &Path,
        language: Option<&str>,
    ) -> Result<String, TranscriptionError> {
        let output_dir = tempfile::Builder::new()
            .prefix("sports-news-whisper-")
            .tempdir()?;

        let text_path = match self.resolve_backend().await? {
            Some(cmd_name) => {
                self.run_whisper_cpp(cmd_name, audio_path, output_dir.path(), language)
                    .await?
            }
            None => {
                self.run_python_whisper(audio_path, output_dir.path(), language)
                    .await?
            }
        };

        let raw = tokio::fs::read_to_string(&text_path).await?;
        Ok(clean_transcript(&raw))
    }

    /// whisper.cpp binary to run, or `None` for Python Whisper. Each
    /// candidate is probed at most once.
    async fn resolve_backend(&self) -> Result<Option<&'static str>, TranscriptionError> {
        match self.config.backend {
            WhisperBackend::Cpp => Ok(Some(Self::cpp_command().await.unwrap_or("whisper-cli"))),
            WhisperBackend::Python => Ok(None),
            WhisperBackend::Auto => match Self::cpp_command().await {
                Some(cmd_name) => Ok(Some(cmd_name)),
                None if Self::check_command_available("whisper").await => Ok(None),
                None => Err(TranscriptionError::NoBackend),
            },
        }
    }

    async fn cpp_command() -> Option<&'static str> {
        for cmd_name in ["whisper-cli", "whisper-cpp"] {
            if Self::check_command_available(cmd_name).await {
                return Some(cmd_name);
            }
        }
        None
    }

    /// Run whisper.cpp; returns the path of the written `.txt`
    async fn run_whisper_cpp(
        &self,
        cmd_name: &'static str,
        audio_path: &Path,
        output_dir: &Path,
        language: Option<&str>,
    ) -> Result<PathBuf, TranscriptionError> {
        let output_base = output_dir.join("transcript");
        let model_path = self
            .config
            .model_dir
            .join(format!("ggml-{}.bin", self.config.model));

        let mut cmd = Command::new(cmd_name);
        cmd.arg("-f")
            .arg(audio_path)
            .arg("-m")
            .arg(&model_path)
            .arg("-otxt")
            .arg("-of")
            .arg(&output_base)
            .arg("-l")
            .arg(language.unwrap_or("auto"));

        info!("🚀 Running {}: {} model on {}", cmd_name, self.config.model, audio_path.display());
        self.execute(cmd, cmd_name).await?;

        Ok(output_base.with_extension("txt"))
    }

    /// Run Python OpenAI Whisper; returns the path of the written `.txt`
    async fn run_python_whisper(
        &self,
        audio_path: &Path,
        output_dir: &Path,
        language: Option<&str>,
    ) -> Result<PathBuf, TranscriptionError> {
        let mut cmd = Command::new("whisper");
        cmd.arg(audio_path)
            .arg("--model")
            .arg(&self.config.model)
            .arg("--output_dir")
            .arg(output_dir)
            .arg("--output_format")
            .arg("txt")
            .arg("--verbose")
            .arg("False")
            .arg("--fp16")
            .arg("False");

        if let Some(language) = language {
            cmd.arg("--language").arg(language);
        }

        info!("🚀 Running Python Whisper: {} model on {}", self.config.model, audio_path.display());
        self.execute(cmd, "Python Whisper").await?;

        let stem = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(output_dir.join(format!("{}.txt", stem)))
    }

    async fn execute(&self, mut cmd: Command, backend: &'static str) -> Result<(), TranscriptionError> {
        cmd.stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Executing command: {:?}", cmd);

        let timeout = Duration::from_secs(self.config.timeout);
        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| TranscriptionError::Timeout(self.config.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriptionError::Backend {
                backend,
                message: stderr.trim().lines().last().unwrap_or("unknown error").to_string(),
            });
        }

        Ok(())
    }

    /// Check if a command is available
    async fn check_command_available(cmd_name: &str) -> bool {
        Command::new(cmd_name)
            .arg("--help")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}
