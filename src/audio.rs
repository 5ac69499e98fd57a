use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::info;

use crate::config::AudioConfig;

/// Temporary WAV file holding a video's audio track; deleted on drop
#[derive(Debug)]
pub struct ExtractedAudio {
    path: TempPath,
}

impl ExtractedAudio {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Audio extractor producing Whisper-friendly mono PCM
#[derive(Debug, Clone)]
pub struct AudioExtractor {
    target_sample_rate: u32,
    temp_dir: Option<PathBuf>,
}

impl AudioExtractor {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            target_sample_rate: config.target_sample_rate,
            temp_dir: None,
        }
    }

    /// Write temporary audio files under `dir` instead of the system temp dir
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Extract the audio track of `video_path` into a scoped temp file
    pub async fn extract_for_transcription(&self, video_path: &Path) -> std::io::Result<ExtractedAudio> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("sports-news-audio-").suffix(".wav");
        let temp_file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let temp_path = temp_file.into_temp_path();

        info!("🎵 Extracting audio for transcription: {}", video_path.display());

        let status = tokio::process::Command::new("ffmpeg")
            .args(["-v", "error", "-y", "-i"])
            .arg(video_path)
            .args([
                "-vn", // No video stream
                "-acodec", "pcm_s16le", // 16-bit PCM
                "-ar", &self.target_sample_rate.to_string(),
                "-ac", "1", // Mono channel
            ])
            .arg(&*temp_path)
            .status()
            .await?;

        if !status.success() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("ffmpeg exited with {} for {}", status, video_path.display()),
            ));
        }

        info!("✅ Audio extracted: {}", temp_path.display());
        Ok(ExtractedAudio { path: temp_path })
    }
}

impl Default for AudioExtractor {
    fn default() -> Self {
        Self::new(&AudioConfig::default())
    }
}
