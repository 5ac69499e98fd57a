use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::SamplingConfig;
use crate::frames::{Frame, FrameGroup};

/// Error types for frame sampling
#[derive(thiserror::Error, Debug)]
pub enum VideoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported video format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid sampling settings: {0}")]
    InvalidSettings(String),

    #[error("FFmpeg error: {0}")]
    FFmpeg(String),

    #[error("Cannot list frames: {0}")]
    Walk(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, VideoError>;

/// Video information extracted with ffprobe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub path: PathBuf,
    pub filename: String,
    pub duration: Duration,
    pub width: u32,
    pub height: u32,
    /// Native frame rate, `None` when the container does not report one
    pub fps: Option<f64>,
}

/// Parse an ffprobe rate such as `30000/1001` or `25`
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            num / den
        }
        None => rate.trim().parse().ok()?,
    };

    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Frame-index stride that approximates `target_fps` samples per second.
///
/// Falls back to `fallback` when the native rate is unknown.
pub fn compute_stride(native_fps: Option<f64>, target_fps: f64, fallback: u32) -> u32 {
    match native_fps {
        Some(native) if native.is_finite() && native > 0.0 && target_fps > 0.0 => {
            ((native / target_fps).round() as u32).max(1)
        }
        _ => fallback,
    }
}

/// Partition ordered frame paths into groups of `group_size`; the last group
/// may be shorter.
pub fn group_frames(paths: Vec<PathBuf>, group_size: usize) -> Vec<FrameGroup> {
    let group_size = group_size.max(1);

    paths
        .chunks(group_size)
        .enumerate()
        .map(|(group_index, chunk)| FrameGroup {
            index: group_index,
            frames: chunk
                .iter()
                .enumerate()
                .map(|(position, path)| Frame::new(path.clone(), group_index, position, group_size))
                .collect(),
        })
        .collect()
}

/// Decodes a video and keeps one frame per stride, grouped for scoring
#[derive(Debug, Clone)]
pub struct FrameSampler {
    target_fps: f64,
    group_size: usize,
    fallback_stride: u32,
    jpeg_quality: u8,
    supported_extensions: Vec<String>,
}

impl FrameSampler {
    pub fn new(config: &SamplingConfig) -> Result<Self> {
        if !(config.target_fps.is_finite() && config.target_fps > 0.0) {
            return Err(VideoError::InvalidSettings(format!(
                "target fps must be positive, got {}",
                config.target_fps
            )));
        }
        if config.group_size == 0 {
            return Err(VideoError::InvalidSettings("group size must be positive".to_string()));
        }

        Ok(Self {
            target_fps: config.target_fps,
            group_size: config.group_size,
            fallback_stride: config.fallback_stride.max(1),
            jpeg_quality: config.jpeg_quality.clamp(2, 31),
            supported_extensions: config
                .supported_extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
        })
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Check the container extension against the accepted list
    pub fn is_supported(&self, video_path: &Path) -> bool {
        video_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.supported_extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    /// Extract video information using ffprobe
    pub async fn get_video_info(&self, video_path: &Path) -> Result<VideoInfo> {
        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v", "quiet",
                "-print_format", "json",
                "-show_format",
                "-show_streams",
                "-select_streams", "v:0",
            ])
            .arg(video_path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(VideoError::FFmpeg(format!(
                "ffprobe failed for {}",
                video_path.display()
            )));
        }

        let ffprobe_data: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| VideoError::FFmpeg(format!("Invalid ffprobe output: {}", e)))?;

        let format = &ffprobe_data["format"];
        let video_stream = ffprobe_data["streams"]
            .as_array()
            .and_then(|streams| streams.first())
            .ok_or_else(|| VideoError::FFmpeg("No video stream found".to_string()))?;

        let duration_seconds: f64 = format["duration"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        let fps = video_stream["r_frame_rate"]
            .as_str()
            .and_then(parse_frame_rate)
            .or_else(|| video_stream["avg_frame_rate"].as_str().and_then(parse_frame_rate));

        let video_info = VideoInfo {
            path: video_path.to_path_buf(),
            filename: video_path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default(),
            duration: Duration::from_secs_f64(duration_seconds.max(0.0)),
            width: video_stream["width"].as_u64().unwrap_or(0) as u32,
            height: video_stream["height"].as_u64().unwrap_or(0) as u32,
            fps,
        };

        info!(
            "📹 Analyzed video: {} ({}x{}, {:.1}fps, {:.1}s)",
            video_info.filename,
            video_info.width,
            video_info.height,
            video_info.fps.unwrap_or(0.0),
            video_info.duration.as_secs_f64()
        );

        Ok(video_info)
    }

    /// Sample frames from `video_path` into `output_dir` and group them.
    ///
    /// `output_dir` must exist and be empty. An empty result means no frame
    /// could be decoded.
    pub async fn sample(&self, video_path: &Path, output_dir: &Path) -> Result<Vec<FrameGroup>> {
        if !self.is_supported(video_path) {
            return Err(VideoError::UnsupportedFormat(video_path.display().to_string()));
        }

        let native_fps = match self.get_video_info(video_path).await {
            Ok(info) => info.fps,
            Err(e) => {
                warn!("Could not read frame rate of {}: {}", video_path.display(), e);
                None
            }
        };

        let stride = compute_stride(native_fps, self.target_fps, self.fallback_stride);
        if native_fps.is_none() {
            warn!("Native frame rate unknown, using fallback stride {}", stride);
        }

        info!("🎞️ Extracting every {} frame(s) from {}", stride, video_path.display());
        self.extract_frames(video_path, output_dir, stride).await?;

        let paths = Self::list_frames(output_dir)?;
        let groups = group_frames(paths, self.group_size);

        info!(
            "✅ Extracted {} frames in {} groups",
            groups.iter().map(FrameGroup::len).sum::<usize>(),
            groups.len()
        );

        Ok(groups)
    }

    /// Run ffmpeg keeping frames whose index is a multiple of `stride`
    async fn extract_frames(&self, video_path: &Path, output_dir: &Path, stride: u32) -> Result<()> {
        let select_filter = format!("select=not(mod(n\\,{}))", stride);
        let output_pattern = output_dir.join("frame_%06d.jpg");

        let output = tokio::process::Command::new("ffmpeg")
            .args(["-v", "error", "-y", "-i"])
            .arg(video_path)
            .args(["-vf", &select_filter])
            .args(["-vsync", "vfr"])
            .args(["-q:v", &self.jpeg_quality.to_string()])
            .arg(&output_pattern)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::FFmpeg(format!(
                "Frame extraction failed for {}: {}",
                video_path.display(),
                stderr.trim()
            )));
        }

        debug!("ffmpeg frame extraction finished for {}", video_path.display());
        Ok(())
    }

    /// Extracted frame files in decode order
    pub fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut frames = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            let path = entry.path();
            let is_jpeg = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("jpg"))
                .unwrap_or(false);

            if entry.file_type().is_file() && is_jpeg {
                frames.push(path.to_path_buf());
            }
        }

        Ok(frames)
    }
}
