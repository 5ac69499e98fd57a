//! Frame data model shared by the sampler, scorer and reducer

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Description used when the vision service could not score a frame
pub const ANALYSIS_ERROR_DESCRIPTION: &str = "[Error analyzing image]";

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;

/// A still image extracted from the video at a sampled instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub path: PathBuf,
    pub group_index: usize,
    pub position: usize,
    /// Sample ordinal (`group_index * group_size + position`). Equals seconds
    /// only at 1 sample per second; it is not the decoder timestamp.
    pub approx_timestamp: u32,
}

impl Frame {
    pub fn new(path: PathBuf, group_index: usize, position: usize, group_size: usize) -> Self {
        Self {
            path,
            group_index,
            position,
            approx_timestamp: (group_index * group_size + position) as u32,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Ordered batch of consecutively sampled frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGroup {
    pub index: usize,
    pub frames: Vec<Frame>,
}

impl FrameGroup {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// A frame annotated by the vision service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredFrame {
    pub frame: Frame,
    pub description: String,
    #[serde(deserialize_with = "deserialize_score")]
    score: u8,
    pub reason: String,
}

impl ScoredFrame {
    /// Build a scored frame; the score is clamped into `[1, 10]`
    pub fn new(frame: Frame, description: String, score: i64, reason: String) -> Self {
        Self {
            frame,
            description,
            score: clamp_score(score),
            reason,
        }
    }

    /// Placeholder record for a frame whose analysis failed
    pub fn analysis_failed(frame: Frame) -> Self {
        Self::new(
            frame,
            ANALYSIS_ERROR_DESCRIPTION.to_string(),
            MIN_SCORE as i64,
            String::new(),
        )
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn is_analysis_error(&self) -> bool {
        self.description == ANALYSIS_ERROR_DESCRIPTION
    }
}

pub fn clamp_score(raw: i64) -> u8 {
    raw.clamp(MIN_SCORE as i64, MAX_SCORE as i64) as u8
}

fn deserialize_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    i64::deserialize(deserializer).map(clamp_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_is_clamped() {
        let frame = Frame::new(PathBuf::from("f.jpg"), 0, 0, 5);
        assert_eq!(ScoredFrame::new(frame.clone(), String::new(), 42, String::new()).score(), 10);
        assert_eq!(ScoredFrame::new(frame.clone(), String::new(), -3, String::new()).score(), 1);
        assert_eq!(ScoredFrame::new(frame.clone(), String::new(), 0, String::new()).score(), 1);
        assert_eq!(ScoredFrame::new(frame, String::new(), 7, String::new()).score(), 7);
    }

    #[test]
    fn test_deserialized_score_is_clamped() {
        let json = r#"{"frame":{"path":"f.jpg","group_index":0,"position":0,"approx_timestamp":0},"description":"d","score":99,"reason":""}"#;
        let scored: ScoredFrame = serde_json::from_str(json).unwrap();
        assert_eq!(scored.score(), 10);
    }

    #[test]
    fn test_approximate_timestamp() {
        let frame = Frame::new(PathBuf::from("f.jpg"), 2, 3, 5);
        assert_eq!(frame.approx_timestamp, 13);
    }

    #[test]
    fn test_analysis_failed_sentinel() {
        let scored = ScoredFrame::analysis_failed(Frame::new(PathBuf::from("f.jpg"), 0, 1, 5));
        assert_eq!(scored.description, "[Error analyzing image]");
        assert_eq!(scored.score(), 1);
        assert!(scored.reason.is_empty());
        assert!(scored.is_analysis_error());
    }
}
