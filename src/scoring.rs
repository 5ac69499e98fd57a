//! Frame scoring through a vision-language service.
//!
//! Each frame is sent with a fixed rubric that favours the moment of action
//! (foot on ball, shot being struck) over its aftermath (ball in the net,
//! celebrations). The reply is a three-line `DESCRIPTION` / `SCORE` /
//! `REASON` record, parsed by [`parse_scoring_reply`].

use base64::Engine as _;
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::frames::{Frame, FrameGroup, ScoredFrame, MIN_SCORE};
use crate::llm::{ChatMessage, LLM};
use crate::reducer::{best_of_group, GroupAnalysis};

const SCORING_MAX_TOKENS: u32 = 400;

pub const SCORING_PROMPT: &str = "\
Analyze this football match frame and provide:
1. A detailed description of what is happening
2. An importance score from 1 to 10 using this rubric.
   We want THE MOMENT OF ACTION, NOT THE RESULT:
   - 10: a player's foot is making contact with the ball, the shot is being struck
   - 9: a player is in the shooting motion, about to kick the ball
   - 8: a player is preparing to shoot, the ball is arriving at the player's foot
   - 7: a corner kick is being taken or a free kick is being set up
   - 6: regular play such as passing or running
   - 2-3: the ball is already in the net, or players are celebrating a goal
   - 1: players standing around, crowd shots, the referee walking

If the ball is already in the goal or players are celebrating, the score must be LOW (2-3). \
The shooting action matters, not the goal result.

Reply with exactly these three lines:
DESCRIPTION: <your description>
SCORE: <integer from 1 to 10>
REASON: <why this score>";

/// Fields recovered from a scoring reply; `None` when absent or malformed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoringReply {
    pub description: Option<String>,
    pub score: Option<i64>,
    pub reason: Option<String>,
}

fn leading_integer() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?\d+").expect("valid regex"))
}

fn is_emphasis(c: char) -> bool {
    c == '*' || c == '_'
}

/// Leading signed integer of a score value, saturating on overflow
fn parse_score_value(value: &str) -> Option<i64> {
    let digits = leading_integer().find(value)?.as_str();
    Some(digits.parse::<i64>().unwrap_or(if digits.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    }))
}

/// Parse a `DESCRIPTION:` / `SCORE:` / `REASON:` reply.
///
/// A line counts as a field only when, after trimming whitespace and markdown
/// emphasis, it starts with one of the labels (any ASCII case) followed by a
/// colon. The first occurrence of each field wins.
pub fn parse_scoring_reply(content: &str) -> ScoringReply {
    let mut reply = ScoringReply::default();

    for line in content.lines() {
        let line = line.trim().trim_start_matches(is_emphasis);
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let label = label.trim().trim_end_matches(is_emphasis).trim();
        let value = value.trim().trim_matches(is_emphasis).trim();

        if label.eq_ignore_ascii_case("description") {
            if reply.description.is_none() && !value.is_empty() {
                reply.description = Some(value.to_string());
            }
        } else if label.eq_ignore_ascii_case("score") {
            if reply.score.is_none() {
                reply.score = parse_score_value(value);
            }
        } else if label.eq_ignore_ascii_case("reason") && reply.reason.is_none() {
            reply.reason = Some(value.to_string());
        }
    }

    reply
}

fn image_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// Scores frames one at a time against the vision service
pub struct FrameScorer {
    llm: Arc<dyn LLM>,
}

impl FrameScorer {
    pub fn new(llm: Arc<dyn LLM>) -> Self {
        Self { llm }
    }

    /// Score a frame read from disk. Never fails: any error yields the
    /// `[Error analyzing image]` placeholder with score 1.
    pub async fn score_frame(&self, frame: &Frame) -> ScoredFrame {
        match tokio::fs::read(frame.path()).await {
            Ok(bytes) => self.score_image(frame, &bytes).await,
            Err(e) => {
                warn!("Cannot read frame {}: {}", frame.path().display(), e);
                ScoredFrame::analysis_failed(frame.clone())
            }
        }
    }

    /// Score already-loaded image bytes for `frame`
    pub async fn score_image(&self, frame: &Frame, image: &[u8]) -> ScoredFrame {
        let data_url = format!(
            "data:{};base64,{}",
            image_mime_type(frame.path()),
            base64::engine::general_purpose::STANDARD.encode(image)
        );
        let message = ChatMessage::user_with_image(SCORING_PROMPT, data_url);

        let content = match self.llm.chat(vec![message], SCORING_MAX_TOKENS).await {
            Ok(response) => response.content.trim().to_string(),
            Err(e) => {
                warn!(
                    "Error analyzing frame {} (t≈{}): {}",
                    frame.path().display(),
                    frame.approx_timestamp,
                    e
                );
                return ScoredFrame::analysis_failed(frame.clone());
            }
        };

        let reply = parse_scoring_reply(&content);
        if reply.score.is_none() {
            debug!("No usable SCORE in reply for {}", frame.path().display());
        }

        ScoredFrame::new(
            frame.clone(),
            reply.description.unwrap_or_else(|| content.clone()),
            reply.score.unwrap_or(MIN_SCORE as i64),
            reply.reason.unwrap_or_default(),
        )
    }

    /// Score every frame of every group sequentially and pick each group's best
    pub async fn score_groups(&self, groups: &[FrameGroup]) -> GroupAnalysis {
        let mut analysis = GroupAnalysis::default();
        let total_groups = groups.len();

        for group in groups {
            let mut scored = Vec::with_capacity(group.len());
            for frame in &group.frames {
                scored.push(self.score_frame(frame).await);
            }

            if let Some(best) = best_of_group(&scored) {
                info!(
                    "🔍 Group {}/{}: best frame {} scored {}/10",
                    group.index + 1,
                    total_groups,
                    best.frame.path().display(),
                    best.score()
                );
                analysis.best_per_group.push(best.clone());
            }

            analysis.all_frames.extend(scored);
        }

        analysis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_reply() {
        let reply = parse_scoring_reply(
            "DESCRIPTION: Striker hits the ball from the edge of the box\nSCORE: 10\nREASON: Foot on ball",
        );

        assert_eq!(
            reply.description.as_deref(),
            Some("Striker hits the ball from the edge of the box")
        );
        assert_eq!(reply.score, Some(10));
        assert_eq!(reply.reason.as_deref(), Some("Foot on ball"));
    }

    #[test]
    fn test_parse_tolerates_emphasis_and_case() {
        let reply = parse_scoring_reply("**Description:** Corner kick\n**score:** 7/10\n__Reason__: set piece");

        assert_eq!(reply.description.as_deref(), Some("Corner kick"));
        assert_eq!(reply.score, Some(7));
        assert_eq!(reply.reason.as_deref(), Some("set piece"));
    }

    #[test]
    fn test_parse_first_occurrence_wins() {
        let reply = parse_scoring_reply("SCORE: 4\nSCORE: 9\nDESCRIPTION: a\nDESCRIPTION: b");
        assert_eq!(reply.score, Some(4));
        assert_eq!(reply.description.as_deref(), Some("a"));
    }

    #[test]
    fn test_parse_non_numeric_score() {
        assert_eq!(parse_scoring_reply("SCORE: high").score, None);
        assert_eq!(parse_scoring_reply("SCORE:").score, None);
        assert_eq!(parse_scoring_reply("SCORE: -4").score, Some(-4));
        assert_eq!(
            parse_scoring_reply("SCORE: 99999999999999999999999").score,
            Some(i64::MAX)
        );
    }

    #[test]
    fn test_parse_ignores_labels_inside_sentences() {
        let reply = parse_scoring_reply("The SCORE: is not here\nI would give SCORE: 9");
        assert_eq!(reply.score, None);
    }

    #[test]
    fn test_parse_missing_fields() {
        let reply = parse_scoring_reply("Just some free text about a match.");
        assert_eq!(reply, ScoringReply::default());
    }

    #[test]
    fn test_image_mime_type() {
        assert_eq!(image_mime_type(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(image_mime_type(Path::new("a.PNG")), "image/png");
        assert_eq!(image_mime_type(Path::new("a")), "image/jpeg");
    }
}
