//! Article, caption and edit generation through the text service.
//!
//! Every operation returns text. Failed calls come back as one of the
//! sentinel strings below instead of an error, so callers must check with
//! [`is_sentinel`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::frames::ScoredFrame;
use crate::llm::{ChatMessage, LLM};

pub const ARTICLE_ERROR: &str = "[Error generating article]";
pub const EDIT_ERROR: &str = "[Error editing article]";
pub const DEFAULT_CAPTION: &str = "Key moment from the match";

const ARTICLE_MAX_TOKENS: u32 = 500;
const CAPTION_MAX_TOKENS: u32 = 50;
const EDIT_MAX_TOKENS: u32 = 600;

/// True for the placeholder strings returned on failed generation
pub fn is_sentinel(text: &str) -> bool {
    text == ARTICLE_ERROR || text == EDIT_ERROR
}

/// One-click edit presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickEdit {
    Shorter,
    Formal,
    Exciting,
    StatsFocus,
}

impl QuickEdit {
    pub const NAMES: [&'static str; 4] = ["shorter", "formal", "exciting", "stats"];

    pub fn instruction(self) -> &'static str {
        match self {
            QuickEdit::Shorter => {
                "Make this article shorter and more concise while keeping the key information."
            }
            QuickEdit::Formal => "Make this article more formal and professional in tone.",
            QuickEdit::Exciting => {
                "Make this article more exciting and engaging while keeping it factual."
            }
            QuickEdit::StatsFocus => {
                "Focus more on statistics and numerical data if available in the original content."
            }
        }
    }
}

impl FromStr for QuickEdit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shorter" => Ok(QuickEdit::Shorter),
            "formal" => Ok(QuickEdit::Formal),
            "exciting" => Ok(QuickEdit::Exciting),
            "stats" | "stats-focus" => Ok(QuickEdit::StatsFocus),
            other => Err(format!(
                "unknown quick edit '{}', expected one of: {}",
                other,
                Self::NAMES.join(", ")
            )),
        }
    }
}

impl fmt::Display for QuickEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuickEdit::Shorter => "shorter",
            QuickEdit::Formal => "formal",
            QuickEdit::Exciting => "exciting",
            QuickEdit::StatsFocus => "stats",
        };
        f.write_str(name)
    }
}

pub fn analysis_prompt(
    transcript: &str,
    frames: &[ScoredFrame],
    best: &ScoredFrame,
    language: &str,
) -> String {
    let descriptions = frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            format!(
                "Frame {}: {} (Importance: {}/10)",
                i + 1,
                frame.description,
                frame.score()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Write a factual sports news article based on the transcript and image analysis below.

KEY INSTRUCTIONS:
- Only use information provided below - do not invent any details
- Focus on the most important events (highest scored frames)
- Structure: Headline, then 2-3 paragraphs
- Be concise but informative
- If information is unclear, say so rather than guessing
- Write the whole article in {language}

AUDIO TRANSCRIPT:
{transcript}

IMAGE ANALYSIS:
{descriptions}

MOST IMPORTANT MOMENT:
{description} (Score: {score}/10)
Reason: {reason}

Write the article now:",
        description = best.description,
        score = best.score(),
        reason = best.reason,
    )
}

pub fn text_prompt(raw_data: &str, language: &str) -> String {
    format!(
        "Write a factual sports news article based on the raw match data provided below.

KEY INSTRUCTIONS:
- Only use information provided below - do not invent any details
- Structure: Headline, then 2-3 paragraphs
- Be concise but informative
- If information is unclear, say so rather than guessing
- Focus on the most important events mentioned in the data
- Write the whole article in {language}

RAW MATCH DATA:
{raw_data}

Write the article now:"
    )
}

pub fn caption_prompt(frame_description: &str, language: &str) -> String {
    format!(
        "Based on this frame analysis, write a short caption of one or two lines that captures \
the main action of this football match moment. Write it in {language}.

Frame analysis: {frame_description}

Caption (maximum 2 lines):"
    )
}

pub fn edit_prompt(article: &str, instruction: &str, language: &str) -> String {
    format!(
        "You are a professional sports news editor. Edit the following article based on the user's request.

ORIGINAL ARTICLE:
{article}

USER'S EDITING REQUEST:
{instruction}

KEY INSTRUCTIONS:
- Follow the editing request precisely
- Keep the factual content of the original article
- Keep it professional and suitable for news
- If the request asks for information that is not in the original article, say that it is not available
- Keep the article in {language}
- Return only the edited article, no additional commentary

EDITED ARTICLE:"
    )
}

/// Builds prompts and calls the text-generation service
pub struct ArticleComposer {
    llm: Arc<dyn LLM>,
}

impl ArticleComposer {
    pub fn new(llm: Arc<dyn LLM>) -> Self {
        Self { llm }
    }

    async fn complete(&self, prompt: String, max_tokens: u32) -> Option<String> {
        match self.llm.chat(vec![ChatMessage::user(prompt)], max_tokens).await {
            Ok(response) => Some(response.content),
            Err(e) => {
                warn!("{:?} request failed: {}", self.llm.provider_type(), e);
                None
            }
        }
    }

    /// Article from the transcript and the scored frames of a video
    pub async fn generate_from_analysis(
        &self,
        transcript: &str,
        frames: &[ScoredFrame],
        best: &ScoredFrame,
        language: &str,
    ) -> String {
        info!("📝 Generating article from {} analyzed frames", frames.len());
        self.complete(analysis_prompt(transcript, frames, best, language), ARTICLE_MAX_TOKENS)
            .await
            .unwrap_or_else(|| ARTICLE_ERROR.to_string())
    }

    /// Article from raw match data only
    pub async fn generate_from_text(&self, raw_data: &str, language: &str) -> String {
        info!("📝 Generating article from {} characters of match data", raw_data.len());
        self.complete(text_prompt(raw_data, language), ARTICLE_MAX_TOKENS)
            .await
            .unwrap_or_else(|| ARTICLE_ERROR.to_string())
    }

    /// Short caption for the key frame
    pub async fn generate_caption(&self, frame_description: &str, language: &str) -> String {
        self.complete(caption_prompt(frame_description, language), CAPTION_MAX_TOKENS)
            .await
            .map(|caption| caption.trim().to_string())
            .filter(|caption| !caption.is_empty())
            .unwrap_or_else(|| DEFAULT_CAPTION.to_string())
    }

    /// Revise `article` following a free-form instruction
    pub async fn edit_article(&self, article: &str, instruction: &str, language: &str) -> String {
        info!("✏️ Editing article: {}", instruction);
        self.complete(edit_prompt(article, instruction, language), EDIT_MAX_TOKENS)
            .await
            .unwrap_or_else(|| EDIT_ERROR.to_string())
    }

    pub async fn quick_edit(&self, article: &str, preset: QuickEdit, language: &str) -> String {
        self.edit_article(article, preset.instruction(), language).await
    }
}
