use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::article::is_sentinel;

/// Where the article came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ArticleSource {
    /// Generated from a video file
    Video { path: String },

    /// Generated from raw match data
    Text,
}

/// The article being worked on, persisted between CLI invocations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleSession {
    /// Current article text, after any edits
    pub article: String,

    /// First generated article, restored by [`ArticleSession::reset_to_original`]
    pub original_article: String,

    /// Base64-encoded JPEG of the most important frame
    pub image_b64: Option<String>,

    /// Caption for the image
    pub caption: Option<String>,

    /// Output language of the article
    pub language: String,

    pub source: ArticleSource,

    /// Number of edits applied since the article was generated
    pub edit_count: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ArticleSession {
    pub fn from_video(
        article: String,
        image_b64: Option<String>,
        caption: Option<String>,
        language: impl Into<String>,
        video_path: &Path,
    ) -> Self {
        let now = Utc::now();
        Self {
            original_article: article.clone(),
            article,
            image_b64,
            caption,
            language: language.into(),
            source: ArticleSource::Video {
                path: video_path.display().to_string(),
            },
            edit_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Text-only article; there is never an image or caption
    pub fn from_text(article: String, language: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            original_article: article.clone(),
            article,
            image_b64: None,
            caption: None,
            language: language.into(),
            source: ArticleSource::Text,
            edit_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_image(&self) -> bool {
        self.image_b64.is_some()
    }

    /// Replace the current article with an edited version.
    ///
    /// Returns `false` and keeps the previous text when the edit failed.
    pub fn apply_edit(&mut self, edited: String) -> bool {
        if is_sentinel(&edited) || edited.trim().is_empty() {
            warn!("Edit failed, keeping the previous article");
            return false;
        }

        self.article = edited;
        self.edit_count += 1;
        self.updated_at = Utc::now();
        true
    }

    pub fn reset_to_original(&mut self) {
        self.article = self.original_article.clone();
        self.edit_count = 0;
        self.updated_at = Utc::now();
        info!("↩️ Article reset to the original version");
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let json_content = serde_json::to_string_pretty(self)?;
        fs::write(path, json_content)
            .await
            .with_context(|| format!("Cannot write session file {}", path.display()))?;

        debug!("💾 Saved session to {}", path.display());
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Cannot read session file {}", path.display()))?;
        let session: ArticleSession = serde_json::from_str(&content)
            .with_context(|| format!("Invalid session file {}", path.display()))?;
        Ok(session)
    }
}
