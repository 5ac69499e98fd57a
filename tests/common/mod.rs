#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sports_news_rust::frames::{Frame, FrameGroup};
use sports_news_rust::llm::{self, ChatMessage, LLMError, LLMProvider, LLMResponse, LLM};

/// In-memory service that replays canned replies in order.
///
/// `None` entries (and an exhausted script) fail the call.
pub struct ScriptedLLM {
    replies: Mutex<VecDeque<Option<String>>>,
    calls: Mutex<Vec<(Vec<ChatMessage>, u32)>>,
}

impl ScriptedLLM {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(Into::into)).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replying<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::new(replies.into_iter().map(Some))
    }

    pub fn failing() -> Self {
        Self::new(Vec::<Option<String>>::new())
    }

    pub fn calls(&self) -> Vec<(Vec<ChatMessage>, u32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LLM for ScriptedLLM {
    async fn chat(&self, messages: Vec<ChatMessage>, max_tokens: u32) -> llm::Result<LLMResponse> {
        self.calls.lock().unwrap().push((messages, max_tokens));

        match self.replies.lock().unwrap().pop_front().flatten() {
            Some(content) => Ok(LLMResponse {
                content,
                tokens_used: None,
            }),
            None => Err(LLMError::EmptyResponse(LLMProvider::Custom)),
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::Custom
    }
}

/// Write `count` fake JPEG files and group them like the sampler does
pub fn write_frames(dir: &Path, count: usize, group_size: usize) -> Vec<FrameGroup> {
    let paths: Vec<PathBuf> = (0..count)
        .map(|i| {
            let path = dir.join(format!("frame_{:06}.jpg", i + 1));
            std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, i as u8]).unwrap();
            path
        })
        .collect();

    sports_news_rust::video::group_frames(paths, group_size)
}

pub fn frame(name: &str) -> Frame {
    Frame::new(PathBuf::from(name), 0, 0, 5)
}

pub fn scoring_reply(description: &str, score: &str, reason: &str) -> String {
    format!("DESCRIPTION: {description}\nSCORE: {score}\nREASON: {reason}")
}
