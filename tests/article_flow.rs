mod common;

use std::sync::Arc;
use tempfile::TempDir;

use base64::Engine as _;
use common::{frame, scoring_reply, write_frames, ScriptedLLM};
use sports_news_rust::article::{ArticleComposer, QuickEdit, ARTICLE_ERROR, DEFAULT_CAPTION, EDIT_ERROR};
use sports_news_rust::config::ConfigBuilder;
use sports_news_rust::frames::ScoredFrame;
use sports_news_rust::pipeline::{ArticlePipeline, PipelineOutcome};
use sports_news_rust::session::ArticleSession;
use sports_news_rust::workspace::FrameWorkspace;

fn pipeline_with(llm: Arc<ScriptedLLM>, frames_dir: std::path::PathBuf) -> ArticlePipeline {
    let config = ConfigBuilder::new().with_frames_dir(frames_dir).build();
    ArticlePipeline::with_llm(config, llm).unwrap()
}

#[tokio::test]
async fn test_text_input_produces_article_without_image_or_caption() {
    let temp_dir = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLLM::replying(["Team A edge Team B\n\nA late goal..."]));
    let pipeline = pipeline_with(llm.clone(), temp_dir.path().join("frames"));

    let outcome = pipeline.process_text("Team A 2-1 Team B, goal in minute 89", "Spanish").await;

    let PipelineOutcome::Generated(generated) = outcome else {
        panic!("expected an article");
    };
    assert_eq!(generated.article, "Team A edge Team B\n\nA late goal...");
    assert!(generated.image_b64.is_none());
    assert!(generated.caption.is_none());
    assert!(!generated.is_error());

    let calls = llm.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, 500);
    let prompt = calls[0].0[0].text();
    assert!(prompt.contains("goal in minute 89"));
    assert!(prompt.contains("Spanish"));
}

#[tokio::test]
async fn test_blank_text_generates_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLLM::replying(["unused"]));
    let pipeline = pipeline_with(llm.clone(), temp_dir.path().join("frames"));

    let outcome = pipeline.process_text("  \n\t ", "English").await;

    assert!(matches!(outcome, PipelineOutcome::EmptyInput));
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_failed_generation_returns_sentinel() {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = pipeline_with(Arc::new(ScriptedLLM::failing()), temp_dir.path().join("frames"));

    let PipelineOutcome::Generated(generated) = pipeline.process_text("Final score 0-0", "English").await
    else {
        panic!("expected an article");
    };
    assert_eq!(generated.article, ARTICLE_ERROR);
    assert!(generated.is_error());
}

#[tokio::test]
async fn test_data_file_json_is_forwarded_pretty_printed() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("match.json");
    std::fs::write(&data, r#"{"home":"Team A","goals":[{"minute":89}]}"#).unwrap();
    let llm = Arc::new(ScriptedLLM::replying(["Article"]));
    let pipeline = pipeline_with(llm.clone(), temp_dir.path().join("frames"));

    let outcome = pipeline.process_data_file(&data, "English").await.unwrap();

    assert!(matches!(outcome, PipelineOutcome::Generated(_)));
    assert!(llm.calls()[0].0[0].text().contains("\"minute\": 89"));
}

#[tokio::test]
async fn test_rejected_video_still_cleans_up_frame_directory() {
    let temp_dir = TempDir::new().unwrap();
    let frames_dir = temp_dir.path().join("frames");
    let video = temp_dir.path().join("match.webm");
    std::fs::write(&video, b"not a video").unwrap();
    let llm = Arc::new(ScriptedLLM::failing());
    let pipeline = pipeline_with(llm.clone(), frames_dir.clone());

    let result = pipeline.process_video(&video, Some("en"), "English").await;

    assert!(result.is_err());
    assert!(!frames_dir.exists());
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_caption_is_trimmed_and_falls_back_on_failure() {
    let composer = ArticleComposer::new(Arc::new(ScriptedLLM::new([
        Some("  Striker fires from range  \n"),
        None,
        Some("   "),
    ])));

    assert_eq!(
        composer.generate_caption("Striker shoots", "English").await,
        "Striker fires from range"
    );
    assert_eq!(composer.generate_caption("Striker shoots", "English").await, DEFAULT_CAPTION);
    assert_eq!(composer.generate_caption("Striker shoots", "English").await, DEFAULT_CAPTION);
}

#[tokio::test]
async fn test_article_from_analysis_uses_frames_and_transcript() {
    let llm = Arc::new(ScriptedLLM::replying(["Headline"]));
    let composer = ArticleComposer::new(llm.clone());
    let frames = vec![
        ScoredFrame::new(frame("a.jpg"), "Kick-off".to_string(), 6, String::new()),
        ScoredFrame::new(frame("b.jpg"), "Volley".to_string(), 10, "foot on ball".to_string()),
    ];

    let article = composer
        .generate_from_analysis("What a strike!", &frames, &frames[1], "English")
        .await;

    assert_eq!(article, "Headline");
    let prompt = llm.calls()[0].0[0].text();
    assert!(prompt.contains("What a strike!"));
    assert!(prompt.contains("Frame 2: Volley (Importance: 10/10)"));
}

#[tokio::test]
async fn test_session_edit_quick_edit_and_reset() {
    let temp_dir = TempDir::new().unwrap();
    let session_path = temp_dir.path().join("session.json");
    let llm = Arc::new(ScriptedLLM::new([Some("Edited article"), Some("Short article"), None]));
    let composer = ArticleComposer::new(llm.clone());

    let mut session = ArticleSession::from_text("Original article".to_string(), "English");
    session.save(&session_path).await.unwrap();

    let mut session = ArticleSession::load(&session_path).await.unwrap();
    let edited = composer
        .edit_article(&session.article, "Mention the weather", &session.language)
        .await;
    assert!(session.apply_edit(edited));
    assert_eq!(session.article, "Edited article");

    let shorter = composer
        .quick_edit(&session.article, QuickEdit::Shorter, &session.language)
        .await;
    assert!(session.apply_edit(shorter));
    assert_eq!(session.article, "Short article");

    let failed = composer
        .quick_edit(&session.article, QuickEdit::Formal, &session.language)
        .await;
    assert_eq!(failed, EDIT_ERROR);
    assert!(!session.apply_edit(failed));
    assert_eq!(session.article, "Short article");

    let calls = llm.calls();
    assert!(calls.iter().all(|(_, max_tokens)| *max_tokens == 600));
    assert!(calls[1].0[0].text().contains(QuickEdit::Shorter.instruction()));

    session.reset_to_original();
    assert_eq!(session.article, "Original article");
    assert!(session.image_b64.is_none());
}

#[tokio::test]
async fn test_sampled_video_produces_illustrated_article_and_removes_frames() {
    let temp_dir = TempDir::new().unwrap();
    let frames_dir = temp_dir.path().join("frames");
    let workspace = FrameWorkspace::create(&frames_dir).await.unwrap();
    let groups = write_frames(workspace.path(), 6, 5);

    let mut replies: Vec<String> = ["4", "8", "10", "3", "5", "9"]
        .into_iter()
        .map(|score| scoring_reply("Striker strikes", score, "shot"))
        .collect();
    replies.push("Late winner seals it\n\nTeam A...".to_string());
    replies.push("  Striker fires home  ".to_string());
    let llm = Arc::new(ScriptedLLM::replying(replies));
    let pipeline = pipeline_with(llm.clone(), frames_dir.clone());

    let outcome = pipeline
        .process_sampled(workspace, &groups, "What a finish!".to_string(), "English")
        .await;

    let PipelineOutcome::Generated(generated) = outcome else {
        panic!("expected an article");
    };
    assert_eq!(generated.article, "Late winner seals it\n\nTeam A...");
    assert_eq!(generated.caption.as_deref(), Some("Striker fires home"));
    assert_eq!(generated.transcript.as_deref(), Some("What a finish!"));

    let key_moment = generated.key_moment.unwrap();
    assert_eq!(key_moment.score(), 10);
    assert_eq!(key_moment.frame.approx_timestamp, 2);

    let image = base64::engine::general_purpose::STANDARD
        .decode(generated.image_b64.unwrap())
        .unwrap();
    assert_eq!(image, vec![0xFF, 0xD8, 0xFF, 0xE0, 2]);

    assert!(!frames_dir.exists());

    let calls = llm.calls();
    assert_eq!(calls.len(), 8);
    let article_prompt = calls[6].0[0].text();
    assert!(article_prompt.contains("What a finish!"));
    assert!(article_prompt.contains("Frame 3: Striker strikes (Importance: 10/10)"));
    assert_eq!(calls[7].1, 50);
}

#[tokio::test]
async fn test_no_scored_frames_still_removes_workspace() {
    let temp_dir = TempDir::new().unwrap();
    let frames_dir = temp_dir.path().join("frames");
    let workspace = FrameWorkspace::create(&frames_dir).await.unwrap();
    let llm = Arc::new(ScriptedLLM::failing());
    let pipeline = pipeline_with(llm.clone(), frames_dir.clone());

    let outcome = pipeline
        .process_sampled(workspace, &[], String::new(), "English")
        .await;

    assert!(matches!(outcome, PipelineOutcome::NoScoredFrames));
    assert!(!frames_dir.exists());
    assert_eq!(llm.call_count(), 0);
}
