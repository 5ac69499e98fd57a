use anyhow::{anyhow, bail, Context, Result};
use base64::Engine as _;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use sports_news_rust::article::ArticleComposer;
use sports_news_rust::pipeline::{ArticlePipeline, GeneratedArticle, PipelineOutcome};
use sports_news_rust::session::ArticleSession;
use sports_news_rust::{create_llm, Config, QuickEdit};

fn session_arg(required: bool) -> Arg {
    Arg::new("session")
        .short('s')
        .long("session")
        .value_name("FILE")
        .help("Session file holding the current article")
        .value_parser(clap::value_parser!(PathBuf))
        .required(required)
}

fn article_language_arg() -> Arg {
    Arg::new("article-language")
        .short('l')
        .long("article-language")
        .value_name("LANGUAGE")
        .help("Language of the generated article (e.g. English, Spanish)")
}

fn cli() -> Command {
    Command::new("Sports News Generator")
        .bin_name("sports-news")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Turn match videos and raw match data into short news articles")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("video")
                .about("Generate an article from a match video")
                .arg(
                    Arg::new("path")
                        .value_name("VIDEO")
                        .help("Video file (mp4, mkv, mov, avi)")
                        .value_parser(clap::value_parser!(PathBuf))
                        .required(true),
                )
                .arg(
                    Arg::new("spoken-language")
                        .long("spoken-language")
                        .value_name("CODE")
                        .help("Language spoken in the video (e.g. en, es), or 'auto'"),
                )
                .arg(article_language_arg())
                .arg(session_arg(false))
                .arg(
                    Arg::new("image-out")
                        .long("image-out")
                        .value_name("FILE")
                        .help("Write the key-moment frame to this JPEG file")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("text")
                .about("Generate an article from raw match data")
                .arg(
                    Arg::new("text")
                        .value_name("TEXT")
                        .help("Match data given inline")
                        .conflicts_with("file"),
                )
                .arg(
                    Arg::new("file")
                        .short('f')
                        .long("file")
                        .value_name("PATH")
                        .help("Match data file (.json, .csv or .txt)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(article_language_arg())
                .arg(session_arg(false)),
        )
        .subcommand(
            Command::new("edit")
                .about("Edit the current article with a free-form instruction")
                .arg(session_arg(true))
                .arg(
                    Arg::new("instruction")
                        .short('i')
                        .long("instruction")
                        .value_name("TEXT")
                        .help("What to change")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("quick-edit")
                .about("Apply a one-click edit preset")
                .arg(session_arg(true))
                .arg(
                    Arg::new("preset")
                        .value_name("PRESET")
                        .value_parser(QuickEdit::NAMES)
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("reset")
                .about("Restore the originally generated article")
                .arg(session_arg(true)),
        )
        .subcommand(
            Command::new("show")
                .about("Print the current article")
                .arg(session_arg(true)),
        )
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "sports_news_rust=debug,sports_news=debug,info"
    } else {
        "sports_news_rust=info,sports_news=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    if let Some(path) = matches.get_one::<PathBuf>("config") {
        return Config::from_file(path);
    }

    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            debug!("{}, using defaults", e);
            Ok(Config::from_env())
        }
    }
}

fn build_composer(config: &Config) -> Result<ArticleComposer> {
    config.validate()?;
    let llm = create_llm(&config.llm)?;
    Ok(ArticleComposer::new(Arc::from(llm)))
}

fn print_article(article: &str, caption: Option<&str>, has_image: bool) {
    println!("{}", article.trim());
    if let Some(caption) = caption {
        println!("\n📸 {}", caption);
    }
    if has_image {
        println!("(key-moment image attached)");
    }
}

async fn finish_generation(
    generated: GeneratedArticle,
    session_path: Option<&PathBuf>,
    image_out: Option<&PathBuf>,
    video_path: Option<&Path>,
) -> Result<()> {
    if generated.is_error() {
        bail!("Article generation failed: {}", generated.article);
    }

    print_article(
        &generated.article,
        generated.caption.as_deref(),
        generated.image_b64.is_some(),
    );

    if let (Some(path), Some(image)) = (image_out, generated.image_b64.as_deref()) {
        let bytes = base64::engine::general_purpose::STANDARD.decode(image)?;
        tokio::fs::write(path, bytes)
            .await
            .with_context(|| format!("Cannot write image {}", path.display()))?;
        info!("🖼️ Key-moment image written to {}", path.display());
    }

    if let Some(path) = session_path {
        let session = match video_path {
            Some(video_path) => ArticleSession::from_video(
                generated.article,
                generated.image_b64,
                generated.caption,
                generated.language,
                video_path,
            ),
            None => ArticleSession::from_text(generated.article, generated.language),
        };
        session.save(path).await?;
        info!("💾 Session saved to {}", path.display());
    }

    Ok(())
}

fn report_empty(outcome: &PipelineOutcome) {
    match outcome {
        PipelineOutcome::NoFrames => warn!("No frames could be extracted, nothing to do"),
        PipelineOutcome::NoScoredFrames => warn!("No frame could be scored, nothing to do"),
        PipelineOutcome::EmptyInput => warn!("No match data provided, nothing to do"),
        PipelineOutcome::Generated(_) => {}
    }
}

async fn run_video(config: Config, matches: &ArgMatches) -> Result<()> {
    let video_path = matches
        .get_one::<PathBuf>("path")
        .ok_or_else(|| anyhow!("Missing video path"))?;

    if !video_path.exists() {
        bail!("Video file does not exist: {}", video_path.display());
    }

    let spoken_language = matches
        .get_one::<String>("spoken-language")
        .cloned()
        .or_else(|| config.article.default_spoken_language.clone())
        .filter(|code| !code.eq_ignore_ascii_case("auto"));
    let article_language = matches
        .get_one::<String>("article-language")
        .cloned()
        .unwrap_or_else(|| config.article.default_language.clone());

    let pipeline = ArticlePipeline::new(config)?;
    let outcome = pipeline
        .process_video(video_path, spoken_language.as_deref(), &article_language)
        .await?;

    match outcome {
        PipelineOutcome::Generated(generated) => {
            finish_generation(
                generated,
                matches.get_one::<PathBuf>("session"),
                matches.get_one::<PathBuf>("image-out"),
                Some(video_path),
            )
            .await
        }
        other => {
            report_empty(&other);
            Ok(())
        }
    }
}

async fn run_text(config: Config, matches: &ArgMatches) -> Result<()> {
    let article_language = matches
        .get_one::<String>("article-language")
        .cloned()
        .unwrap_or_else(|| config.article.default_language.clone());

    let pipeline = ArticlePipeline::new(config)?;
    let outcome = match matches.get_one::<PathBuf>("file") {
        Some(path) => pipeline.process_data_file(path, &article_language).await?,
        None => {
            let text = matches.get_one::<String>("text").map(String::as_str).unwrap_or("");
            pipeline.process_text(text, &article_language).await
        }
    };

    match outcome {
        PipelineOutcome::Generated(generated) => {
            finish_generation(generated, matches.get_one::<PathBuf>("session"), None, None).await
        }
        other => {
            report_empty(&other);
            Ok(())
        }
    }
}

fn required_session(matches: &ArgMatches) -> Result<&PathBuf> {
    matches
        .get_one::<PathBuf>("session")
        .ok_or_else(|| anyhow!("Missing --session"))
}

async fn run_edit(config: Config, matches: &ArgMatches, preset: Option<QuickEdit>) -> Result<()> {
    let session_path = required_session(matches)?;
    let mut session = ArticleSession::load(session_path).await?;
    let composer = build_composer(&config)?;

    let edited = match preset {
        Some(preset) => {
            composer
                .quick_edit(&session.article, preset, &session.language)
                .await
        }
        None => {
            let instruction = matches
                .get_one::<String>("instruction")
                .ok_or_else(|| anyhow!("Missing --instruction"))?;
            composer
                .edit_article(&session.article, instruction, &session.language)
                .await
        }
    };

    if !session.apply_edit(edited) {
        bail!("Article editing failed, previous version kept");
    }

    session.save(session_path).await?;
    print_article(&session.article, session.caption.as_deref(), session.has_image());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    let config = load_config(&matches)?;
    debug!("{}", config.summary());

    match matches.subcommand() {
        Some(("video", sub)) => run_video(config, sub).await,
        Some(("text", sub)) => run_text(config, sub).await,
        Some(("edit", sub)) => run_edit(config, sub, None).await,
        Some(("quick-edit", sub)) => {
            let preset = sub
                .get_one::<String>("preset")
                .ok_or_else(|| anyhow!("Missing preset"))?
                .parse::<QuickEdit>()
                .map_err(|e| anyhow!(e))?;
            run_edit(config, sub, Some(preset)).await
        }
        Some(("reset", sub)) => {
            let session_path = required_session(sub)?;
            let mut session = ArticleSession::load(session_path).await?;
            session.reset_to_original();
            session.save(session_path).await?;
            print_article(&session.article, session.caption.as_deref(), session.has_image());
            Ok(())
        }
        Some(("show", sub)) => {
            let session = ArticleSession::load(required_session(sub)?).await?;
            print_article(&session.article, session.caption.as_deref(), session.has_image());
            Ok(())
        }
        _ => Err(anyhow!("Unknown command")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn test_quick_edit_rejects_unknown_preset() {
        let result = cli().try_get_matches_from(["sports-news", "quick-edit", "-s", "s.json", "louder"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let matches = cli()
            .try_get_matches_from(["sports-news", "show", "--session", "s.json", "-v"])
            .unwrap();
        assert!(matches.get_flag("verbose"));
    }

    #[test]
    fn test_text_and_file_conflict() {
        let result =
            cli().try_get_matches_from(["sports-news", "text", "Team A won", "--file", "m.json"]);
        assert!(result.is_err());
    }
}
