//! Storybook CLI - serve the book API or generate a book from the terminal.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use storybook::book::GenerationRequest;
use storybook::config::Config;
use storybook::console::Console;
use storybook::error::Result;
use storybook::fallback::build_fallback_book;
use storybook::render::{RenderOptions, export_file_name, inline_images, render_book_html};
use storybook::safety::DEFAULT_SAFE_IMAGE_MODEL;
use storybook::server::{self, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Illustrated children's book generator.
#[derive(Parser, Debug)]
#[command(name = "storybook")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve,

    /// Generate one book and write it to disk.
    Generate {
        /// The story idea.
        prompt: String,

        /// Reading grade level, 1 to 5.
        #[arg(long, default_value = "3")]
        grade: String,

        /// Language to write the story in.
        #[arg(long, default_value = "English")]
        language: String,

        /// Illustration style, e.g. "Watercolor" or "Indian Warli art".
        #[arg(long)]
        art_style: Option<String>,

        /// Text model override.
        #[arg(long)]
        text_model: Option<String>,

        /// Image model (must be on the safe list).
        #[arg(long, default_value = DEFAULT_SAFE_IMAGE_MODEL)]
        image_model: String,

        /// Output file (defaults to the book title).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the book as JSON instead of HTML.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let default_filter = match args.command {
        Command::Serve => "storybook=info,tower_http=info",
        Command::Generate { .. } => "storybook=warn",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let console = Console::new();
    let config = load_config(args.config.as_ref(), &console)?;

    match args.command {
        Command::Serve => {
            console.section("Storybook - Book Generation Server");
            if !config.is_online() {
                console.warning("No Venice.ai API key configured, serving offline books only");
            }
            let state = AppState::from_config(config).context("Failed to initialize provider")?;
            server::serve(state).await
        }
        Command::Generate {
            prompt,
            grade,
            language,
            art_style,
            text_model,
            image_model,
            output,
            json,
        } => {
            let request = GenerationRequest {
                prompt: Some(prompt),
                grade_level: Some(grade),
                language: Some(language),
                art_style,
                text_model,
                image_model: Some(image_model),
            };
            generate(config, request, output, json, &console).await
        }
    }
}

/// Loads, overrides and validates the configuration.
fn load_config(path: Option<&PathBuf>, console: &Console) -> Result<Config> {
    console.step("Loading configuration...");
    let mut config = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    config
        .apply_env()
        .context("Invalid environment override")?;
    config.validate().context("Invalid configuration")?;

    if !config.is_online() {
        let config_path = match path {
            Some(path) => path.clone(),
            None => Config::config_path()?,
        };
        console.info(&format!(
            "API key not configured, offline mode. Set it in {} or VENICE_API_KEY.",
            config_path.display()
        ));
    }
    console.success("Configuration loaded");
    Ok(config)
}

/// Generates a book and writes it as HTML or JSON.
async fn generate(
    config: Config,
    request: GenerationRequest,
    output: Option<PathBuf>,
    json: bool,
    console: &Console,
) -> Result<()> {
    request.validate()?;
    console.section("Storybook - Children's Book Generator");

    let signature = config.render.signature.clone();
    let state = AppState::from_config(config).context("Failed to initialize provider")?;

    let book = match state.pipeline() {
        None => {
            console.warning("Using the offline story generator");
            build_fallback_book(&request)
        }
        Some(pipeline) => {
            console.step(&format!(
                "Writing and illustrating \"{}\"...",
                request.prompt_text()
            ));
            match pipeline.generate_book(&request).await {
                Ok(book) => book,
                Err(e) => {
                    console.error(&format!("Generation failed: {}", e));
                    console.warning("Falling back to the offline story generator");
                    build_fallback_book(&request)
                }
            }
        }
    };
    console.success(&format!(
        "Generated {} pages",
        console.count(book.story.len())
    ));
    console.book(&book);

    let path = output.unwrap_or_else(|| {
        let name = export_file_name(&book.title);
        if json {
            PathBuf::from(name).with_extension("json")
        } else {
            PathBuf::from(name)
        }
    });

    let content = if json {
        serde_json::to_string_pretty(&book)?
    } else {
        console.step("Embedding illustrations...");
        let book = inline_images(&book, state.fetcher.as_ref())
            .await
            .context("Failed to download illustrations")?;
        render_book_html(&book, &RenderOptions { signature })
    };

    tokio::fs::write(&path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    console.success(&format!("Saved {}", path.display()));

    console.section("Done!");
    Ok(())
}
