use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use social_post_writer::cli::{Cli, Commands};
use social_post_writer::config::Config;
use social_post_writer::transcript::{fetch_transcript_text, YoutubeTranscriptClient};
use social_post_writer::web::{self, AppState};
use social_post_writer::writer::{ContentGenerator, GenerateRequest, Platform, PostWriter};
use social_post_writer::{output, OpenAiClient};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "social_post_writer=debug"
    } else {
        "social_post_writer=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Platforms => {
            println!("Supported platforms:");
            for platform in Platform::ALL {
                let marker = if platform.is_default() { " (default)" } else { "" };
                println!("  • {} [{}]{}", platform.label(), platform.slug(), marker);
            }
        }
        Commands::Transcript { video, languages } => {
            let config = Config::load().await?;
            let client = transcript_client(&config)?;
            let languages = if languages.is_empty() {
                config.transcript.languages.clone()
            } else {
                languages
            };

            let progress = spinner(cli.quiet, "Fetching transcript...");
            let fetched = fetch_transcript_text(&client, &video, &languages).await;
            finish(progress);

            match fetched {
                Ok(text) => {
                    println!("Transcript fetched successfully:");
                    println!("{}", text);
                }
                Err(e) => {
                    eprintln!("Failed to fetch transcript: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Draft { video, languages } => {
            let config = Config::load().await?;
            let writer = post_writer(&config)?;

            let progress = spinner(cli.quiet, "Fetching transcript and generating content...");
            let result = writer.draft_posts(&video, &languages).await;
            finish(progress);

            println!("Generated Post:\n {}", result?);
        }
        Commands::Generate {
            video,
            platforms,
            query,
            languages,
            output,
            format,
        } => {
            let config = Config::load().await?;
            let writer = post_writer(&config)?;

            tracing::info!("Starting content generation for video: {}", video);

            let progress = spinner(cli.quiet, "Fetching transcript and generating content...");
            let result = writer
                .generate(GenerateRequest {
                    video,
                    platforms,
                    query: Some(query),
                    languages,
                })
                .await;
            finish(progress);
            let results = result?;
            let format = config.app.output_format(format);

            match output {
                Some(path) => {
                    output::save_to_file(&results, &path, &format).await?;
                    println!("Content saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&results, &format)?;
                }
            }
        }
        Commands::Serve { bind } => {
            let config = Config::load().await?;
            let writer = post_writer(&config)?;
            let bind_addr = bind.unwrap_or_else(|| config.web.bind_addr.clone());

            web::serve(
                &bind_addr,
                AppState {
                    generator: Arc::new(writer),
                },
            )
            .await?;
        }
        Commands::Config { show } => {
            let config = Config::load().await?;
            if show {
                config.display();
            } else {
                println!("Configuration file:");
                println!("  {}", Config::config_path()?.display());
                println!("Run with --show to print the current values.");
            }
        }
    }

    Ok(())
}

fn transcript_client(config: &Config) -> Result<YoutubeTranscriptClient> {
    Ok(YoutubeTranscriptClient::builder()
        .proxy(config.transcript.proxy.clone())
        .timeout(Duration::from_secs(config.transcript.timeout_seconds))
        .build()?)
}

fn post_writer(config: &Config) -> Result<PostWriter> {
    let backend = OpenAiClient::from_config(config)?;
    let transcripts = transcript_client(config)?;
    Ok(PostWriter::new(config, Arc::new(transcripts), Arc::new(backend)))
}

fn spinner(quiet: bool, message: &'static str) -> Option<ProgressBar> {
    if quiet {
        return None;
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(100));
    Some(progress)
}

fn finish(progress: Option<ProgressBar>) {
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }
}
