use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use tokfetch::commands;
use tokfetch::tiktok::{ClientConfig, DEFAULT_POST_COUNT, TIKTOK_WEB_BASE};
use tracing::{debug, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "tokfetch",
    version,
    about = "Download a TikTok user's videos",
    long_about = "A CLI tool that lists a TikTok user's posts and saves each video as <id>.mp4"
)]
struct Cli {
    /// Directory the videos are written to
    #[arg(
        short,
        long = "output-dir",
        env = "TOKFETCH_OUTPUT_DIR",
        default_value = ".",
        global = true
    )]
    output_dir: PathBuf,

    /// Base URL of the TikTok web API
    #[arg(long, env = "TOKFETCH_API_BASE", default_value = TIKTOK_WEB_BASE, global = true)]
    api_base: String,

    /// TikTok web session token (msToken cookie)
    #[arg(long, env = "TIKTOK_MS_TOKEN", global = true, hide_env_values = true)]
    ms_token: Option<String>,

    /// Number of posts requested from the post list
    #[arg(short, long, default_value_t = DEFAULT_POST_COUNT, global = true)]
    count: u32,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download every video posted by a user (the default command)
    Download {
        /// TikTok handle whose videos are downloaded
        #[arg(default_value = commands::download::DEFAULT_HANDLE)]
        handle: String,
    },

    /// List a user's videos without downloading them
    ListVideos {
        /// TikTok handle (with or without @ symbol)
        #[arg(required = true)]
        handle: String,

        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download a single video
    FetchVideo {
        /// URL or ID of the video to download
        #[arg(required = true)]
        video_url_or_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Parse before logging is set up so --verbose can pick the level
    let args = Cli::parse();

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if args.verbose {
        debug!("Verbose mode enabled");
    }

    let output_dir = args.output_dir;
    let config = ClientConfig {
        api_base: args.api_base,
        ms_token: args.ms_token,
        post_count: args.count,
    };

    let command = args.command.unwrap_or_else(|| Commands::Download {
        handle: commands::download::DEFAULT_HANDLE.to_string(),
    });

    match command {
        Commands::Download { handle } => {
            ensure_output_dir(&output_dir)?;
            commands::download::execute(&handle, &output_dir, config).await?
        }
        Commands::ListVideos { handle, json } => {
            commands::list_videos::execute(&handle, json, config).await?
        }
        Commands::FetchVideo { video_url_or_id } => {
            ensure_output_dir(&output_dir)?;
            commands::fetch_video::execute(&video_url_or_id, &output_dir, config).await?
        }
    }

    Ok(())
}

/// Creates the output directory for commands that write videos
fn ensure_output_dir(output_dir: &Path) -> Result<()> {
    if !output_dir.exists() {
        std::fs::create_dir_all(output_dir).context("Failed to create output directory")?;
        info!("Created output directory: {path}", path = output_dir.display());
    }
    Ok(())
}
