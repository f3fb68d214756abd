use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use media_tools::{Ffmpeg, YtDlp};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use broller::cache::{ArtifactStore, DiskCache};
use broller::credits::CreditsLedger;
use broller::resolver::resolve_video;
use broller::{Config, Error, Mode, Pipeline, Request};

#[derive(Parser)]
#[command(name = "b-roller", version, about = "Download b-roll footage, music and assets by link")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Where intermediate downloads are kept
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Where finished files are written
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Attribution ledger
    #[arg(long, global = true)]
    credits_file: Option<PathBuf>,

    /// Do not overlay the source on downloaded videos
    #[arg(long, global = true)]
    no_watermark: bool,

    #[arg(short, long, global = true)]
    verbose: bool
}

#[derive(Subcommand)]
enum Command {
    /// Download content from YouTube
    Yt {
        /// A video id or a YouTube short/long url
        url: String,
        /// The desired start in seconds or the format 00:00:00
        start: Option<String>,
        /// The desired end in seconds or the format 00:00:00
        end: Option<String>,
        #[command(flatten)]
        options: FetchOptions
    },
    /// Download content from any supported platform
    Get {
        url: String,
        #[arg(short, long)]
        start: Option<String>,
        #[arg(short, long)]
        end: Option<String>,
        #[command(flatten)]
        options: FetchOptions
    },
    /// Read links from standard input until `q`
    Cli,
    /// Create an empty credits file
    Init,
    /// Delete every cached download
    ClearCache,
    /// Check the external tools and platform credentials
    Doctor
}

#[derive(Args)]
struct FetchOptions {
    #[arg(short, long, value_enum, default_value_t = Mode::Both)]
    kind: Mode,

    /// Output file name without extension
    #[arg(short, long)]
    name: Option<String>
}

/// One line of the interactive loop.
#[derive(Parser)]
#[command(no_binary_name = true)]
struct Line {
    url: String,
    #[arg(short, long)]
    start: Option<String>,
    #[arg(short, long)]
    end: Option<String>,
    #[command(flatten)]
    options: FetchOptions
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "broller=debug,media_tools=debug"
    } else {
        "broller=info,media_tools=info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into())
        )
        .init();

    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(file) = cli.credits_file {
        config.credits_file = file;
    }
    if cli.no_watermark {
        config.watermark = false;
    }
    tracing::debug!("Cache directory: {}", config.cache_dir.display());

    match cli.command {
        Command::Yt {
            url,
            start,
            end,
            options
        } => {
            let Some(reference) = resolve_video(&url) else {
                println!("\"{url}\" does not look like a YouTube video");
                return Ok(());
            };
            let pipeline = Pipeline::from_config(&config)?;
            let request = build_request(reference.url, start, end, options);
            report(&pipeline, &request).await?;
        }
        Command::Get {
            url,
            start,
            end,
            options
        } => {
            let pipeline = Pipeline::from_config(&config)?;
            report(&pipeline, &build_request(url, start, end, options)).await?;
        }
        Command::Cli => {
            let pipeline = Pipeline::from_config(&config)?;
            interactive(&pipeline).await?;
        }
        Command::Init => {
            let ledger = CreditsLedger::new(&config.credits_file);
            if ledger.init().await? {
                println!("Created {}", ledger.path().display());
            } else {
                println!("{} already exists", ledger.path().display());
            }
        }
        Command::ClearCache => {
            let cache = DiskCache::new(&config.cache_dir);
            let removed = cache.clear().await?;
            println!("Removed {removed} cached files from {}", cache.root().display());
        }
        Command::Doctor => doctor(&config).await?
    }

    Ok(())
}

fn build_request(url: String, start: Option<String>, end: Option<String>, options: FetchOptions) -> Request {
    Request {
        url,
        mode: options.kind,
        start,
        end,
        name: options.name,
        output_dir: None
    }
}

/// Runs one request. Only configuration errors escape; everything else is
/// printed and the caller moves on.
async fn report(pipeline: &Pipeline, request: &Request) -> Result<(), Error> {
    match pipeline.run(request).await {
        Ok(outcome) => {
            println!("Saved {}", outcome.output.display());
            if outcome.degraded {
                println!("Some processing was skipped, the file is less processed than requested");
            }
            Ok(())
        }
        Err(e) if e.is_recoverable() => {
            tracing::error!("{}", e);
            Ok(())
        }
        Err(e) => Err(e)
    }
}

async fn interactive(pipeline: &Pipeline) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"Enter an url or q to exit: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "q" {
            break;
        }

        match Line::try_parse_from(line.split_whitespace()) {
            Ok(parsed) => {
                let request = build_request(parsed.url, parsed.start, parsed.end, parsed.options);
                report(pipeline, &request).await?;
            }
            Err(e) => println!("{e}")
        }
    }

    println!("goodbye");
    Ok(())
}

async fn doctor(config: &Config) -> anyhow::Result<()> {
    let mut ytdlp = YtDlp::with_binary(&config.ytdlp_path);
    ytdlp.set_cookies_file(config.cookies_file.clone());
    match ytdlp.check_binary().await {
        Ok(version) => println!("yt-dlp: {version}"),
        Err(e) => println!("yt-dlp: {e}")
    }
    match Ffmpeg::with_binary(&config.ffmpeg_path).check_binary().await {
        Ok(version) => println!("ffmpeg: {version}"),
        Err(e) => println!("ffmpeg: {e}, processing will be skipped")
    }

    let pipeline = Pipeline::from_config(config)?;
    for (platform, missing) in pipeline.registry().status() {
        match missing {
            None => println!("{platform}: enabled"),
            Some(variable) => println!("{platform}: disabled, set {variable}")
        }
    }
    println!("cache: {}", config.cache_dir.display());
    println!("credits: {}", config.credits_file.display());
    Ok(())
}
