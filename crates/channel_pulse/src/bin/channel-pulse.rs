use std::{net::SocketAddr, path::PathBuf, str::FromStr, sync::Arc};

use anyhow::Context;
use apalis::{layers::sentry::SentryLayer, prelude::*};
use apalis_cron::{CronStream, Tick};
use channel_pulse::{
    acquisition::strategies::{AlternateBackends, CookieAuthenticated, ExternalTool, StandardDownload},
    config::PipelineConfig,
    resolver::LatestVideoResolver,
    server,
    tracing::init_tracing_subscriber,
    yt::{feed::FeedClient, ytdlp::YtDlp},
    AudioPipeline, AudioPipelineBuilder,
};
use channel_store::SupabaseStorage;
use clap::{Parser, Subcommand};
use cron::Schedule;

type Pipeline = AudioPipeline<LatestVideoResolver<YtDlp, FeedClient>, SupabaseStorage>;

#[derive(Parser)]
#[command(
    name = "channel-pulse",
    about = "Daily audio archiver for a single video channel"
)]
struct Cli {
    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: String,

    /// Supabase service key
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    supabase_key: String,

    /// Channel URL in /channel/<id> or /@<handle> form
    #[arg(long, env = "CHANNEL_URL")]
    channel_url: String,

    /// Storage bucket receiving the audio files
    #[arg(long, env = "BUCKET_NAME", default_value = "audio")]
    bucket: String,

    /// Working directory for transient downloads
    #[arg(long, env = "DOWNLOAD_DIR", default_value = "audio_downloads")]
    workdir: PathBuf,

    /// Path to a Netscape cookie jar for authenticated downloads
    #[arg(long, env = "YTDLP_COOKIES_PATH", default_value = "cookies.txt")]
    cookies_path: PathBuf,

    /// yt-dlp executable
    #[arg(long, env = "YTDLP_BIN", default_value = "yt-dlp")]
    yt_dlp_bin: PathBuf,

    /// Last-resort downloader command line
    #[arg(long, env = "FALLBACK_TOOL", default_value = "youtube-dl")]
    fallback_tool: String,

    /// IANA zone whose calendar day counts as "today"
    #[arg(long, env = "PIPELINE_TIMEZONE", default_value = "UTC")]
    timezone: String,

    /// Number of listing entries fetched when resolving the latest video
    #[arg(long, env = "LISTING_DEPTH", default_value = "1")]
    listing_depth: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline once and exit
    Run,
    /// Start the cron scheduler
    Cron {
        /// Cron schedule expression, evaluated in UTC
        #[arg(long, env = "CRON_SCHEDULE", default_value = "0 0 17 * * *")]
        schedule: String,

        /// Also serve the health check and manual trigger on this address
        #[arg(long, env = "LISTEN_ADDR")]
        listen: Option<SocketAddr>,
    },
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_key: self.supabase_key.clone(),
            channel_url: self.channel_url.clone(),
            bucket: self.bucket.clone(),
            workdir: self.workdir.clone(),
            cookies_path: self.cookies_path.clone(),
            yt_dlp_bin: self.yt_dlp_bin.clone(),
            fallback_tool: self.fallback_tool.clone(),
            timezone: self.timezone.clone(),
            listing_depth: self.listing_depth,
        }
    }
}

fn build_pipeline(config: &PipelineConfig) -> anyhow::Result<Pipeline> {
    let validated = config.validate().context("Invalid configuration")?;

    let yt_dlp = YtDlp::new(&config.yt_dlp_bin).with_cookies(&config.cookies_path);
    let resolver = LatestVideoResolver::new(validated.channel, yt_dlp.clone(), FeedClient::new()?)
        .listing_depth(config.listing_depth);
    let storage = SupabaseStorage::new(&config.supabase_url, &config.supabase_key, &config.bucket)
        .context("Failed to set up storage client")?;

    let pipeline = AudioPipelineBuilder::new(&config.workdir)
        .resolver(resolver)
        .sink(storage)
        .timezone(validated.zone)
        .strategy(StandardDownload::new(yt_dlp.clone()))
        .strategy(AlternateBackends::new(yt_dlp.clone()))
        .strategy(CookieAuthenticated::new(yt_dlp, &config.cookies_path))
        .strategy(ExternalTool::new(validated.fallback_tool))
        .build();

    Ok(pipeline)
}

async fn handle_tick(_tick: Tick, pipeline: Data<Arc<Pipeline>>) -> anyhow::Result<()> {
    tracing::info!("Running scheduled pipeline...");
    let result = pipeline.run().await;
    tracing::info!(outcome = result.label(), "Scheduled run finished");

    // failures are already logged; the schedule keeps going
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some("production".into()),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    let config = cli.pipeline_config();
    let pipeline = Arc::new(
        build_pipeline(&config).inspect_err(|e| tracing::error!(error = ?e, "Startup failed"))?,
    );

    match cli.command {
        Command::Run => {
            tracing::info!(channel = %config.channel_url, "Running pipeline once...");
            let result = pipeline.run().await;
            if !result.is_ok() {
                anyhow::bail!("Run finished with outcome {}", result.label());
            }
        }
        Command::Cron { schedule, listen } => {
            let schedule = Schedule::from_str(&schedule)
                .with_context(|| format!("Invalid cron schedule {schedule}"))?;
            tracing::info!(%schedule, "Starting cron scheduler...");

            let worker = WorkerBuilder::new("channel-pulse-cron")
                .backend(CronStream::new(schedule))
                .layer(SentryLayer::new())
                .data(pipeline.clone())
                .build(handle_tick);

            match listen {
                Some(addr) => {
                    let listener = tokio::net::TcpListener::bind(addr)
                        .await
                        .with_context(|| format!("Failed to bind {addr}"))?;
                    tracing::info!(%addr, "Serving manual trigger");
                    let app = server::router(pipeline);

                    tokio::try_join!(
                        async { worker.run().await.context("Cron worker stopped") },
                        async { axum::serve(listener, app).await.context("HTTP server stopped") },
                    )?;
                }
                None => worker.run().await?,
            }
        }
    }

    Ok(())
}
