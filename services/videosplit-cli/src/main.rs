//! videosplit
//!
//! Uploads local videos to the split service, one at a time:
//! 1. Loads config and the persisted session
//! 2. Refreshes the profile to learn the plan tier (queue capacity)
//! 3. Queues the given files, printing each rejection
//! 4. Runs the upload pipeline, printing one line per transition

mod config;
mod render;

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use videosplit_auth::{CredentialStore, PlanTier};
use videosplit_gateway::{GatewayConfig, LogoutHook, SessionGateway};
use videosplit_upload::{
    DirectUploadTransport, GatewayTransport, Pipeline, SourceFile, UploadQueue, UploadTransport,
    capacity_for,
};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "videosplit", version)]
#[command(about = "Split videos into equal-length segments")]
struct Args {
    /// Config file (default: $CONFIG_PATH, then ./videosplit.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<String>,

    /// Log as JSON
    #[arg(long)]
    json: bool,

    /// Use this plan's queue capacity instead of the profile's
    #[arg(long, value_name = "TIER")]
    plan: Option<PlanTier>,

    /// Segment length in seconds
    #[arg(long, value_name = "SECONDS")]
    segment_duration: Option<u32>,

    /// Upload straight to object storage, then ask the API to process
    #[arg(long)]
    direct: bool,

    #[arg(required = true, value_name = "FILES")]
    files: Vec<PathBuf>,
}

fn init_tracing(json: bool) {
    // LOG_LEVEL wins over RUST_LOG; logs go to stderr, results to stdout
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.json);

    let config_path = Config::resolve_path(args.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let mut options = config.split_options()?;
    if let Some(secs) = args.segment_duration {
        options.segment_duration = secs;
        options.validate()?;
    }
    info!(
        base_url = %config.api.base_url,
        segment_duration = options.segment_duration,
        "configuration loaded"
    );

    let session_path = config.credentials_path();
    let store = Arc::new(
        CredentialStore::load(session_path.clone())
            .await
            .with_context(|| format!("failed to load session from {}", session_path.display()))?,
    );
    if !store.is_authenticated().await {
        eprintln!(
            "not signed in: no session at {}, log in first",
            session_path.display()
        );
        return Ok(ExitCode::FAILURE);
    }

    let client = reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .context("failed to build HTTP client")?;
    let logout: Arc<dyn LogoutHook> = Arc::new(|reason: &str| {
        eprintln!("session expired, log in again ({reason})");
    });
    let gateway = SessionGateway::new(
        client.clone(),
        GatewayConfig {
            base_url: config.api.base_url.clone(),
            refresh_attempts: config.session.refresh_attempts,
            refresh_backoff: config.refresh_backoff(),
        },
        Arc::clone(&store),
        logout,
    );

    let tier = match args.plan {
        Some(tier) => tier,
        None => resolve_plan(&gateway, &store).await,
    };
    let capacity = capacity_for(tier);
    info!(plan = tier.label(), capacity, "queue capacity resolved");

    let queue = UploadQueue::new();
    for path in &args.files {
        let file = match SourceFile::open(path).await {
            Ok(file) => file,
            Err(e) => {
                eprintln!("skipped {}: {e}", path.display());
                continue;
            }
        };
        if let Err(rejection) = queue.enqueue(file, capacity) {
            eprintln!("{}", render::rejection_line(&rejection));
        }
    }
    if queue.is_empty() {
        eprintln!("nothing to upload");
        return Ok(ExitCode::FAILURE);
    }

    let names: HashMap<_, _> = queue
        .snapshot()
        .into_iter()
        .map(|item| (item.id, item.file.name().to_owned()))
        .collect();
    let transport: Box<dyn UploadTransport> = if args.direct || config.upload.direct {
        info!("using direct storage uploads");
        Box::new(DirectUploadTransport::new(gateway, client, options))
    } else {
        Box::new(GatewayTransport::new(gateway, options))
    };
    let pipeline = Pipeline::new(config.item_delay());

    let report = pipeline
        .run(&queue, transport.as_ref(), |progress| {
            let name = names.get(&progress.item_id).map_or("?", String::as_str);
            println!("{}", render::progress_line(progress, name));
        })
        .await?;

    for line in render::report_lines(&report) {
        println!("{line}");
    }

    if report.is_total_failure() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Plan tier from a fresh profile, else the cached one, else `free`.
async fn resolve_plan(gateway: &SessionGateway, store: &CredentialStore) -> PlanTier {
    match gateway.fetch_profile().await {
        Ok(profile) => profile.plan_tier,
        Err(e) => {
            let cached = store.profile().await.map(|p| p.plan_tier);
            warn!(error = %e, cached = ?cached, "profile refresh failed, using cached plan");
            cached.unwrap_or_default()
        }
    }
}
