//! Binary entrypoint for gphotos-frame.
//!
//! Wires configuration, credentials and the framebuffer into the library's
//! orchestrator; no slideshow logic lives here.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use gphotos_frame::config::Configuration;
use gphotos_frame::device::{Device, Framebuffer};
use gphotos_frame::google::{Authenticator, ClientSecrets, GooglePhotos, TokenStore, http_client};
use gphotos_frame::index::SharedIndex;
use gphotos_frame::orchestrator;
use gphotos_frame::pipeline::ImagePipeline;

#[derive(Debug, Parser)]
#[command(
    name = "gphotos-frame",
    version,
    about = "Google Photos slideshow on a Linux framebuffer"
)]
struct Cli {
    /// Path to YAML config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Framebuffer device to draw on
    #[arg(short, long, value_name = "PATH")]
    device: Option<PathBuf>,

    /// Time between photos, e.g. "30s" or "5m"
    #[arg(short = 't', long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    interval: Option<Duration>,

    /// OAuth client secrets JSON
    #[arg(short, long, value_name = "FILE")]
    credentials: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn configuration(&self) -> Result<Configuration> {
        let mut cfg = match &self.config {
            Some(path) => Configuration::from_yaml_file(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?,
            None => Configuration::default(),
        };
        if let Some(device) = &self.device {
            cfg.device = device.clone();
        }
        if let Some(interval) = self.interval {
            cfg.rotation_interval = interval;
        }
        if let Some(credentials) = &self.credentials {
            cfg.credentials = credentials.clone();
        }
        cfg.validated().context("invalid configuration values")
    }
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("gphotos_frame={level}").parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = cli.configuration()?;
    info!("effective configuration:\n{cfg:#?}");

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let device = Framebuffer::open(&cfg.device)
        .with_context(|| format!("failed to open framebuffer {}", cfg.device.display()))?;
    info!(device = %cfg.device.display(), bounds = %device.bounds(), "framebuffer ready");

    let http = http_client(cfg.request_timeout).context("failed to build http client")?;
    let secrets = ClientSecrets::from_file(&cfg.credentials).with_context(|| {
        format!("failed to read client secrets from {}", cfg.credentials.display())
    })?;
    let store = TokenStore::new(&cfg.token_cache);
    let auth = Authenticator::bootstrap(http.clone(), secrets, store, &cancel)
        .await
        .context("failed to authorize with Google Photos")?;

    let photos = Arc::new(
        GooglePhotos::new(http, Arc::new(auth))
            .with_page_size(cfg.page_size)
            .with_photos_only(cfg.photos_only),
    );
    let pipeline = ImagePipeline::new(photos.clone(), photos.clone(), cfg.pipeline_options());
    let index = match cfg.shuffle_seed {
        Some(seed) => SharedIndex::with_seed(seed),
        None => SharedIndex::new(),
    };

    orchestrator::run(
        photos.as_ref(),
        &pipeline,
        device,
        &index,
        cfg.rotation_interval,
        cancel,
    )
    .await
}
