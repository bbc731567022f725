//! PDF Stamper Web - HTTP service that stamps PDF documents and publishes them.

mod helpers;
mod routes;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use pdf_stamper_core::{AppConfig, UploadConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "pdf-stamper-web")]
#[command(author, version, about = "PDF Stamper Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Config file (defaults to ~/.config/pdf-stamper/config.toml or ./config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Full upload endpoint; takes precedence over the cloud name
    #[arg(long, env = "CLOUDINARY_UPLOAD_URL")]
    upload_url: Option<String>,

    /// Unsigned upload preset
    #[arg(long, env = "CLOUDINARY_UPLOAD_PRESET")]
    upload_preset: Option<String>,

    /// Cloud name used to build the default upload endpoint
    #[arg(long, env = "CLOUDINARY_CLOUD_NAME")]
    cloud_name: Option<String>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Upload settings from the config file, overridden by flags and env.
    fn upload_config(&self) -> Result<UploadConfig> {
        let file_config = match &self.config {
            Some(path) => AppConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => AppConfig::load(),
        };

        Ok(file_config.upload.merged_with(UploadConfig {
            upload_url: self.upload_url.clone(),
            upload_preset: self.upload_preset.clone(),
            cloud_name: self.cloud_name.clone(),
        }))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let upload = args.upload_config()?;
    let state = Arc::new(AppState::new(&upload));
    let app = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("Invalid listen address")?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
