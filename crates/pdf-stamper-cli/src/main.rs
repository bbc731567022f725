//! PDF Stamper CLI - Command line tool for stamping PDF documents.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use clap::Parser;
use pdf_stamper_core::{
    AppConfig, CloudinaryUploader, Error, Fetcher, HttpFetcher, StampPayload, Stamper,
    UploadConfig,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "pdf-stamp")]
#[command(author, version, about = "Stamp field values and a title block onto a PDF", long_about = None)]
struct Args {
    /// Stamp request as JSON (same body as POST /api/stamp)
    #[arg(required = true)]
    request: PathBuf,

    /// Write the stamped PDF here instead of uploading it
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stamp only specific pages (e.g., "1-5" or "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Config file path
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

/// Highest page number accepted by `--pages`.
const MAX_PAGE_NUMBER: usize = 100_000;

/// Parse a 1-based page list into 0-based indices, keeping the given order.
fn parse_page_range(pages: &str) -> Result<Vec<usize>> {
    let mut result = Vec::new();

    for part in pages.split(',') {
        let part = part.trim();
        if let Some((start, end)) = part.split_once('-') {
            let start: usize = start.trim().parse().context("Invalid page range start")?;
            let end: usize = end.trim().parse().context("Invalid page range end")?;
            anyhow::ensure!(start > 0 && start <= end, "Invalid page range: {part}");
            anyhow::ensure!(
                end <= MAX_PAGE_NUMBER,
                "Page {end} is beyond the last supported page ({MAX_PAGE_NUMBER})"
            );
            result.extend((start..=end).map(|p| p - 1));
        } else {
            let page: usize = part.parse().context("Invalid page number")?;
            anyhow::ensure!(page > 0, "Page numbers start at 1");
            anyhow::ensure!(
                page <= MAX_PAGE_NUMBER,
                "Page {page} is beyond the last supported page ({MAX_PAGE_NUMBER})"
            );
            result.push(page - 1);
        }
    }

    Ok(result)
}

/// Reads local paths and `file://` URLs from disk, and `http(s)://` URLs over HTTP.
struct LocalFetcher {
    http: HttpFetcher,
}

impl LocalFetcher {
    fn new() -> Self {
        Self {
            http: HttpFetcher::new(),
        }
    }

    fn source(url: &str) -> pdf_stamper_core::Result<Source<'_>> {
        let Some((scheme, rest)) = url.split_once("://") else {
            return Ok(Source::File(Path::new(url)));
        };

        match scheme.to_ascii_lowercase().as_str() {
            "http" | "https" => Ok(Source::Http),
            "file" => Ok(Source::File(Path::new(rest))),
            _ => Err(Error::FetchTransport {
                url: url.to_string(),
                reason: format!("unsupported URL scheme '{scheme}'"),
            }),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Source<'a> {
    File(&'a Path),
    Http,
}

#[async_trait]
impl Fetcher for LocalFetcher {
    async fn fetch(&self, url: &str) -> pdf_stamper_core::Result<Bytes> {
        match Self::source(url)? {
            Source::File(path) => {
                info!("Reading {}", path.display());
                Ok(Bytes::from(tokio::fs::read(path).await?))
            }
            Source::Http => self.http.fetch(url).await,
        }
    }
}

fn upload_config(args: &Args) -> Result<UploadConfig> {
    let file_config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    Ok(file_config.upload.merged_with(UploadConfig {
        upload_url: args.upload_url.clone(),
        upload_preset: args.upload_preset.clone(),
        cloud_name: args.cloud_name.clone(),
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let raw = std::fs::read_to_string(&args.request)
        .with_context(|| format!("Failed to read request: {}", args.request.display()))?;
    let mut payload: StampPayload =
        serde_json::from_str(&raw).context("Request is not a valid stamp request")?;

    if let Some(ref page_spec) = args.pages {
        payload.pages = Some(parse_page_range(page_spec)?);
    }

    let request = payload.into_request()?;
    let stamper = Stamper::new(Arc::new(LocalFetcher::new()));

    if let Some(output_path) = &args.output {
        let stamped = stamper
            .stamp_document(&request)
            .await
            .context(format!("Failed to stamp {}", request.source_url))?;

        std::fs::write(output_path, stamped)
            .context(format!("Failed to write output: {}", output_path.display()))?;

        // CLI output is intentional
        #[allow(clippy::print_stdout)]
        {
            println!("Stamped PDF saved to: {}", output_path.display());
        }
        return Ok(());
    }

    let uploader = CloudinaryUploader::new(&upload_config(&args)?)
        .context("No upload destination configured (use --output to write a local file)")?;
    let stamper = stamper.with_store(Arc::new(uploader));

    let outcome = stamper
        .stamp_and_upload(&request)
        .await
        .context(format!("Failed to stamp {}", request.source_url))?;

    let body = json!({
        "stampedUrl": outcome.url,
        "cloudinary": outcome.raw,
    });

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&body)?);
    }

    Ok(())
}
