//! PDF Stamper Core Library
//!
//! This library provides the core functionality for stamping PDF documents:
//! - Request parsing and validation
//! - Retrieval of the source document and title-block image
//! - Drawing field text and the title-block onto selected pages
//! - Upload of the result to a remote object store

pub mod config;
pub mod error;
pub mod fetch;
pub mod pdf;
pub mod request;
pub mod upload;
pub mod util;

pub use config::{AppConfig, STAMPED_FILENAME, UploadConfig};
pub use error::{Error, Result};
pub use fetch::{Fetcher, HttpFetcher, fetch_optional};
pub use pdf::{ImageFormat, PageIndex, PageSelector, StampDocument, TextColor, TextStyle};
pub use request::{FieldLayout, PlacementSpec, StampPayload, StampRequest, TitleBlockSpec};
pub use upload::{CloudinaryUploader, ObjectStore, UploadResult};

use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, info};

/// Result of a stamp-and-upload run
#[derive(Debug, Clone, PartialEq)]
pub struct StampOutcome {
    /// Public URL of the stamped document
    pub url: String,
    /// Raw response from the object store
    pub raw: Value,
}

/// High-level stamper that combines fetching, editing and uploading
pub struct Stamper {
    fetcher: Arc<dyn Fetcher>,
    store: Option<Arc<dyn ObjectStore>>,
}

impl Stamper {
    /// Create a stamper that can produce documents but not upload them
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            store: None,
        }
    }

    /// Attach the object store used by [`Self::stamp_and_upload`]
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Fetch, stamp and serialize the document described by `request`.
    pub async fn stamp_document(&self, request: &StampRequest) -> Result<Vec<u8>> {
        let source = self
            .fetcher
            .fetch(&request.source_url)
            .await
            .map_err(|e| Error::SourceFetch(Box::new(e)))?;

        let title_block = match request.title_block_url.as_deref() {
            Some(url) => fetch_optional(self.fetcher.as_ref(), url)
                .await
                .map(|bytes| (bytes, ImageFormat::from_url(url))),
            None => None,
        };

        let request = request.clone();
        tokio::task::spawn_blocking(move || render(&source, title_block, &request))
            .await
            .map_err(|e| Error::Task(e.to_string()))?
    }

    /// Stamp the document and upload it as [`STAMPED_FILENAME`].
    pub async fn stamp_and_upload(&self, request: &StampRequest) -> Result<StampOutcome> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| Error::ConfigMissing("upload endpoint".to_string()))?;

        let stamped = self.stamp_document(request).await?;
        let uploaded = store.upload(stamped, STAMPED_FILENAME).await?;

        info!("Stamped {} -> {}", request.source_url, uploaded.url);
        Ok(StampOutcome {
            url: uploaded.url,
            raw: uploaded.raw,
        })
    }
}

/// Draw the title-block and fields onto every selected page.
///
/// The title-block goes down first so field text lands on top of it.
fn render(
    source: &[u8],
    title_block: Option<(Bytes, ImageFormat)>,
    request: &StampRequest,
) -> Result<Vec<u8>> {
    let mut doc = StampDocument::from_bytes(source)?;
    let pages = request.pages.resolve(doc.page_count());
    debug!(
        "Stamping {} of {} pages of {}",
        pages.len(),
        doc.page_count(),
        request.source_url
    );

    let image = title_block
        .map(|(bytes, format)| doc.embed_image(&bytes, format))
        .transpose()?;
    let font = doc.embed_font();

    let spec = request.layout.title_block;
    let image_size = image
        .as_ref()
        .and_then(|image| spec.scaled_size(image.width, image.height));

    for page in pages {
        if let (Some(image), Some((width, height))) = (&image, image_size) {
            doc.draw_image(page, image, spec.x(), spec.y(), width, height)?;
        }

        for (text, placement) in request.drawable_fields() {
            let style = TextStyle {
                x: placement.x,
                y: placement.y,
                size: placement.size,
                max_width: placement.max_width,
                color: TextColor::black(),
            };
            doc.draw_text(page, &font, text, &style)?;
        }
    }

    doc.save()
}
