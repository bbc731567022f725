use std::sync::Arc;

use pdf_stamper_core::{CloudinaryUploader, HttpFetcher, Stamper, UploadConfig};
use tracing::{info, warn};

/// Global application state
///
/// Requests share the stamper read-only; nothing here is mutated after
/// startup.
pub struct AppState {
    stamper: Stamper,
}

impl AppState {
    /// Build state from upload configuration.
    ///
    /// A missing upload endpoint does not stop the server; stamp requests
    /// then fail with a configuration error instead.
    pub fn new(upload: &UploadConfig) -> Self {
        let stamper = Stamper::new(Arc::new(HttpFetcher::new()));

        let stamper = match CloudinaryUploader::new(upload) {
            Ok(uploader) => {
                info!("Uploading stamped documents to {}", uploader.endpoint());
                stamper.with_store(Arc::new(uploader))
            }
            Err(e) => {
                warn!("Uploads disabled: {}", e);
                stamper
            }
        };

        Self::with_stamper(stamper)
    }

    /// Wrap an already-assembled stamper.
    pub const fn with_stamper(stamper: Stamper) -> Self {
        Self { stamper }
    }

    pub const fn stamper(&self) -> &Stamper {
        &self.stamper
    }
}
