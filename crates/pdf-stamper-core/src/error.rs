use thiserror::Error;

/// Unified error type for pdf-stamper-core
///
/// This enum encompasses all error cases that can occur while stamping:
/// - Request validation
/// - Network retrieval of the source document and title-block image
/// - PDF operations (opening, editing, saving)
/// - Upload to the remote object store
/// - Configuration loading
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Request Errors
    // ==========================================================================
    /// The request is missing required input
    #[error("{0}")]
    Validation(String),

    // ==========================================================================
    // Fetch Errors
    // ==========================================================================
    /// The remote server answered with a non-success status
    #[error("failed to fetch {url}: HTTP {status}")]
    Fetch { url: String, status: u16 },

    /// The request never produced a response (DNS, connect, TLS, body read)
    #[error("failed to fetch {url}: {reason}")]
    FetchTransport { url: String, reason: String },

    /// The source document could not be retrieved
    #[error("failed to fetch original PDF: {0}")]
    SourceFetch(Box<Error>),

    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Failed to open or parse a PDF file
    #[error("failed to open PDF: {0}")]
    PdfOpen(String),

    /// Invalid page number requested
    #[error("invalid page number {page} (document has {total} pages)")]
    PdfInvalidPage { page: usize, total: usize },

    /// Failed to edit a page (resources, content streams)
    #[error("failed to edit PDF: {0}")]
    PdfEdit(String),

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Failed to decode or embed an image
    #[error("failed to embed image: {0}")]
    ImageDecode(String),

    // ==========================================================================
    // Upload Errors
    // ==========================================================================
    /// The object store rejected the upload
    #[error("Cloudinary upload failed: {status} {body}")]
    Upload { status: u16, body: String },

    /// The upload request could not be sent
    #[error("Cloudinary upload request failed: {0}")]
    UploadRequest(String),

    /// The object store answered without a usable URL
    #[error("invalid upload response: {0}")]
    UploadResponseShape(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Missing required configuration field
    #[error("missing required config field: {0}")]
    ConfigMissing(String),

    // ==========================================================================
    // Internal Errors
    // ==========================================================================
    /// A blocking worker task panicked or was cancelled
    #[error("background task failed: {0}")]
    Task(String),

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error was caused by the caller's input rather than the
    /// pipeline itself.
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
