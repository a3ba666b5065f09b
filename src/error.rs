use thiserror::Error;

/// Errors reported by a remote catalog (listing, resolving, token exchange).
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Credentials were rejected (401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The requested media item does not exist.
    #[error("media item not found: {0}")]
    NotFound(String),

    /// The API asked us to slow down (429).
    #[error("rate limit exceeded")]
    RateLimited,

    /// Any other non-success status.
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// A response was missing a field we rely on.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Transport-level HTTP failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Token cache or credentials I/O.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::Unauthorized(message.into()),
            404 => Self::NotFound(message.into()),
            429 => Self::RateLimited,
            _ => Self::Api {
                status,
                message: message.into(),
            },
        }
    }
}

/// Errors from downloading image bytes.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http status {status} fetching image")]
    Status { status: u16 },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Obtaining a valid access token failed.
    #[error(transparent)]
    Auth(#[from] CatalogError),
}

/// Errors reported by the display device.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("unsupported pixel depth: {0} bits per pixel")]
    UnsupportedDepth(u32),

    #[error("frame is {frame} but the device expects {device}")]
    SizeMismatch { frame: String, device: String },

    #[error("invalid framebuffer description: {0}")]
    InvalidGeometry(String),

    #[error("device already closed")]
    Closed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure of a single rotation cycle. Never fatal to the process.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Resolving the media id into a download URL failed.
    #[error("resolve failed: {0}")]
    Resolve(#[source] CatalogError),

    /// Downloading the image failed.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The downloaded bytes are not a recognised still image.
    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),

    /// Scaling or placing the image on the canvas failed.
    #[error("compose failed: {0}")]
    Compose(#[from] anyhow::Error),

    /// Pushing or flushing the frame failed.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// The blocking decode worker panicked or was cancelled.
    #[error("decode worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// How a long-running task ended when it did not finish normally.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The shared cancellation token fired. Not a failure.
    #[error("task cancelled")]
    Cancelled,

    /// Listing the remote catalog failed.
    #[error("catalog listing failed: {0}")]
    Catalog(#[from] CatalogError),
}

impl TaskError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }
}
