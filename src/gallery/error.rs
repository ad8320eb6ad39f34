use thiserror::Error;

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid path")]
    InvalidPath,

    #[error("Not found")]
    NotFound,

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl From<tokio::task::JoinError> for GalleryError {
    fn from(e: tokio::task::JoinError) -> Self {
        GalleryError::TaskFailed(e.to_string())
    }
}

/// Failure reported by a `PreviewFetcher`. Never surfaced to observers.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Remote error code {0}")]
    Remote(i32),

    #[error("Unsupported artifact source: {0}")]
    Unsupported(String),

    #[error("Node not found")]
    NotFound,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
}
