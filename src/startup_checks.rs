use crate::Config;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create cache directory: {0}")]
    CacheDirectoryCreationFailed(#[from] std::io::Error),

    #[error("Gallery source directory does not exist: {0}")]
    SourceDirectoryMissing(String),

    #[error("Gallery source directory is not readable: {0}")]
    SourceDirectoryUnreadable(String),
}

impl StartupCheckError {
    /// Whether the gallery cannot run at all.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            StartupCheckError::SourceDirectoryMissing(_)
                | StartupCheckError::SourceDirectoryUnreadable(_)
        )
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();
    let gallery = &config.gallery;

    info!("Performing startup checks...");

    // Thumbnail and preview caches
    for cache_dir in [gallery.thumbnail_directory(), gallery.preview_directory()] {
        if cache_dir.exists() {
            info!("Cache directory exists: {:?}", cache_dir);
            continue;
        }

        info!("Cache directory does not exist, creating: {:?}", cache_dir);
        if let Err(e) = tokio::fs::create_dir_all(&cache_dir).await {
            error!("Failed to create cache directory {:?}: {}", cache_dir, e);
            errors.push(StartupCheckError::CacheDirectoryCreationFailed(e));
        }
    }

    let source_dir = Path::new(&gallery.source_directory);
    if !source_dir.exists() {
        error!("Source directory does not exist: {:?}", source_dir);
        errors.push(StartupCheckError::SourceDirectoryMissing(
            source_dir.display().to_string(),
        ));
    } else {
        match tokio::fs::read_dir(source_dir).await {
            Ok(_) => info!("Source directory is accessible: {:?}", source_dir),
            Err(e) => {
                error!("Source directory is not accessible: {}", e);
                errors.push(StartupCheckError::SourceDirectoryUnreadable(
                    source_dir.display().to_string(),
                ));
            }
        }

        if !source_dir.join(&gallery.rubbish_directory).exists() {
            warn!(
                "Rubbish directory '{}' not found, nothing will be treated as deleted",
                gallery.rubbish_directory
            );
        }
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
