use crate::gallery::{ArtifactKind, FetchError, MediaNode, PreviewFetcher};
use crate::source::LocalFolderSource;
use crate::{GalleryConfig, ImageSizeConfig};
use async_trait::async_trait;
use image::{ImageEncoder, codecs::jpeg::JpegEncoder, imageops::FilterType};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Renders thumbnails and previews from the files of a local source.
pub struct LocalPreviewFetcher {
    source: Arc<LocalFolderSource>,
    thumbnail: ImageSizeConfig,
    preview: ImageSizeConfig,
    jpeg_quality: u8,
}

impl LocalPreviewFetcher {
    pub fn new(source: Arc<LocalFolderSource>, config: &GalleryConfig) -> Self {
        Self {
            source,
            thumbnail: config.thumbnail.clone(),
            preview: config.preview.clone(),
            jpeg_quality: config.jpeg_quality.unwrap_or(85),
        }
    }

    fn bounds(&self, kind: ArtifactKind) -> (u32, u32) {
        let size = match kind {
            ArtifactKind::Thumbnail => &self.thumbnail,
            ArtifactKind::Preview => &self.preview,
        };
        (size.width, size.height)
    }
}

#[async_trait]
impl PreviewFetcher for LocalPreviewFetcher {
    async fn fetch(
        &self,
        node: &MediaNode,
        kind: ArtifactKind,
        destination: &Path,
    ) -> Result<(), FetchError> {
        if !kind.advertised_by(node) {
            return Err(FetchError::Unsupported(node.name.clone()));
        }

        let original = self
            .source
            .path_of(node.handle)
            .ok_or(FetchError::NotFound)?
            .to_path_buf();

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let (width, height) = self.bounds(kind);
        let quality = self.jpeg_quality;
        let destination = destination.to_path_buf();

        tokio::task::spawn_blocking(move || {
            render_jpeg(&original, &destination, width, height, quality)
        })
        .await
        .map_err(|e| FetchError::IoError(std::io::Error::other(e)))?
    }

    fn name(&self) -> &str {
        "local preview renderer"
    }
}

/// Fits the image into `width` x `height` and writes it as JPEG.
fn render_jpeg(
    original: &Path,
    destination: &Path,
    width: u32,
    height: u32,
    quality: u8,
) -> Result<(), FetchError> {
    let image = image::open(original)?;
    let resized = image.resize(width, height, FilterType::Lanczos3);
    // JPEG has no alpha channel
    let rgb = resized.to_rgb8();

    let output = std::fs::File::create(destination)?;
    let encoder = JpegEncoder::new_with_quality(output, quality);
    encoder.write_image(
        &rgb,
        rgb.width(),
        rgb.height(),
        image::ExtendedColorType::Rgb8,
    )?;

    debug!(
        "Rendered {:?} -> {:?} ({}x{})",
        original,
        destination,
        rgb.width(),
        rgb.height()
    );
    Ok(())
}
