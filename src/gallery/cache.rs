use super::{ArtifactKind, MediaNode, ZoomLevel};
use crate::GalleryConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

/// Existence check for cached artifacts.
pub trait FileProbe: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
}

pub type DynFileProbe = Arc<dyn FileProbe>;

/// Checks the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl FileProbe for FsProbe {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// A missing artifact to fetch once the list has been published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillRequest {
    pub node: MediaNode,
    pub kind: ArtifactKind,
    pub destination: PathBuf,
}

/// Where thumbnails and previews live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    pub thumbnail_dir: PathBuf,
    pub preview_dir: PathBuf,
}

impl CacheLayout {
    pub fn new(thumbnail_dir: impl Into<PathBuf>, preview_dir: impl Into<PathBuf>) -> Self {
        Self {
            thumbnail_dir: thumbnail_dir.into(),
            preview_dir: preview_dir.into(),
        }
    }

    pub fn from_config(config: &GalleryConfig) -> Self {
        Self::new(config.thumbnail_directory(), config.preview_directory())
    }

    pub fn directory(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Thumbnail => &self.thumbnail_dir,
            ArtifactKind::Preview => &self.preview_dir,
        }
    }

    /// Deterministic cache path of an artifact, keyed by the node handle.
    pub fn artifact_path(&self, node: &MediaNode, kind: ArtifactKind) -> PathBuf {
        self.directory(kind)
            .join(format!("{}.jpg", node.handle.to_base64()))
    }

    /// Returns the cached artifact for `node`, or queues it for backfill when
    /// the server advertises one.
    ///
    /// Requests are only recorded here; fetching starts after the build pass
    /// so the list is never patched while it is being assembled.
    pub fn probe(
        &self,
        node: &MediaNode,
        zoom: ZoomLevel,
        files: &dyn FileProbe,
        queue: &mut Vec<BackfillRequest>,
    ) -> Option<PathBuf> {
        let kind = zoom.artifact_kind();
        let path = self.artifact_path(node, kind);

        if files.exists(&path) {
            return Some(path);
        }

        if kind.advertised_by(node) {
            trace!("Queueing {:?} backfill for {}", kind, node.handle);
            queue.push(BackfillRequest {
                node: node.clone(),
                kind,
                destination: path,
            });
        }

        None
    }
}
