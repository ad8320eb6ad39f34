pub mod local;

pub use local::LocalFolderSource;

use crate::gallery::{GalleryError, MediaNode, NodeQuery, SortOrder};
use std::sync::Arc;

/// Supplier of media nodes for a gallery.
pub trait NodeSource: Send + Sync {
    /// Nodes matching `query`, ordered by modification time per `order`.
    fn nodes(&self, query: &NodeQuery, order: SortOrder) -> Result<Vec<MediaNode>, GalleryError>;

    fn is_in_rubbish(&self, node: &MediaNode) -> bool;

    fn name(&self) -> &str;
}

pub type DynNodeSource = Arc<dyn NodeSource>;

/// Sorts by modification time, falling back to name for equal times.
pub fn sort_nodes(nodes: &mut [MediaNode], order: SortOrder) {
    nodes.sort_by(|a, b| {
        let ordering = a
            .modification_time
            .cmp(&b.modification_time)
            .then_with(|| a.name.cmp(&b.name));
        match order {
            SortOrder::ModificationAsc => ordering,
            SortOrder::ModificationDesc => ordering.reverse(),
        }
    });
}
