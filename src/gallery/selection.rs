use super::{GalleryItem, NodeHandle};
use std::collections::HashMap;

/// Rows the user had selected before a rebuild, keyed by node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSnapshot {
    selected: HashMap<NodeHandle, GalleryItem>,
}

impl SelectionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only selected media rows; anything else is dropped.
    pub fn capture<'a>(items: impl IntoIterator<Item = &'a GalleryItem>) -> Self {
        let selected = items
            .into_iter()
            .filter(|item| item.selected)
            .filter_map(|item| item.node.map(|handle| (handle, item.clone())))
            .collect();
        Self { selected }
    }

    pub fn is_selected(&self, handle: NodeHandle) -> bool {
        self.selected
            .get(&handle)
            .is_some_and(|item| item.selected)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.selected.keys().copied()
    }
}
