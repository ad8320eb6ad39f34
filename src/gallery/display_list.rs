use super::{GalleryItem, ItemKey, NodeHandle};
use std::collections::HashMap;
use std::path::PathBuf;

/// Insertion-ordered rows of the gallery.
///
/// Re-inserting an existing key replaces the row in place and keeps its
/// position. Patches go through the key index, never through iteration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    rows: Vec<(ItemKey, GalleryItem)>,
    index: HashMap<ItemKey, usize>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ItemKey, item: GalleryItem) {
        match self.index.get(&key) {
            Some(&position) => self.rows[position].1 = item,
            None => {
                self.index.insert(key, self.rows.len());
                self.rows.push((key, item));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &ItemKey) -> Option<&GalleryItem> {
        self.index.get(key).map(|&position| &self.rows[position].1)
    }

    pub fn get_node(&self, handle: NodeHandle) -> Option<&GalleryItem> {
        self.get(&ItemKey::Node(handle))
    }

    pub fn get_node_mut(&mut self, handle: NodeHandle) -> Option<&mut GalleryItem> {
        let position = *self.index.get(&ItemKey::Node(handle))?;
        Some(&mut self.rows[position].1)
    }

    pub fn contains_node(&self, handle: NodeHandle) -> bool {
        self.index.contains_key(&ItemKey::Node(handle))
    }

    /// Sets the thumbnail of a node's row and marks it dirty.
    /// Returns `false` when the node is not in the list.
    pub fn patch_thumbnail(&mut self, handle: NodeHandle, thumbnail: PathBuf) -> bool {
        match self.get_node_mut(handle) {
            Some(item) => {
                item.thumbnail = Some(thumbnail);
                item.ui_dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &ItemKey> {
        self.rows.iter().map(|(key, _)| key)
    }

    pub fn items(&self) -> impl Iterator<Item = &GalleryItem> {
        self.rows.iter().map(|(_, item)| item)
    }

    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut GalleryItem> {
        self.rows.iter_mut().map(|(_, item)| item)
    }

    pub fn header_count(&self) -> usize {
        self.items().filter(|item| item.is_header()).count()
    }

    /// Fills `index` with the row position and `index_for_viewer` with the
    /// position among media rows.
    pub fn assign_positions(&mut self) {
        let mut viewer_position = 0;
        for (position, (_, item)) in self.rows.iter_mut().enumerate() {
            item.index = Some(position);
            if item.is_header() {
                item.index_for_viewer = None;
            } else {
                item.index_for_viewer = Some(viewer_position);
                viewer_position += 1;
            }
        }
    }

    /// Copy of the rows for observers.
    pub fn snapshot(&self) -> Vec<GalleryItem> {
        self.items().cloned().collect()
    }
}
