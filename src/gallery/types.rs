use base64::{Engine, engine::general_purpose};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::bucket::BucketKey;

/// Stable identifier of a node in the node source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle(pub u64);

impl NodeHandle {
    /// URL-safe base64 form, used as the stem of cached artifact files.
    pub fn to_base64(self) -> String {
        general_purpose::URL_SAFE_NO_PAD.encode(self.0.to_le_bytes())
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaNode {
    pub handle: NodeHandle,
    pub parent: Option<NodeHandle>,
    pub name: String,
    /// Seconds since the unix epoch.
    pub modification_time: i64,
    pub is_folder: bool,
    pub has_thumbnail: bool,
    pub has_preview: bool,
    /// `None` for still images; videos carry their length in seconds.
    pub duration: Option<u32>,
}

impl MediaNode {
    pub fn is_video(&self) -> bool {
        self.duration.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomLevel {
    Year,
    #[default]
    Month,
    Day,
}

impl ZoomLevel {
    /// Day zoom shows large tiles and needs full previews.
    pub fn artifact_kind(self) -> ArtifactKind {
        match self {
            ZoomLevel::Day => ArtifactKind::Preview,
            ZoomLevel::Month | ZoomLevel::Year => ArtifactKind::Thumbnail,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Thumbnail,
    Preview,
}

impl ArtifactKind {
    /// Whether the node advertises this artifact on the server side.
    pub fn advertised_by(self, node: &MediaNode) -> bool {
        match self {
            ArtifactKind::Thumbnail => node.has_thumbnail,
            ArtifactKind::Preview => node.has_preview,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    ModificationAsc,
    #[default]
    ModificationDesc,
}

/// Which nodes a gallery load covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeQuery {
    /// Direct children of a folder.
    Folder(NodeHandle),
    /// Every descendant of a folder.
    Tree(NodeHandle),
    /// An explicit set of nodes.
    Handles(Vec<NodeHandle>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Header,
    Image,
    Video,
}

/// Key of a row in the display list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ItemKey {
    Node(NodeHandle),
    Header { bucket: BucketKey, position: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryItem {
    pub kind: ItemKind,
    pub node: Option<NodeHandle>,
    pub name: Option<String>,
    pub index: Option<usize>,
    pub index_for_viewer: Option<usize>,
    pub thumbnail: Option<PathBuf>,
    /// Month and year the item belongs to, e.g. "January 2024".
    pub modify_date: String,
    pub header_title: Option<String>,
    pub selected: bool,
    pub ui_dirty: bool,
}

impl GalleryItem {
    pub fn header(modify_date: String, title: String) -> Self {
        Self {
            kind: ItemKind::Header,
            node: None,
            name: None,
            index: None,
            index_for_viewer: None,
            thumbnail: None,
            modify_date,
            header_title: Some(title),
            selected: false,
            ui_dirty: true,
        }
    }

    pub fn is_header(&self) -> bool {
        self.kind == ItemKind::Header
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GalleryCard {
    pub bucket: BucketKey,
    pub title: String,
    pub cover: NodeHandle,
    pub cover_name: String,
    pub count: usize,
}

/// Outcome of one `Gallery::load` pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BuildReport {
    pub generation: u64,
    pub items: usize,
    pub headers: usize,
    pub queued_backfill: usize,
    /// A newer load finished first; this build was dropped unpublished.
    pub superseded: bool,
}
