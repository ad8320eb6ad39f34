use super::{NodeSource, sort_nodes};
use crate::GalleryConfig;
use crate::gallery::{GalleryError, MediaNode, NodeHandle, NodeQuery, SortOrder};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

struct LocalEntry {
    node: MediaNode,
    path: PathBuf,
    relative: String,
}

/// Node source backed by a directory tree on disk.
///
/// The tree is indexed once at construction. Handles are derived from the
/// path relative to the root, so they survive rescans.
pub struct LocalFolderSource {
    root: PathBuf,
    rubbish_directory: String,
    entries: HashMap<NodeHandle, LocalEntry>,
}

impl LocalFolderSource {
    pub fn scan(
        root: impl Into<PathBuf>,
        rubbish_directory: impl Into<String>,
    ) -> Result<Self, GalleryError> {
        let root = root.into();
        let rubbish_directory = rubbish_directory.into();

        if !root.is_dir() {
            return Err(GalleryError::InvalidPath);
        }

        let mut entries = HashMap::new();
        let walker = WalkDir::new(&root)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {:?}: {}", root, e);
                    continue;
                }
            };

            let relative = match entry.path().strip_prefix(&root) {
                Ok(relative) => relative_string(relative),
                Err(_) => continue,
            };
            let parent_relative = relative
                .rsplit_once('/')
                .map(|(parent, _)| parent)
                .unwrap_or("");

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Skipping {:?}, metadata unavailable: {}", entry.path(), e);
                    continue;
                }
            };
            let modification_time = metadata
                .modified()
                .map(|time| DateTime::<Utc>::from(time).timestamp())
                .unwrap_or(0);

            let name = entry.file_name().to_string_lossy().to_string();
            let is_folder = entry.file_type().is_dir();
            let (has_artifacts, duration) = if is_folder {
                (false, None)
            } else {
                classify(entry.path(), &name)
            };

            let handle = Self::handle_for(&relative);
            entries.insert(
                handle,
                LocalEntry {
                    node: MediaNode {
                        handle,
                        parent: Some(Self::handle_for(parent_relative)),
                        name,
                        modification_time,
                        is_folder,
                        has_thumbnail: has_artifacts,
                        has_preview: has_artifacts,
                        duration,
                    },
                    path: entry.path().to_path_buf(),
                    relative,
                },
            );
        }

        info!("Indexed {} entries under {:?}", entries.len(), root);

        Ok(Self {
            root,
            rubbish_directory,
            entries,
        })
    }

    pub fn from_config(config: &GalleryConfig) -> Result<Self, GalleryError> {
        Self::scan(&config.source_directory, &config.rubbish_directory)
    }

    /// Stable handle of a root-relative path; the root itself is `""`.
    pub fn handle_for(relative: &str) -> NodeHandle {
        let mut hasher = Sha256::new();
        hasher.update(relative.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        NodeHandle(u64::from_be_bytes(bytes))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn root_handle(&self) -> NodeHandle {
        Self::handle_for("")
    }

    pub fn path_of(&self, handle: NodeHandle) -> Option<&Path> {
        self.entries.get(&handle).map(|entry| entry.path.as_path())
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&MediaNode> {
        self.entries.get(&handle).map(|entry| &entry.node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn folder_prefix(&self, folder: NodeHandle) -> Result<Option<String>, GalleryError> {
        if folder == self.root_handle() {
            return Ok(None);
        }
        match self.entries.get(&folder) {
            Some(entry) if entry.node.is_folder => Ok(Some(format!("{}/", entry.relative))),
            Some(_) => Err(GalleryError::InvalidPath),
            None => Err(GalleryError::NotFound),
        }
    }
}

impl NodeSource for LocalFolderSource {
    fn nodes(&self, query: &NodeQuery, order: SortOrder) -> Result<Vec<MediaNode>, GalleryError> {
        let mut nodes: Vec<MediaNode> = match query {
            NodeQuery::Folder(folder) => {
                self.folder_prefix(*folder)?;
                self.entries
                    .values()
                    .filter(|entry| entry.node.parent == Some(*folder))
                    .map(|entry| entry.node.clone())
                    .collect()
            }
            NodeQuery::Tree(folder) => {
                let prefix = self.folder_prefix(*folder)?;
                self.entries
                    .values()
                    .filter(|entry| match &prefix {
                        Some(prefix) => entry.relative.starts_with(prefix.as_str()),
                        None => true,
                    })
                    .map(|entry| entry.node.clone())
                    .collect()
            }
            NodeQuery::Handles(handles) => handles
                .iter()
                .filter_map(|handle| {
                    let node = self.node(*handle).cloned();
                    if node.is_none() {
                        debug!("Unknown handle {} in query", handle);
                    }
                    node
                })
                .collect(),
        };

        sort_nodes(&mut nodes, order);
        Ok(nodes)
    }

    fn is_in_rubbish(&self, node: &MediaNode) -> bool {
        let Some(entry) = self.entries.get(&node.handle) else {
            return false;
        };
        let rubbish = self.rubbish_directory.as_str();
        entry.relative == rubbish
            || entry
                .relative
                .strip_prefix(rubbish)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    fn name(&self) -> &str {
        "local folder"
    }
}

fn relative_string(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Images the `image` crate can decode get thumbnails and previews. Videos
/// get a duration but no artifacts, since nothing here decodes video.
fn classify(path: &Path, name: &str) -> (bool, Option<u32>) {
    match mime_guess::from_path(name).first() {
        Some(mime) if mime.type_().as_str() == "video" => (false, Some(0)),
        Some(mime) if mime.type_().as_str() == "image" => {
            (image::ImageFormat::from_path(path).is_ok(), None)
        }
        _ => (false, None),
    }
}
