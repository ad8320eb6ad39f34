// Gallery module - Main entry point
mod backfill;
mod bucket;
mod builder;
mod cache;
mod cards;
mod core;
mod display_list;
mod error;
mod refresh;
mod selection;
mod types;

// Re-export public items
pub use backfill::{BackfillDispatcher, BackfillSummary, DynPreviewFetcher, PreviewFetcher};
pub use bucket::{BucketKey, DateBucketer, DateContext, Header, grouping_label, header_title};
pub use builder::{BuildOutput, GalleryListBuilder, filter_media, is_media_name};
pub use cache::{BackfillRequest, CacheLayout, DynFileProbe, FileProbe, FsProbe};
pub use cards::{CardView, build_cards};
pub use display_list::DisplayList;
pub use error::{FetchError, GalleryError};
pub use refresh::{DynItemSink, ItemSink, RefreshThrottle, WatchSink};
pub use selection::SelectionSnapshot;
pub use types::*;

use crate::source::DynNodeSource;
use std::sync::{Arc, atomic::AtomicU64};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

pub type SharedGallery = Arc<Gallery>;

/// A media timeline over one node source: builds the display list, keeps it
/// live while missing previews arrive, and carries selection across reloads.
pub struct Gallery {
    pub(crate) config: crate::GalleryConfig,
    pub(crate) source: DynNodeSource,
    pub(crate) fetcher: DynPreviewFetcher,
    pub(crate) files: DynFileProbe,
    pub(crate) layout: CacheLayout,
    pub(crate) dates: DateContext,
    pub(crate) items: Arc<RwLock<DisplayList>>,
    pub(crate) selection: RwLock<SelectionSnapshot>,
    pub(crate) generation: Arc<AtomicU64>,
    pub(crate) sink: DynItemSink,
    pub(crate) refresh: RefreshThrottle,
    pub(crate) backfill_task: Mutex<Option<JoinHandle<BackfillSummary>>>,
}

impl Gallery {
    pub fn new(
        config: crate::GalleryConfig,
        source: DynNodeSource,
        fetcher: DynPreviewFetcher,
        sink: DynItemSink,
    ) -> Self {
        let items = Arc::new(RwLock::new(DisplayList::new()));
        let refresh = RefreshThrottle::new(config.refresh_throttle(), items.clone(), sink.clone());
        let layout = CacheLayout::from_config(&config);

        Self {
            config,
            source,
            fetcher,
            files: Arc::new(FsProbe),
            layout,
            dates: DateContext::local(),
            items,
            selection: RwLock::new(SelectionSnapshot::new()),
            generation: Arc::new(AtomicU64::new(0)),
            sink,
            refresh,
            backfill_task: Mutex::new(None),
        }
    }

    pub fn with_probe(mut self, files: DynFileProbe) -> Self {
        self.files = files;
        self
    }

    pub fn with_dates(mut self, dates: DateContext) -> Self {
        self.dates = dates;
        self
    }

    pub fn config(&self) -> &crate::GalleryConfig {
        &self.config
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }
}
