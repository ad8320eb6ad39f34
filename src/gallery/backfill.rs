use super::cache::BackfillRequest;
use super::display_list::DisplayList;
use super::refresh::RefreshThrottle;
use super::{ArtifactKind, FetchError, MediaNode};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, trace};

/// Service that materialises a thumbnail or preview at a local path.
#[async_trait]
pub trait PreviewFetcher: Send + Sync {
    /// Resolves once the artifact has been written to `destination`, or the
    /// fetch failed.
    async fn fetch(
        &self,
        node: &MediaNode,
        kind: ArtifactKind,
        destination: &Path,
    ) -> Result<(), FetchError>;

    fn name(&self) -> &str;
}

pub type DynPreviewFetcher = Arc<dyn PreviewFetcher>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillSummary {
    /// Fetched and patched into the list.
    pub applied: usize,
    /// Fetched, but the node was gone from the list by then.
    pub stale: usize,
    pub failed: usize,
    /// Never started because a newer build replaced the list.
    pub cancelled: usize,
}

/// Fetches queued artifacts one at a time and patches them into the live
/// list by node handle.
pub struct BackfillDispatcher {
    fetcher: Arc<dyn PreviewFetcher>,
    items: Arc<RwLock<DisplayList>>,
    refresh: RefreshThrottle,
    throttle: Duration,
    generation: Arc<AtomicU64>,
    own_generation: u64,
}

impl BackfillDispatcher {
    pub fn new(
        fetcher: DynPreviewFetcher,
        items: Arc<RwLock<DisplayList>>,
        refresh: RefreshThrottle,
        throttle: Duration,
        generation: Arc<AtomicU64>,
        own_generation: u64,
    ) -> Self {
        Self {
            fetcher,
            items,
            refresh,
            throttle,
            generation,
            own_generation,
        }
    }

    fn superseded(&self) -> bool {
        self.generation.load(Ordering::Acquire) != self.own_generation
    }

    pub async fn run(self, queue: Vec<BackfillRequest>) -> BackfillSummary {
        let mut summary = BackfillSummary::default();
        let total = queue.len();

        debug!(
            "Backfilling {} artifacts through {}",
            total,
            self.fetcher.name()
        );

        for (position, request) in queue.into_iter().enumerate() {
            if self.superseded() {
                summary.cancelled = total - position;
                debug!(
                    "Build generation {} superseded, dropping {} queued fetches",
                    self.own_generation, summary.cancelled
                );
                break;
            }

            if position > 0 {
                tokio::time::sleep(self.throttle).await;
                if self.superseded() {
                    summary.cancelled = total - position;
                    break;
                }
            }

            trace!("Fetching {:?} for {}", request.kind, request.node.handle);

            let result = self
                .fetcher
                .fetch(&request.node, request.kind, &request.destination)
                .await;

            match result {
                Ok(()) => {
                    let patched = self
                        .items
                        .write()
                        .await
                        .patch_thumbnail(request.node.handle, request.destination);
                    if patched {
                        summary.applied += 1;
                        self.refresh.request();
                    } else {
                        summary.stale += 1;
                    }
                }
                Err(e) => {
                    debug!(
                        "Skipping {:?} for {}: {}",
                        request.kind, request.node.handle, e
                    );
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Backfill finished: {} applied, {} stale, {} failed, {} cancelled",
            summary.applied, summary.stale, summary.failed, summary.cancelled
        );
        summary
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::gallery::refresh::tests::RecordingSink;
    use crate::gallery::{GalleryItem, ItemKey, ItemKind, NodeHandle};
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    /// Fetcher that records call order and checks that calls never overlap.
    #[derive(Default)]
    pub(crate) struct ScriptedFetcher {
        pub(crate) failing: HashSet<NodeHandle>,
        pub(crate) delay: Duration,
        pub(crate) calls: Mutex<Vec<NodeHandle>>,
        in_flight: AtomicUsize,
        pub(crate) max_in_flight: AtomicUsize,
    }

    impl ScriptedFetcher {
        pub(crate) fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Default::default()
            }
        }

        pub(crate) fn calls(&self) -> Vec<NodeHandle> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PreviewFetcher for ScriptedFetcher {
        async fn fetch(
            &self,
            node: &MediaNode,
            _kind: ArtifactKind,
            _destination: &Path,
        ) -> Result<(), FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(node.handle);

            tokio::time::sleep(self.delay).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.failing.contains(&node.handle) {
                Err(FetchError::Remote(-9))
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn node(handle: u64) -> MediaNode {
        MediaNode {
            handle: NodeHandle(handle),
            parent: None,
            name: format!("{}.jpg", handle),
            modification_time: 0,
            is_folder: false,
            has_thumbnail: true,
            has_preview: true,
            duration: None,
        }
    }

    fn request(handle: u64) -> BackfillRequest {
        BackfillRequest {
            node: node(handle),
            kind: ArtifactKind::Preview,
            destination: PathBuf::from(format!("/previews/{}.jpg", handle)),
        }
    }

    fn list_of(handles: &[u64]) -> DisplayList {
        let mut list = DisplayList::new();
        for &handle in handles {
            list.insert(
                ItemKey::Node(NodeHandle(handle)),
                GalleryItem {
                    kind: ItemKind::Image,
                    node: Some(NodeHandle(handle)),
                    name: None,
                    index: None,
                    index_for_viewer: None,
                    thumbnail: None,
                    modify_date: String::new(),
                    header_title: None,
                    selected: false,
                    ui_dirty: false,
                },
            );
        }
        list
    }

    struct Harness {
        items: Arc<RwLock<DisplayList>>,
        sink: Arc<RecordingSink>,
        generation: Arc<AtomicU64>,
        refresh: RefreshThrottle,
    }

    fn harness(handles: &[u64]) -> Harness {
        let items = Arc::new(RwLock::new(list_of(handles)));
        let sink = Arc::new(RecordingSink::default());
        let refresh = RefreshThrottle::new(Duration::from_millis(50), items.clone(), sink.clone());
        Harness {
            items,
            sink,
            generation: Arc::new(AtomicU64::new(1)),
            refresh,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_are_sequential_and_in_order() {
        let h = harness(&[1, 2, 3]);
        let fetcher = Arc::new(ScriptedFetcher::with_delay(Duration::from_millis(30)));
        let dispatcher = BackfillDispatcher::new(
            fetcher.clone(),
            h.items.clone(),
            h.refresh.clone(),
            Duration::from_millis(10),
            h.generation.clone(),
            1,
        );

        let summary = dispatcher
            .run(vec![request(3), request(1), request(2)])
            .await;

        assert_eq!(summary.applied, 3);
        assert_eq!(
            fetcher.calls(),
            vec![NodeHandle(3), NodeHandle(1), NodeHandle(2)]
        );
        assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 1);

        let items = h.items.read().await;
        assert_eq!(
            items.get_node(NodeHandle(1)).unwrap().thumbnail,
            Some(PathBuf::from("/previews/1.jpg"))
        );
        assert!(items.get_node(NodeHandle(1)).unwrap().ui_dirty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_skipped_without_retry() {
        let h = harness(&[1, 2]);
        let mut fetcher = ScriptedFetcher::default();
        fetcher.failing.insert(NodeHandle(1));
        let fetcher = Arc::new(fetcher);

        let summary = BackfillDispatcher::new(
            fetcher.clone(),
            h.items.clone(),
            h.refresh.clone(),
            Duration::from_millis(10),
            h.generation.clone(),
            1,
        )
        .run(vec![request(1), request(2)])
        .await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.applied, 1);
        assert_eq!(fetcher.calls(), vec![NodeHandle(1), NodeHandle(2)]);

        let items = h.items.read().await;
        assert!(items.get_node(NodeHandle(1)).unwrap().thumbnail.is_none());
        assert!(!items.get_node(NodeHandle(1)).unwrap().ui_dirty);
        assert!(items.get_node(NodeHandle(2)).unwrap().thumbnail.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_patch_for_missing_node_is_noop() {
        let h = harness(&[1]);
        let fetcher = Arc::new(ScriptedFetcher::default());

        let summary = BackfillDispatcher::new(
            fetcher,
            h.items.clone(),
            h.refresh.clone(),
            Duration::from_millis(10),
            h.generation.clone(),
            1,
        )
        .run(vec![request(5)])
        .await;

        assert_eq!(summary.stale, 1);
        assert_eq!(summary.applied, 0);
        assert_eq!(h.sink.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_patches_publishes_once() {
        let h = harness(&[1, 2, 3, 4]);
        let fetcher = Arc::new(ScriptedFetcher::default());

        BackfillDispatcher::new(
            fetcher,
            h.items.clone(),
            h.refresh.clone(),
            Duration::from_millis(1),
            h.generation.clone(),
            1,
        )
        .run(vec![request(1), request(2), request(3), request(4)])
        .await;

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(h.sink.count(), 1);
        let published = h.sink.last().unwrap();
        assert!(published.iter().all(|item| item.thumbnail.is_some()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_generation_stops_dispatch() {
        let h = harness(&[1, 2, 3]);
        let fetcher = Arc::new(ScriptedFetcher::with_delay(Duration::from_millis(30)));
        let dispatcher = BackfillDispatcher::new(
            fetcher.clone(),
            h.items.clone(),
            h.refresh.clone(),
            Duration::from_millis(10),
            h.generation.clone(),
            1,
        );
        let task = tokio::spawn(dispatcher.run(vec![request(1), request(2), request(3)]));

        // First fetch is in flight; a rebuild bumps the generation.
        tokio::time::sleep(Duration::from_millis(5)).await;
        h.generation.fetch_add(1, Ordering::AcqRel);

        let summary = task.await.unwrap();

        assert_eq!(fetcher.calls(), vec![NodeHandle(1)]);
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.cancelled, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatcher_from_outdated_build_never_fetches() {
        let h = harness(&[1, 2]);
        let fetcher = Arc::new(ScriptedFetcher::default());
        // A newer build claimed generation 2 before this dispatcher started.
        h.generation.store(2, Ordering::Release);

        let summary = BackfillDispatcher::new(
            fetcher.clone(),
            h.items.clone(),
            h.refresh.clone(),
            Duration::from_millis(10),
            h.generation.clone(),
            1,
        )
        .run(vec![request(1), request(2)])
        .await;

        assert!(fetcher.calls().is_empty());
        assert_eq!(summary.cancelled, 2);
        assert_eq!(summary.applied, 0);
    }
}
