use super::GalleryItem;
use super::display_list::DisplayList;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tracing::trace;

/// Receives full replacements of the gallery rows.
pub trait ItemSink: Send + Sync {
    fn publish(&self, items: Vec<GalleryItem>);
}

pub type DynItemSink = Arc<dyn ItemSink>;

/// Publishes into a `watch` channel; UI code holds the receiver.
pub struct WatchSink {
    tx: watch::Sender<Arc<Vec<GalleryItem>>>,
}

impl WatchSink {
    pub fn channel() -> (Self, watch::Receiver<Arc<Vec<GalleryItem>>>) {
        let (tx, rx) = watch::channel(Arc::new(Vec::new()));
        (Self { tx }, rx)
    }
}

impl ItemSink for WatchSink {
    fn publish(&self, items: Vec<GalleryItem>) {
        self.tx.send_replace(Arc::new(items));
    }
}

/// Coalesces refresh requests: the first request in a quiet period arms a
/// timer, later ones are dropped until it fires and publishes once.
#[derive(Clone)]
pub struct RefreshThrottle {
    inner: Arc<Inner>,
}

struct Inner {
    waiting: AtomicBool,
    window: Duration,
    items: Arc<RwLock<DisplayList>>,
    sink: DynItemSink,
}

impl RefreshThrottle {
    pub fn new(window: Duration, items: Arc<RwLock<DisplayList>>, sink: DynItemSink) -> Self {
        Self {
            inner: Arc::new(Inner {
                waiting: AtomicBool::new(false),
                window,
                items,
                sink,
            }),
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn request(&self) {
        if self.inner.waiting.swap(true, Ordering::AcqRel) {
            return;
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.window).await;
            inner.waiting.store(false, Ordering::Release);

            let snapshot = inner.items.read().await.snapshot();
            trace!("Publishing {} rows after refresh window", snapshot.len());
            inner.sink.publish(snapshot);
        });
    }

    pub fn is_pending(&self) -> bool {
        self.inner.waiting.load(Ordering::Acquire)
    }
}
