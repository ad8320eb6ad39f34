use super::{
    BackfillDispatcher, BackfillSummary, BuildOutput, BuildReport, CardView, Gallery, GalleryCard,
    GalleryError, GalleryItem, GalleryListBuilder, NodeHandle, NodeQuery, SelectionSnapshot,
    ZoomLevel, build_cards, filter_media,
};
use std::sync::atomic::Ordering;
use tracing::{debug, error, info};

impl Gallery {
    /// Rebuilds the display list for `query` and publishes it once.
    ///
    /// Node listing and cache probing run on a blocking worker. Missing
    /// artifacts are fetched afterwards by a background dispatcher; any
    /// dispatcher left over from a previous load stops issuing fetches.
    pub async fn load(
        &self,
        query: &NodeQuery,
        zoom: ZoomLevel,
    ) -> Result<BuildReport, GalleryError> {
        let selection = {
            let items = self.items.read().await;
            SelectionSnapshot::capture(items.items())
        };
        *self.selection.write().await = selection.clone();

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(
            "Load generation {} from {} at {:?} zoom, {} selected carried over",
            generation,
            self.source.name(),
            zoom,
            selection.len()
        );

        let source = self.source.clone();
        let files = self.files.clone();
        let layout = self.layout.clone();
        let dates = self.dates;
        let order = self.config.sort_order;
        let query = query.clone();

        let output = tokio::task::spawn_blocking(move || -> Result<BuildOutput, GalleryError> {
            let nodes = source.nodes(&query, order)?;
            let nodes = filter_media(source.as_ref(), nodes);
            let builder = GalleryListBuilder::new(&layout, files.as_ref(), dates);
            Ok(builder.build(&nodes, zoom, &selection))
        })
        .await??;

        let BuildOutput {
            mut items,
            backfill,
        } = output;
        items.assign_positions();

        let mut report = BuildReport {
            generation,
            items: items.len(),
            headers: items.header_count(),
            queued_backfill: backfill.len(),
            superseded: false,
        };

        // Task slot, then list. Publishes and dispatcher handles follow
        // generation order.
        let mut task = self.backfill_task.lock().await;
        let mut live = self.items.write().await;
        if self.generation.load(Ordering::Acquire) != generation {
            debug!(
                "Load generation {} superseded before publish, dropping its list",
                generation
            );
            report.superseded = true;
            report.queued_backfill = 0;
            return Ok(report);
        }

        let published = items.snapshot();
        *live = items;
        drop(live);
        self.sink.publish(published);

        info!(
            "Published {} rows ({} headers), {} artifacts to backfill",
            report.items, report.headers, report.queued_backfill
        );

        *task = if backfill.is_empty() {
            None
        } else {
            let dispatcher = BackfillDispatcher::new(
                self.fetcher.clone(),
                self.items.clone(),
                self.refresh.clone(),
                self.config.fetch_throttle(),
                self.generation.clone(),
                generation,
            );
            Some(tokio::spawn(dispatcher.run(backfill)))
        };

        Ok(report)
    }

    /// Waits for the dispatcher started by the latest load, if any.
    pub async fn wait_for_backfill(&self) -> Option<BackfillSummary> {
        let handle = self.backfill_task.lock().await.take()?;
        match handle.await {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!("Backfill task failed: {}", e);
                None
            }
        }
    }

    pub async fn items(&self) -> Vec<GalleryItem> {
        self.items.read().await.snapshot()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Selection captured at the start of the latest load.
    pub async fn selection_snapshot(&self) -> SelectionSnapshot {
        self.selection.read().await.clone()
    }

    /// Returns `false` when the node is not in the current list.
    pub async fn set_selected(&self, handle: NodeHandle, selected: bool) -> bool {
        let changed = {
            let mut items = self.items.write().await;
            match items.get_node_mut(handle) {
                Some(item) => {
                    item.selected = selected;
                    item.ui_dirty = true;
                    true
                }
                None => false,
            }
        };

        if changed {
            self.refresh.request();
        }
        changed
    }

    pub async fn clear_selection(&self) {
        let cleared = {
            let mut items = self.items.write().await;
            let mut cleared = 0;
            for item in items.items_mut().filter(|item| item.selected) {
                item.selected = false;
                item.ui_dirty = true;
                cleared += 1;
            }
            cleared
        };

        if cleared > 0 {
            debug!("Cleared {} selected rows", cleared);
            self.refresh.request();
        }
    }

    pub async fn selected_nodes(&self) -> Vec<NodeHandle> {
        self.items
            .read()
            .await
            .items()
            .filter(|item| item.selected)
            .filter_map(|item| item.node)
            .collect()
    }

    /// Day, month or year cards for the media under `query`.
    pub async fn cards(
        &self,
        query: &NodeQuery,
        view: CardView,
    ) -> Result<Vec<GalleryCard>, GalleryError> {
        let source = self.source.clone();
        let order = self.config.sort_order;
        let dates = self.dates;
        let query = query.clone();

        let cards = tokio::task::spawn_blocking(move || -> Result<Vec<GalleryCard>, GalleryError> {
            let nodes = filter_media(source.as_ref(), source.nodes(&query, order)?);
            Ok(build_cards(&nodes, view, dates))
        })
        .await??;

        debug!("Built {} {:?} cards", cards.len(), view);
        Ok(cards)
    }
}
