use super::bucket::{DateBucketer, DateContext, grouping_label};
use super::cache::{BackfillRequest, CacheLayout, FileProbe};
use super::display_list::DisplayList;
use super::selection::SelectionSnapshot;
use super::{GalleryItem, ItemKey, ItemKind, MediaNode, ZoomLevel};
use crate::source::NodeSource;
use tracing::{debug, trace};

/// Result of one build pass: the rows to publish and the artifacts still
/// missing from the local cache, in the order they were found.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub items: DisplayList,
    pub backfill: Vec<BackfillRequest>,
}

/// Turns an ordered run of media nodes into display rows with date headers.
pub struct GalleryListBuilder<'a> {
    layout: &'a CacheLayout,
    files: &'a dyn FileProbe,
    dates: DateContext,
}

impl<'a> GalleryListBuilder<'a> {
    pub fn new(layout: &'a CacheLayout, files: &'a dyn FileProbe, dates: DateContext) -> Self {
        Self {
            layout,
            files,
            dates,
        }
    }

    /// One synchronous pass over `nodes`; rows follow the input order exactly.
    pub fn build(
        &self,
        nodes: &[MediaNode],
        zoom: ZoomLevel,
        selection: &SelectionSnapshot,
    ) -> BuildOutput {
        let mut items = DisplayList::new();
        let mut backfill = Vec::new();
        let mut bucketer = DateBucketer::new(zoom, self.dates);

        for node in nodes {
            let thumbnail = self.layout.probe(node, zoom, self.files, &mut backfill);

            if let Some(header) = bucketer.observe(node.modification_time) {
                trace!("Header '{}' before {}", header.title, node.handle);
                let key = ItemKey::Header {
                    bucket: header.bucket,
                    position: items.len(),
                };
                items.insert(key, GalleryItem::header(header.modify_date, header.title));
            }

            let kind = if node.is_video() {
                ItemKind::Video
            } else {
                ItemKind::Image
            };

            items.insert(
                ItemKey::Node(node.handle),
                GalleryItem {
                    kind,
                    node: Some(node.handle),
                    name: Some(node.name.clone()),
                    index: None,
                    index_for_viewer: None,
                    thumbnail,
                    modify_date: grouping_label(self.dates.date_of(node.modification_time)),
                    header_title: None,
                    selected: selection.is_selected(node.handle),
                    ui_dirty: true,
                },
            );
        }

        debug!(
            "Built {} rows ({} headers) from {} nodes at {:?} zoom, {} artifacts to backfill",
            items.len(),
            items.header_count(),
            nodes.len(),
            zoom,
            backfill.len()
        );

        BuildOutput { items, backfill }
    }
}

/// Keeps the nodes a media gallery can show: no folders, nothing in the
/// rubbish bin, and only names that classify as an image or a video.
pub fn filter_media(source: &dyn NodeSource, nodes: Vec<MediaNode>) -> Vec<MediaNode> {
    nodes
        .into_iter()
        .filter(|node| !node.is_folder)
        .filter(|node| !source.is_in_rubbish(node))
        .filter(|node| is_media_name(&node.name))
        .collect()
}

/// Whether the MIME type guessed from `name` is an image or a video.
pub fn is_media_name(name: &str) -> bool {
    match mime_guess::from_path(name).first() {
        Some(mime) => matches!(mime.type_().as_str(), "image" | "video"),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::cache::tests::FakeProbe;
    use crate::gallery::{ArtifactKind, GalleryError, NodeHandle, NodeQuery, SortOrder};
    use chrono::{NaiveDate, NaiveTime};

    fn ts(y: i32, m: u32, d: u32) -> i64 {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap())
            .and_utc()
            .timestamp()
    }

    fn image(handle: u64, time: i64) -> MediaNode {
        MediaNode {
            handle: NodeHandle(handle),
            parent: None,
            name: format!("IMG_{:04}.jpg", handle),
            modification_time: time,
            is_folder: false,
            has_thumbnail: true,
            has_preview: true,
            duration: None,
        }
    }

    fn layout() -> CacheLayout {
        CacheLayout::new("/cache/thumbnails", "/cache/previews")
    }

    fn dates(year: i32) -> DateContext {
        DateContext::utc(NaiveDate::from_ymd_opt(year, 6, 1).unwrap())
    }

    fn titles(output: &BuildOutput) -> Vec<String> {
        output
            .items
            .items()
            .map(|item| match &item.header_title {
                Some(title) => format!("# {}", title),
                None => item.name.clone().unwrap_or_default(),
            })
            .collect()
    }

    #[test]
    fn test_day_zoom_interleaves_headers() {
        let layout = layout();
        let probe = FakeProbe::default();
        let builder = GalleryListBuilder::new(&layout, &probe, dates(2024));
        let nodes = vec![
            image(1, ts(2024, 1, 5)),
            image(2, ts(2024, 1, 7)),
            image(3, ts(2024, 2, 1)),
        ];

        let output = builder.build(&nodes, ZoomLevel::Day, &SelectionSnapshot::new());

        assert_eq!(
            titles(&output),
            vec![
                "# 05 January",
                "IMG_0001.jpg",
                "# 07 January",
                "IMG_0002.jpg",
                "# 01 February",
                "IMG_0003.jpg",
            ]
        );
    }

    #[test]
    fn test_headers_carry_year_outside_current_year() {
        let layout = layout();
        let probe = FakeProbe::default();
        let builder = GalleryListBuilder::new(&layout, &probe, dates(2026));
        let nodes = vec![image(1, ts(2024, 1, 5)), image(2, ts(2024, 2, 1))];

        let output = builder.build(&nodes, ZoomLevel::Month, &SelectionSnapshot::new());

        assert_eq!(
            titles(&output),
            vec![
                "# January 2024",
                "IMG_0001.jpg",
                "# February 2024",
                "IMG_0002.jpg",
            ]
        );
    }

    #[test]
    fn test_year_zoom_one_header_per_year() {
        let layout = layout();
        let probe = FakeProbe::default();
        let builder = GalleryListBuilder::new(&layout, &probe, dates(2024));
        let nodes = vec![
            image(1, ts(2021, 3, 1)),
            image(2, ts(2021, 11, 30)),
            image(3, ts(2022, 1, 1)),
            image(4, ts(2024, 5, 5)),
            image(5, ts(2024, 5, 6)),
            image(6, ts(2024, 12, 31)),
        ];

        let output = builder.build(&nodes, ZoomLevel::Year, &SelectionSnapshot::new());
        let rows = output.items.snapshot();

        assert_eq!(output.items.header_count(), 3);
        assert_eq!(rows.len(), 9);
        for (position, row) in rows.iter().enumerate() {
            if row.is_header() {
                let next = &rows[position + 1];
                assert!(!next.is_header());
                assert!(next.modify_date.ends_with(row.header_title.as_deref().unwrap()));
            }
        }
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let layout = layout();
        let probe = FakeProbe::default();
        let builder = GalleryListBuilder::new(&layout, &probe, dates(2024));
        let nodes = vec![
            image(1, ts(2023, 12, 31)),
            image(2, ts(2024, 1, 1)),
            image(3, ts(2024, 1, 1)),
        ];

        let first = builder.build(&nodes, ZoomLevel::Day, &SelectionSnapshot::new());
        let second = builder.build(&nodes, ZoomLevel::Day, &SelectionSnapshot::new());

        assert_eq!(first.items, second.items);
        assert_eq!(
            first.items.keys().collect::<Vec<_>>(),
            second.items.keys().collect::<Vec<_>>()
        );
        assert_eq!(first.backfill, second.backfill);
    }

    #[test]
    fn test_selection_carries_over() {
        let layout = layout();
        let probe = FakeProbe::default();
        let builder = GalleryListBuilder::new(&layout, &probe, dates(2024));
        let nodes = vec![image(1, ts(2024, 1, 1)), image(2, ts(2024, 1, 2))];

        let mut first = builder.build(&nodes, ZoomLevel::Month, &SelectionSnapshot::new());
        first.items.get_node_mut(NodeHandle(2)).unwrap().selected = true;
        let snapshot = SelectionSnapshot::capture(first.items.items());

        let second = builder.build(&nodes, ZoomLevel::Day, &snapshot);

        assert!(!second.items.get_node(NodeHandle(1)).unwrap().selected);
        assert!(second.items.get_node(NodeHandle(2)).unwrap().selected);
    }

    #[test]
    fn test_empty_input_builds_nothing() {
        let layout = layout();
        let probe = FakeProbe::default();
        let builder = GalleryListBuilder::new(&layout, &probe, dates(2024));

        let output = builder.build(&[], ZoomLevel::Day, &SelectionSnapshot::new());

        assert!(output.items.is_empty());
        assert!(output.backfill.is_empty());
    }

    #[test]
    fn test_video_classified_by_duration() {
        let layout = layout();
        let probe = FakeProbe::default();
        let builder = GalleryListBuilder::new(&layout, &probe, dates(2024));
        let mut clip = image(2, ts(2024, 1, 1));
        clip.name = "clip.mp4".to_string();
        clip.duration = Some(0);
        let nodes = vec![image(1, ts(2024, 1, 1)), clip];

        let output = builder.build(&nodes, ZoomLevel::Month, &SelectionSnapshot::new());

        assert_eq!(
            output.items.get_node(NodeHandle(1)).unwrap().kind,
            ItemKind::Image
        );
        assert_eq!(
            output.items.get_node(NodeHandle(2)).unwrap().kind,
            ItemKind::Video
        );
    }

    #[test]
    fn test_cached_and_missing_artifacts() {
        let layout = layout();
        let probe = FakeProbe::default();
        let cached = image(1, ts(2024, 1, 1));
        let missing = image(2, ts(2024, 1, 2));
        let mut unadvertised = image(3, ts(2024, 1, 3));
        unadvertised.has_preview = false;
        probe.insert(layout.artifact_path(&cached, ArtifactKind::Preview));

        let builder = GalleryListBuilder::new(&layout, &probe, dates(2024));
        let output = builder.build(
            &[cached.clone(), missing.clone(), unadvertised],
            ZoomLevel::Day,
            &SelectionSnapshot::new(),
        );

        assert_eq!(
            output.items.get_node(NodeHandle(1)).unwrap().thumbnail,
            Some(layout.artifact_path(&cached, ArtifactKind::Preview))
        );
        assert!(output.items.get_node(NodeHandle(2)).unwrap().thumbnail.is_none());
        assert!(output.items.get_node(NodeHandle(3)).unwrap().thumbnail.is_none());
        assert_eq!(output.backfill.len(), 1);
        assert_eq!(output.backfill[0].node.handle, NodeHandle(2));
    }

    struct RubbishSource;

    impl NodeSource for RubbishSource {
        fn nodes(&self, _: &NodeQuery, _: SortOrder) -> Result<Vec<MediaNode>, GalleryError> {
            Ok(Vec::new())
        }

        fn is_in_rubbish(&self, node: &MediaNode) -> bool {
            node.handle == NodeHandle(4)
        }

        fn name(&self) -> &str {
            "rubbish"
        }
    }

    #[test]
    fn test_filter_media_drops_non_media() {
        let mut folder = image(1, 0);
        folder.is_folder = true;
        folder.name = "Camera".to_string();
        let mut doc = image(2, 0);
        doc.name = "notes.txt".to_string();
        let mut unknown = image(3, 0);
        unknown.name = "README".to_string();
        let trashed = image(4, 0);
        let mut video = image(5, 0);
        video.name = "holiday.MOV".to_string();
        let photo = image(6, 0);

        let kept = filter_media(
            &RubbishSource,
            vec![folder, doc, unknown, trashed, video, photo],
        );

        let handles: Vec<_> = kept.iter().map(|n| n.handle).collect();
        assert_eq!(handles, vec![NodeHandle(5), NodeHandle(6)]);
    }

    #[test]
    fn test_is_media_name() {
        assert!(is_media_name("a.JPG"));
        assert!(is_media_name("b.png"));
        assert!(is_media_name("c.mp4"));
        assert!(!is_media_name("d.pdf"));
        assert!(!is_media_name("noextension"));
    }
}
