use super::bucket::{BucketKey, DateContext, header_title};
use super::{GalleryCard, MediaNode, ZoomLevel};
use serde::{Deserialize, Serialize};

/// Grouped browsing modes; each card summarises one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardView {
    Years,
    Months,
    Days,
}

impl CardView {
    pub fn zoom(self) -> ZoomLevel {
        match self {
            CardView::Years => ZoomLevel::Year,
            CardView::Months => ZoomLevel::Month,
            CardView::Days => ZoomLevel::Day,
        }
    }
}

/// One card per consecutive bucket. The first node seen in a bucket is its
/// cover, so the caller's ordering decides which photo represents it.
pub fn build_cards(nodes: &[MediaNode], view: CardView, dates: DateContext) -> Vec<GalleryCard> {
    let zoom = view.zoom();
    let mut cards: Vec<GalleryCard> = Vec::new();

    for node in nodes {
        let date = dates.date_of(node.modification_time);
        let bucket = BucketKey::for_date(date, zoom);

        match cards.last_mut() {
            Some(card) if card.bucket == bucket => card.count += 1,
            _ => cards.push(GalleryCard {
                bucket,
                title: header_title(date, zoom, dates.today()),
                cover: node.handle,
                cover_name: node.name.clone(),
                count: 1,
            }),
        }
    }

    cards
}
