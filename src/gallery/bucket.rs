use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDate, Offset, Utc};
use serde::Serialize;

use super::ZoomLevel;

/// Time bucket a node falls into at a given zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum BucketKey {
    Year(i32),
    Month(i32, u32),
    /// Year and day of year.
    Day(i32, u32),
}

impl BucketKey {
    pub fn for_date(date: NaiveDate, zoom: ZoomLevel) -> Self {
        match zoom {
            ZoomLevel::Year => BucketKey::Year(date.year()),
            ZoomLevel::Month => BucketKey::Month(date.year(), date.month()),
            ZoomLevel::Day => BucketKey::Day(date.year(), date.ordinal()),
        }
    }
}

/// Time zone and "today" used when turning timestamps into calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateContext {
    offset: FixedOffset,
    today: NaiveDate,
}

impl DateContext {
    pub fn local() -> Self {
        let now = Local::now();
        Self {
            offset: *now.offset(),
            today: now.date_naive(),
        }
    }

    pub fn fixed(offset: FixedOffset, today: NaiveDate) -> Self {
        Self { offset, today }
    }

    pub fn utc(today: NaiveDate) -> Self {
        Self::fixed(Utc.fix(), today)
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Calendar date of a unix timestamp. Out-of-range values map to the epoch.
    pub fn date_of(&self, timestamp: i64) -> NaiveDate {
        DateTime::<Utc>::from_timestamp(timestamp, 0)
            .unwrap_or_default()
            .with_timezone(&self.offset)
            .date_naive()
    }
}

impl Default for DateContext {
    fn default() -> Self {
        Self::local()
    }
}

/// Month and year label shared by every row, e.g. "January 2024".
pub fn grouping_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

/// Section title for a bucket. The year is appended only when it differs
/// from today's year.
pub fn header_title(date: NaiveDate, zoom: ZoomLevel, today: NaiveDate) -> String {
    let same_year = date.year() == today.year();
    let (title, year) = match zoom {
        ZoomLevel::Year => (date.format("%Y").to_string(), String::new()),
        ZoomLevel::Month => (
            date.format("%B").to_string(),
            if same_year {
                String::new()
            } else {
                date.format("%Y").to_string()
            },
        ),
        ZoomLevel::Day => (
            date.format("%d %B").to_string(),
            if same_year {
                String::new()
            } else {
                date.format("%Y").to_string()
            },
        ),
    };

    if year.is_empty() {
        title
    } else {
        format!("{} {}", title, year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub bucket: BucketKey,
    pub title: String,
    pub modify_date: String,
}

/// Decides where section headers go in a chronologically ordered run of nodes.
#[derive(Debug, Clone)]
pub struct DateBucketer {
    zoom: ZoomLevel,
    dates: DateContext,
    last: Option<BucketKey>,
}

impl DateBucketer {
    pub fn new(zoom: ZoomLevel, dates: DateContext) -> Self {
        Self {
            zoom,
            dates,
            last: None,
        }
    }

    /// Returns a header when `timestamp` opens a new bucket.
    pub fn observe(&mut self, timestamp: i64) -> Option<Header> {
        let date = self.dates.date_of(timestamp);
        let bucket = BucketKey::for_date(date, self.zoom);

        if self.last == Some(bucket) {
            return None;
        }
        self.last = Some(bucket);

        Some(Header {
            bucket,
            title: header_title(date, self.zoom, self.dates.today()),
            modify_date: grouping_label(date),
        })
    }
}
