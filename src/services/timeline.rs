//! Selection of one point within the current timeline.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::helpers::parse_service_timestamp;
use crate::models::{TimelineDataset, TimelinePoint};

/// Points older than this are labelled stale for display.
pub const DATA_STALE_AFTER: Duration = Duration::hours(1);

/// Age of the data behind the selected point. Display-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFreshness {
    Fresh,
    Stale,
    /// Missing or unparseable timestamp.
    Unknown,
}

/// Holds the selected index into the current dataset. Index 0 is "now".
#[derive(Debug, Clone, Default)]
pub struct TimelineSelector {
    dataset: Option<Arc<TimelineDataset>>,
    selected_index: usize,
}

impl TimelineSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new dataset and go back to "now".
    pub fn replace(&mut self, dataset: Arc<TimelineDataset>) {
        self.dataset = Some(dataset);
        self.selected_index = 0;
    }

    /// Select a point, clamped to the timeline. No-op without a dataset.
    pub fn select(&mut self, index: usize) {
        let Some(len) = self.dataset.as_ref().map(|d| d.timeline.len()) else {
            return;
        };
        if len == 0 {
            return;
        }
        self.selected_index = index.min(len - 1);
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn dataset(&self) -> Option<&Arc<TimelineDataset>> {
        self.dataset.as_ref()
    }

    pub fn selected_point(&self) -> Option<&TimelinePoint> {
        self.dataset
            .as_ref()
            .and_then(|d| d.timeline.get(self.selected_index))
    }

    /// True for any point after "now".
    pub fn is_forecast(&self) -> bool {
        self.selected_index > 0
    }

    pub fn data_freshness(&self) -> DataFreshness {
        self.data_freshness_at(Utc::now())
    }

    /// Compare the selected point's weather timestamp against `now`.
    pub fn data_freshness_at(&self, now: DateTime<Utc>) -> DataFreshness {
        let Some(point) = self.selected_point() else {
            return DataFreshness::Unknown;
        };
        match parse_service_timestamp(&point.weather.timestamp) {
            Some(ts) if now - ts > DATA_STALE_AFTER => DataFreshness::Stale,
            Some(_) => DataFreshness::Fresh,
            None => DataFreshness::Unknown,
        }
    }
}
