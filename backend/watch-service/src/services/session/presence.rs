use chrono::{DateTime, Utc};

/// Last viewer count fetched at resolution time. No polling.
#[derive(Debug, Clone, Default)]
pub struct Presence {
    viewer_count: u64,
    refreshed_at: Option<DateTime<Utc>>,
}

impl Presence {
    pub fn current_count(&self) -> u64 {
        self.viewer_count
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn record(&mut self, viewer_count: u64) {
        self.viewer_count = viewer_count;
        self.refreshed_at = Some(Utc::now());
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
