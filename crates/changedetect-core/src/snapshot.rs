// ── Poll snapshot ──
//
// One poll's worth of data. Built completely before it is published and
// never mutated afterwards; readers share it through `Arc`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use changedetect_api::{SystemInfo, Tag, Watch};

/// Immutable result of one successful poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub watches: BTreeMap<String, Watch>,
    /// `None` when tag polling is disabled.
    pub tags: Option<BTreeMap<String, Tag>>,
    pub systeminfo: SystemInfo,
    /// `None` when notification polling is disabled.
    pub notifications: Option<Vec<String>>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn watch(&self, uuid: &str) -> Option<&Watch> {
        self.watches.get(uuid)
    }

    pub fn watch_count(&self) -> usize {
        self.watches.len()
    }
}

/// Outcome of the most recent poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateStatus {
    pub last_update_success: bool,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl UpdateStatus {
    pub(crate) fn succeeded(&mut self, at: DateTime<Utc>) {
        self.last_update_success = true;
        self.last_error = None;
        self.consecutive_failures = 0;
        self.last_success_at = Some(at);
    }

    pub(crate) fn failed(&mut self, message: String) {
        self.last_update_success = false;
        self.last_error = Some(message);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }
}
