#![forbid(unsafe_code)]

use serde_json::Value;
use std::collections::BTreeMap;

/// How pages after the first one are sized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PageSizing {
    /// Later pages use the caller's limit (or the configured page limit).
    #[default]
    Fixed,
    /// Later pages are sized to the table's total count at query time, so the
    /// remainder arrives in one round trip.
    SweepRemainder,
}

impl PageSizing {
    pub fn as_str(self) -> &'static str {
        match self {
            PageSizing::Fixed => "fixed",
            PageSizing::SweepRemainder => "sweep_remainder",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fixed" => Some(PageSizing::Fixed),
            "sweep_remainder" | "sweep" => Some(PageSizing::SweepRemainder),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub table_id: String,
    pub cursor: Option<String>,
    pub limit: Option<usize>,
    pub sizing: PageSizing,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PageRow {
    pub id: String,
    pub created_at_ms: i64,
    /// Column id to value. Current columns absent from the stored cache are
    /// reported as `null`.
    pub data: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PageResult {
    pub rows: Vec<PageRow>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    /// Count at query time; not a snapshot shared with `rows`.
    pub total_count: u64,
    /// The effective limit after the sizing policy was applied.
    pub limit: usize,
    /// The supplied cursor was malformed or stale and the page restarted
    /// from the beginning.
    pub cursor_reset: bool,
}
