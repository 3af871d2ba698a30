#![forbid(unsafe_code)]

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewStateSaveRequest {
    pub table_id: String,
    pub state_json: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewStateSaveOutcome {
    Saved { updated_at_ms: i64 },
    /// A bulk lease is live for the table; the write was skipped.
    Deferred { lease_expires_at_ms: i64 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewStateRow {
    pub table_id: String,
    pub state_json: String,
    pub updated_at_ms: i64,
}
