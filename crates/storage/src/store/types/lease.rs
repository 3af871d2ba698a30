#![forbid(unsafe_code)]

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkLease {
    pub lease_id: String,
    pub table_id: String,
    pub expires_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaseStatus {
    pub is_locked: bool,
    pub expires_at_ms: Option<i64>,
    pub remaining_ms: Option<i64>,
}
