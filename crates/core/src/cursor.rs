#![forbid(unsafe_code)]

//! Keyset pagination cursor.
//!
//! A cursor names the `(created_at_ms, row_id)` pair of the last row a caller
//! has seen. Callers treat the encoded token as opaque; it is never persisted.

const CURSOR_PREFIX: &str = "pc1.";
const MAX_ROW_ID_LEN: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PageCursor {
    pub created_at_ms: i64,
    pub row_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CursorError {
    Empty,
    UnknownVersion,
    InvalidTimestamp,
    InvalidRowId,
}

impl std::fmt::Display for CursorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::Empty => "cursor must not be empty",
            Self::UnknownVersion => "cursor has an unknown prefix",
            Self::InvalidTimestamp => "cursor timestamp is invalid",
            Self::InvalidRowId => "cursor row id is invalid",
        };
        f.write_str(message)
    }
}

impl std::error::Error for CursorError {}

impl PageCursor {
    pub fn new(created_at_ms: i64, row_id: impl Into<String>) -> Self {
        Self {
            created_at_ms,
            row_id: row_id.into(),
        }
    }

    pub fn encode(&self) -> String {
        format!("{CURSOR_PREFIX}{}.{}", self.created_at_ms, self.row_id)
    }

    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CursorError::Empty);
        }
        let body = token
            .strip_prefix(CURSOR_PREFIX)
            .ok_or(CursorError::UnknownVersion)?;
        let (ts, row_id) = body.split_once('.').ok_or(CursorError::InvalidTimestamp)?;
        let created_at_ms = ts
            .parse::<i64>()
            .map_err(|_| CursorError::InvalidTimestamp)?;
        if created_at_ms < 0 {
            return Err(CursorError::InvalidTimestamp);
        }
        if row_id.is_empty()
            || row_id.len() > MAX_ROW_ID_LEN
            || row_id.chars().any(|c| c.is_control() || c.is_whitespace())
        {
            return Err(CursorError::InvalidRowId);
        }
        Ok(Self::new(created_at_ms, row_id))
    }
}
