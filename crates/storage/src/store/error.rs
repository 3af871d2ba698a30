#![forbid(unsafe_code)]

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    Json(serde_json::Error),
    InvalidInput(&'static str),
    UnknownTable,
    ColumnSetMismatch {
        expected: usize,
        supplied: usize,
    },
    BatchTimeout {
        batch_index: usize,
        timeout_ms: u64,
    },
    WorkerPanicked,
}

impl StoreError {
    /// Stable machine-readable code for callers that forward errors.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(message) if message.starts_with("RESET_REQUIRED") => {
                "RESET_REQUIRED"
            }
            Self::InvalidInput(_) | Self::ColumnSetMismatch { .. } | Self::Json(_) => {
                "INVALID_INPUT"
            }
            Self::UnknownTable => "UNKNOWN_ID",
            Self::BatchTimeout { .. } => "BATCH_TIMEOUT",
            Self::Io(_) | Self::Sql(_) | Self::WorkerPanicked => "STORE_ERROR",
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::Json(err) => write!(f, "json: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::UnknownTable => write!(f, "unknown table"),
            Self::ColumnSetMismatch { expected, supplied } => write!(
                f,
                "column set mismatch (expected={expected}, supplied={supplied})"
            ),
            Self::BatchTimeout {
                batch_index,
                timeout_ms,
            } => write!(
                f,
                "batch timed out (batch={batch_index}, timeout_ms={timeout_ms})"
            ),
            Self::WorkerPanicked => write!(f, "bulk writer panicked"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
