#![forbid(unsafe_code)]

use gl_storage::StoreConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

const DEFAULT_STORAGE_DIR: &str = ".gridload";

pub(crate) const ENV_BATCH_SIZE: &str = "GRIDLOAD_BULK_BATCH_SIZE";
pub(crate) const ENV_PARALLELISM: &str = "GRIDLOAD_BULK_PARALLELISM";
pub(crate) const ENV_BATCH_TIMEOUT_MS: &str = "GRIDLOAD_BULK_BATCH_TIMEOUT_MS";
pub(crate) const ENV_INDEX_CHURN_THRESHOLD: &str = "GRIDLOAD_INDEX_CHURN_THRESHOLD";
pub(crate) const ENV_FIRST_PAGE_LIMIT: &str = "GRIDLOAD_FIRST_PAGE_LIMIT";
pub(crate) const ENV_PAGE_LIMIT: &str = "GRIDLOAD_PAGE_LIMIT";

pub(crate) fn parse_storage_dir() -> PathBuf {
    let mut args = std::env::args().skip(1);
    let mut storage_dir: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        if arg.as_str() == "--storage-dir"
            && let Some(value) = args.next()
        {
            storage_dir = Some(PathBuf::from(value));
        }
    }
    storage_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR))
}

fn parse_u64_value(key: &str, raw: Option<String>) -> Option<u64> {
    let raw = raw?;
    match raw.trim().parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = raw.as_str(), "ignoring non-numeric setting");
            None
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    parse_u64_value(key, std::env::var(key).ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_u64(key).map(|v| usize::try_from(v).unwrap_or(usize::MAX))
}

/// Store tuning from the environment over the built-in defaults. The store
/// clamps the result to its hard ceilings on open.
pub(crate) fn parse_store_config() -> StoreConfig {
    let defaults = StoreConfig::default();
    StoreConfig {
        batch_size: env_usize(ENV_BATCH_SIZE).unwrap_or(defaults.batch_size),
        parallelism: env_usize(ENV_PARALLELISM).unwrap_or(defaults.parallelism),
        batch_timeout: env_u64(ENV_BATCH_TIMEOUT_MS)
            .map(Duration::from_millis)
            .unwrap_or(defaults.batch_timeout),
        index_churn_threshold: env_u64(ENV_INDEX_CHURN_THRESHOLD)
            .unwrap_or(defaults.index_churn_threshold),
        first_page_limit: env_usize(ENV_FIRST_PAGE_LIMIT).unwrap_or(defaults.first_page_limit),
        page_limit: env_usize(ENV_PAGE_LIMIT).unwrap_or(defaults.page_limit),
    }
}
