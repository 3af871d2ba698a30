#![forbid(unsafe_code)]

mod entry;
mod handlers;
mod server;
mod support;

pub(crate) use support::*;

use gl_storage::SqliteStore;
use std::path::PathBuf;
use std::thread::JoinHandle;
use tracing::info;

const SERVER_NAME: &str = "gridload";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub(crate) struct GridServer {
    /// Serves every request except the bulk writes themselves.
    store: SqliteStore,
    storage_dir: PathBuf,
    /// Bulk jobs in flight; each runs on its own store and answers its
    /// request when it finishes.
    jobs: Vec<JoinHandle<()>>,
}

fn usage() -> String {
    format!(
        "gl_server - gridload bulk row generator and keyset pager (JSON-RPC over stdio)\n\n\
USAGE:\n\
  gl_server [--storage-dir DIR]\n\
\n\
FLAGS:\n\
  --storage-dir DIR  Datastore directory (default: .gridload)\n\
  -h, --help         Print this help and exit\n\
  -V, --version      Print version and exit\n\
\n\
ENVIRONMENT:\n\
  {ENV_BATCH_SIZE}, {ENV_PARALLELISM},\n\
  {ENV_BATCH_TIMEOUT_MS}, {ENV_INDEX_CHURN_THRESHOLD},\n\
  {ENV_FIRST_PAGE_LIMIT}, {ENV_PAGE_LIMIT}\n\
  {LOG_ENV}  tracing filter for stderr logs (default: info)\n"
    )
}

fn version_line() -> String {
    format!("gl_server {SERVER_VERSION}")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = std::env::args().collect::<Vec<_>>();
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print!("{}", usage());
        return Ok(());
    }
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        println!("{}", version_line());
        return Ok(());
    }

    init_tracing();

    let storage_dir = parse_storage_dir();
    let config = parse_store_config();
    let store = SqliteStore::open_with_config(&storage_dir, config)?;
    info!(
        storage_dir = %storage_dir.display(),
        batch_size = store.config().batch_size,
        parallelism = store.config().parallelism,
        "gridload server ready"
    );

    let mut server = GridServer::new(store, storage_dir);
    let served = entry::run_stdio(&mut server);
    server.wait_for_jobs();
    served
}
