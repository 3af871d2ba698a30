#![forbid(unsafe_code)]

use crate::GridServer;
use serde_json::{Value, json};
use std::path::PathBuf;
use tracing::warn;

impl GridServer {
    pub(crate) fn new(store: gl_storage::SqliteStore, storage_dir: PathBuf) -> Self {
        Self {
            store,
            storage_dir,
            jobs: Vec::new(),
        }
    }

    /// Handles one request. Notifications (no id) are executed but get no
    /// response. `None` is also returned for requests answered later by a
    /// bulk job.
    pub(crate) fn handle(&mut self, request: crate::JsonRpcRequest) -> Option<Value> {
        let is_notification = request.id.is_none();
        let response = self.dispatch(request.id, &request.method, request.params);
        if is_notification {
            return None;
        }
        response
    }

    fn dispatch(&mut self, id: Option<Value>, method: &str, params: Option<Value>) -> Option<Value> {
        if method == "initialize" {
            return Some(crate::json_rpc_response(
                id,
                json!({
                    "serverInfo": { "name": crate::SERVER_NAME, "version": crate::SERVER_VERSION },
                    "methods": crate::handlers::METHODS,
                }),
            ));
        }
        if method == "ping" {
            return Some(crate::json_rpc_response(id, json!({})));
        }

        let args = match params {
            None | Some(Value::Null) => serde_json::Map::new(),
            Some(Value::Object(obj)) => obj,
            Some(_) => {
                return Some(crate::json_rpc_error(
                    id,
                    crate::INVALID_PARAMS,
                    "params must be an object",
                ));
            }
        };

        if method == crate::handlers::BULK_METHOD {
            self.reap_finished_jobs();
            return self
                .start_bulk_job(id.clone(), args)
                .map(|body| crate::json_rpc_response(id, body));
        }

        let response = match crate::handlers::dispatch(self, method, args) {
            Some(body) => crate::json_rpc_response(id, body),
            None => crate::json_rpc_error(
                id,
                crate::METHOD_NOT_FOUND,
                &format!("Unknown method: {method}"),
            ),
        };
        Some(response)
    }

    pub(crate) fn track_job(&mut self, job: std::thread::JoinHandle<()>) {
        self.jobs.push(job);
    }

    pub(crate) fn storage_dir(&self) -> &std::path::Path {
        &self.storage_dir
    }

    fn reap_finished_jobs(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) =
            self.jobs.drain(..).partition(|job| job.is_finished());
        self.jobs = running;
        for job in finished {
            if job.join().is_err() {
                warn!("bulk job thread panicked");
            }
        }
    }

    /// Blocks until every bulk job has written its response.
    pub(crate) fn wait_for_jobs(&mut self) {
        for job in self.jobs.drain(..) {
            if job.join().is_err() {
                warn!("bulk job thread panicked");
            }
        }
    }
}
