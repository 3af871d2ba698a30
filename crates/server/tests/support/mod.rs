#![forbid(unsafe_code)]
#![allow(dead_code)]

use serde_json::Value;
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub(crate) struct Server {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    storage_dir: PathBuf,
    next_id: u64,
    /// Responses read while waiting for a different id.
    unclaimed: Vec<Value>,
}

impl Server {
    pub(crate) fn start(test_name: &str) -> Self {
        Self::start_with_env(test_name, &[])
    }

    pub(crate) fn start_with_env(test_name: &str, envs: &[(&str, &str)]) -> Self {
        let storage_dir = temp_dir(test_name);
        let mut command = Command::new(env!("CARGO_BIN_EXE_gl_server"));
        command
            .arg("--storage-dir")
            .arg(&storage_dir)
            .env("GRIDLOAD_LOG", "warn")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        for (key, value) in envs {
            command.env(key, value);
        }
        let mut child = command.spawn().expect("spawn gl_server");

        let stdin = child.stdin.take().expect("stdin");
        let stdout = BufReader::new(child.stdout.take().expect("stdout"));

        Self {
            child,
            stdin: Some(stdin),
            stdout,
            storage_dir,
            next_id: 1,
            unclaimed: Vec::new(),
        }
    }

    pub(crate) fn send_raw(&mut self, line: &str) {
        let stdin = self.stdin.as_mut().expect("stdin is open");
        writeln!(stdin, "{line}").expect("write request");
        stdin.flush().expect("flush request");
    }

    /// Ends the request stream; the server exits once in-flight jobs answer.
    pub(crate) fn close_stdin(&mut self) {
        self.stdin = None;
    }

    pub(crate) fn send(&mut self, req: Value) {
        self.send_raw(&req.to_string());
    }

    pub(crate) fn recv(&mut self) -> Value {
        let mut line = String::new();
        self.stdout.read_line(&mut line).expect("read response");
        assert!(!line.trim().is_empty(), "empty response line");
        serde_json::from_str(&line).expect("parse response json")
    }

    pub(crate) fn request(&mut self, req: Value) -> Value {
        self.send(req);
        self.recv()
    }

    /// Sends a call without waiting for its response; returns the id.
    pub(crate) fn send_call(&mut self, method: &str, params: Value) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.send(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        }));
        id
    }

    /// The response for `id`, buffering any other responses read meanwhile.
    pub(crate) fn recv_for(&mut self, id: u64) -> Value {
        if let Some(index) = self.unclaimed.iter().position(|resp| response_id(resp) == Some(id)) {
            return self.unclaimed.remove(index);
        }
        loop {
            let resp = self.recv();
            if response_id(&resp) == Some(id) {
                return resp;
            }
            self.unclaimed.push(resp);
        }
    }

    /// Whether the response for `id` has already been read.
    pub(crate) fn has_unclaimed(&self, id: u64) -> bool {
        self.unclaimed.iter().any(|resp| response_id(resp) == Some(id))
    }

    /// Calls `method` and returns the `result` envelope.
    pub(crate) fn call(&mut self, method: &str, params: Value) -> Value {
        let id = self.send_call(method, params);
        let resp = self.recv_for(id);
        resp.get("result")
            .cloned()
            .unwrap_or_else(|| panic!("{method} must return a result: {resp}"))
    }

    /// Like `call` but asserts success and returns the inner `result`.
    pub(crate) fn call_ok(&mut self, method: &str, params: Value) -> Value {
        let envelope = self.call(method, params);
        assert_eq!(
            envelope.get("success").and_then(|v| v.as_bool()),
            Some(true),
            "{method} failed: {envelope}"
        );
        envelope.get("result").cloned().expect("envelope result")
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.storage_dir);
    }
}

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("gl_server_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn response_id(resp: &Value) -> Option<u64> {
    resp.get("id").and_then(|v| v.as_u64())
}

pub(crate) fn error_code(envelope: &Value) -> Option<&str> {
    envelope
        .get("error")
        .and_then(|v| v.get("code"))
        .and_then(|v| v.as_str())
}
