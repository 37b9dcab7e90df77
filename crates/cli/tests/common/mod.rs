// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(clippy::unwrap_used)]

use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// Address nothing listens on: probes fail fast with connection refused.
pub const UNREACHABLE: &str = "127.0.0.1:1";

/// Isolated config file and data directory for one test.
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    /// Environment whose connectivity probe always fails.
    pub fn offline() -> Self {
        let env = TestEnv {
            dir: TempDir::new().unwrap(),
        };
        env.write_config(&probe_config(UNREACHABLE, ""));
        env
    }

    /// Environment with a freshly written queue key.
    pub fn offline_with_key() -> Self {
        let env = Self::offline();
        env.outbox().args(["keygen", "--write"]).assert().success();
        env
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.config_path(), content).unwrap();
    }

    pub fn outbox(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("outbox");
        cmd.env("OUTBOX_CONFIG", self.config_path())
            .env("OUTBOX_DATA_DIR", self.data_dir())
            .env_remove("OUTBOX_QUEUE_KEY")
            .env_remove("OUTBOX_ACCESS_TOKEN")
            .env_remove("OUTBOX_LOG")
            .current_dir(self.dir.path());
        cmd
    }
}

/// Config text probing `probe_addr`, followed by `extra`.
pub fn probe_config(probe_addr: &str, extra: &str) -> String {
    format!("[connectivity]\nprobe_addr = \"{probe_addr}\"\nprobe_timeout_ms = 500\n\n{extra}")
}

/// Listener that accepts TCP connections at the kernel level, so the
/// connectivity probe sees the network as up while it is alive.
pub fn reachable() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    (listener, addr)
}

/// Serves `count` HTTP requests with a fixed status line. Returns the base
/// URL and a handle yielding the raw requests.
pub fn http_responder(
    status: &'static str,
    count: usize,
) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for stream in listener.incoming().take(count) {
            let mut stream = stream.unwrap();
            stream
                .set_read_timeout(Some(Duration::from_secs(5)))
                .unwrap();
            requests.push(read_request(&mut stream));
            let response =
                format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            stream.write_all(response.as_bytes()).unwrap();
        }
        requests
    });
    (base, handle)
}

/// Reads one request: headers, then `Content-Length` bytes of body.
pub fn read_request(stream: &mut impl Read) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = stream.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&data);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if data.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}
