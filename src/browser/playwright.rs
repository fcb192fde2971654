//! Playwright-backed browser session.
//!
//! Drives a real browser through a long-lived Node.js driver subprocess
//! (`driver.js`, embedded in the binary and materialized to a temp file at
//! launch). The protocol is newline-delimited JSON over stdin/stdout with
//! per-request ids. Every request carries a hard Rust-side deadline on top
//! of the driver's own Playwright timeouts, so a wedged driver resolves to
//! a timeout error instead of hanging the run.
//!
//! Requires Node.js with the `playwright` package installed
//! (`npm install playwright && npx playwright install`).

use base64::Engine;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use super::{BrowserError, BrowserKind, BrowserResult, BrowserSession};
use crate::config;

/// Embedded Node.js driver script
const DRIVER_JS: &str = include_str!("driver.js");

/// Extra slack on top of the driver-side timeout before the Rust side
/// gives up on a request
const REPLY_GRACE: Duration = Duration::from_secs(5);

/// Maximum time to wait for the browser to launch and report ready
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum time to wait for the driver to exit after a close request
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a Playwright session
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    /// Browser engine to launch
    pub kind: BrowserKind,
    /// Run without a visible window
    pub headless: bool,
    /// Per-action timeout (milliseconds)
    pub action_timeout_ms: u64,
    /// Navigation timeout (milliseconds)
    pub navigation_timeout_ms: u64,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        let cfg = config::get();
        Self {
            kind: BrowserKind::from_str(&cfg.browser.engine).unwrap_or_default(),
            headless: true,
            action_timeout_ms: cfg.browser.action_timeout_ms,
            navigation_timeout_ms: cfg.browser.navigation_timeout_ms,
        }
    }
}

impl PlaywrightConfig {
    pub fn new(kind: BrowserKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn action_timeout_ms(mut self, ms: u64) -> Self {
        self.action_timeout_ms = ms;
        self
    }

    pub fn navigation_timeout_ms(mut self, ms: u64) -> Self {
        self.navigation_timeout_ms = ms;
        self
    }
}

/// A browser session backed by the Playwright driver subprocess
pub struct PlaywrightSession {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<std::io::Result<String>>,
    driver_path: PathBuf,
    engine: &'static str,
    action_timeout: Duration,
    navigation_timeout: Duration,
    next_id: u64,
    closed: bool,
}

impl PlaywrightSession {
    /// Launch the driver and wait for the browser to report ready.
    pub fn launch(config: &PlaywrightConfig) -> BrowserResult<Self> {
        let driver_path = write_driver_script()?;

        let spawned = Command::new("node")
            .arg(&driver_path)
            .arg(config.kind.as_str())
            .arg(if config.headless { "true" } else { "false" })
            .arg(config.action_timeout_ms.to_string())
            .arg(config.navigation_timeout_ms.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                let _ = std::fs::remove_file(&driver_path);
                return Err(BrowserError::Launch(format!(
                    "could not spawn node ({}); is Node.js installed?",
                    e
                )));
            }
        };

        let stdin = match child.stdin.take() {
            Some(stdin) => stdin,
            None => {
                let _ = child.kill();
                let _ = std::fs::remove_file(&driver_path);
                return Err(BrowserError::Launch("failed to open driver stdin".to_string()));
            }
        };
        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = std::fs::remove_file(&driver_path);
                return Err(BrowserError::Launch("failed to open driver stdout".to_string()));
            }
        };

        let lines = spawn_line_reader(stdout);

        let mut session = Self {
            child,
            stdin,
            lines,
            driver_path,
            engine: config.kind.as_str(),
            action_timeout: Duration::from_millis(config.action_timeout_ms),
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
            next_id: 0,
            closed: false,
        };

        match session.read_reply(LAUNCH_TIMEOUT) {
            Ok(ready) if ready["ready"].as_bool() == Some(true) => Ok(session),
            Ok(ready) => {
                let message = ready["error"].as_str().unwrap_or("driver not ready").to_string();
                session.shutdown();
                Err(BrowserError::Launch(message))
            }
            Err(e) => {
                session.shutdown();
                Err(BrowserError::Launch(format!("driver did not start: {}", e)))
            }
        }
    }

    /// Send one request and wait for its reply within the deadline.
    fn request(
        &mut self,
        mut payload: serde_json::Value,
        deadline: Duration,
    ) -> BrowserResult<serde_json::Value> {
        if self.closed {
            return Err(BrowserError::Protocol("session already closed".to_string()));
        }

        self.next_id += 1;
        let id = self.next_id;
        payload["id"] = serde_json::Value::from(id);

        let mut line = payload.to_string();
        line.push('\n');
        if let Err(e) = self.stdin.write_all(line.as_bytes()) {
            self.shutdown();
            return Err(BrowserError::Protocol(format!("driver gone: {}", e)));
        }

        let reply = match self.read_reply_for(id, deadline) {
            Ok(reply) => reply,
            Err(e) => {
                // A request we gave up on leaves the protocol stream in an
                // unknown state; the session is unusable from here on.
                self.shutdown();
                return Err(e);
            }
        };

        if reply["ok"].as_bool() == Some(true) {
            Ok(reply)
        } else {
            Err(map_failure(&reply, self.action_timeout))
        }
    }

    fn read_reply_for(&mut self, id: u64, deadline: Duration) -> BrowserResult<serde_json::Value> {
        let start = Instant::now();
        loop {
            let remaining = deadline
                .checked_sub(start.elapsed())
                .ok_or(BrowserError::Timeout(deadline))?;
            match self.lines.recv_timeout(remaining.min(Duration::from_millis(200))) {
                Ok(Ok(line)) => {
                    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&line) {
                        if value["id"].as_u64() == Some(id) {
                            return Ok(value);
                        }
                        // Stale reply from an abandoned request; skip it.
                    }
                }
                Ok(Err(e)) => return Err(BrowserError::Io(e)),
                Err(RecvTimeoutError::Timeout) => {
                    if start.elapsed() >= deadline {
                        return Err(BrowserError::Timeout(deadline));
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(BrowserError::Protocol("driver exited".to_string()));
                }
            }
        }
    }

    fn read_reply(&mut self, deadline: Duration) -> BrowserResult<serde_json::Value> {
        let start = Instant::now();
        loop {
            let remaining = deadline
                .checked_sub(start.elapsed())
                .ok_or(BrowserError::Timeout(deadline))?;
            match self.lines.recv_timeout(remaining) {
                Ok(Ok(line)) => {
                    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&line) {
                        return Ok(value);
                    }
                }
                Ok(Err(e)) => return Err(BrowserError::Io(e)),
                Err(RecvTimeoutError::Timeout) => return Err(BrowserError::Timeout(deadline)),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(BrowserError::Protocol("driver exited".to_string()));
                }
            }
        }
    }

    /// Kill the driver and clean up, ignoring errors.
    fn shutdown(&mut self) {
        if !self.closed {
            let _ = self.child.kill();
            let _ = self.child.wait();
            let _ = std::fs::remove_file(&self.driver_path);
            self.closed = true;
        }
    }
}

impl BrowserSession for PlaywrightSession {
    fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        let deadline = self.navigation_timeout + REPLY_GRACE;
        self.request(serde_json::json!({"cmd": "navigate", "url": url}), deadline)?;
        Ok(())
    }

    fn click(&mut self, hint: &str) -> BrowserResult<()> {
        let deadline = self.action_timeout + REPLY_GRACE;
        self.request(serde_json::json!({"cmd": "click", "hint": hint}), deadline)?;
        Ok(())
    }

    fn type_text(&mut self, hint: &str, text: &str) -> BrowserResult<()> {
        let deadline = self.action_timeout + REPLY_GRACE;
        self.request(
            serde_json::json!({"cmd": "type", "hint": hint, "text": text}),
            deadline,
        )?;
        Ok(())
    }

    fn page_text(&mut self) -> BrowserResult<String> {
        let deadline = self.action_timeout + REPLY_GRACE;
        let reply = self.request(serde_json::json!({"cmd": "text"}), deadline)?;
        Ok(reply["data"].as_str().unwrap_or_default().to_string())
    }

    fn current_url(&mut self) -> BrowserResult<String> {
        let deadline = self.action_timeout + REPLY_GRACE;
        let reply = self.request(serde_json::json!({"cmd": "url"}), deadline)?;
        Ok(reply["data"].as_str().unwrap_or_default().to_string())
    }

    fn extract_text(&mut self, hint: &str) -> BrowserResult<String> {
        let deadline = self.action_timeout + REPLY_GRACE;
        let reply = self.request(serde_json::json!({"cmd": "extract", "hint": hint}), deadline)?;
        Ok(reply["data"].as_str().unwrap_or_default().to_string())
    }

    fn screenshot(&mut self) -> BrowserResult<Vec<u8>> {
        let deadline = self.action_timeout + REPLY_GRACE;
        let reply = self.request(serde_json::json!({"cmd": "shot"}), deadline)?;
        let encoded = reply["data"]
            .as_str()
            .ok_or_else(|| BrowserError::Protocol("screenshot reply carries no data".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| BrowserError::Protocol(format!("undecodable screenshot: {}", e)))
    }

    fn wait(&mut self, duration: Duration) -> BrowserResult<()> {
        let ms = duration.as_millis().min(u64::MAX as u128) as u64;
        let deadline = duration + self.action_timeout + REPLY_GRACE;
        self.request(serde_json::json!({"cmd": "wait", "ms": ms}), deadline)?;
        Ok(())
    }

    fn close(&mut self) -> BrowserResult<()> {
        if self.closed {
            return Ok(());
        }

        let result = self.request(serde_json::json!({"cmd": "close"}), SHUTDOWN_TIMEOUT);

        let start = Instant::now();
        while start.elapsed() < SHUTDOWN_TIMEOUT {
            match self.child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) => thread::sleep(Duration::from_millis(50)),
                Err(_) => break,
            }
        }
        self.shutdown();

        result.map(|_| ())
    }

    fn kind(&self) -> &str {
        self.engine
    }
}

impl Drop for PlaywrightSession {
    fn drop(&mut self) {
        // Guaranteed release on every exit path, even when close() was
        // skipped because an earlier step panicked or errored.
        self.shutdown();
    }
}

/// Map a driver failure reply to a boundary error.
fn map_failure(reply: &serde_json::Value, action_timeout: Duration) -> BrowserError {
    let message = reply["error"].as_str().unwrap_or("unknown failure").to_string();
    let hint = reply["hint"].as_str().unwrap_or_default().to_string();
    match reply["code"].as_str() {
        Some("element_not_found") => BrowserError::ElementNotFound(hint),
        Some("ambiguous_element") => BrowserError::AmbiguousElement {
            hint,
            count: reply["count"].as_u64().unwrap_or(2) as usize,
        },
        Some("navigation") => BrowserError::Navigation(message),
        Some("timeout") => BrowserError::Timeout(action_timeout),
        Some("extract") | Some("extraction") => BrowserError::Extraction(message),
        _ => BrowserError::Protocol(message),
    }
}

/// Materialize the embedded driver script to a unique temp file.
fn write_driver_script() -> BrowserResult<PathBuf> {
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let path = std::env::temp_dir().join(format!(
        "agentest_driver_{}_{}.js",
        std::process::id(),
        stamp
    ));
    std::fs::write(&path, DRIVER_JS)?;
    Ok(path)
}

fn spawn_line_reader(stdout: std::process::ChildStdout) -> Receiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let reader = BufReader::new(stdout);
        for line in reader.lines() {
            let failed = line.is_err();
            if tx.send(line).is_err() || failed {
                break;
            }
        }
    });
    rx
}
