//! Applies one action at a time to a live browser session.
//!
//! The executor owns the session for the duration of a run and never lets
//! a step failure escape as an error: every outcome, good or bad, becomes
//! the step's `ActionResult`, so one bad step cannot abort the rest of the
//! sequence. Verification mismatches are ordinary `success=false` results;
//! infrastructure failures additionally carry the error detail.

use std::path::PathBuf;
use std::time::Duration;

use crate::actions::{Action, ActionResult};
use crate::browser::{BrowserResult, BrowserSession};
use crate::session::RunDir;

/// Executes actions against an exclusively-owned browser session.
pub struct Executor {
    browser: Box<dyn BrowserSession>,
    run_dir: RunDir,
    screenshot_all_steps: bool,
    step: usize,
    notes: Vec<String>,
}

impl Executor {
    pub fn new(browser: Box<dyn BrowserSession>, run_dir: RunDir, screenshot_all_steps: bool) -> Self {
        Self {
            browser,
            run_dir,
            screenshot_all_steps,
            step: 0,
            notes: Vec::new(),
        }
    }

    /// Drain diagnostics accumulated since the last call (best-effort
    /// capture failures and the like), for forwarding to an observer.
    pub fn take_notes(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notes)
    }

    /// Execute one action. Never returns an error: failures are captured
    /// in the returned result.
    pub fn execute(&mut self, action: &Action) -> ActionResult {
        self.step += 1;
        let mut result = self.apply(action);

        // Capture-on-every-step attaches a best-effort screenshot to each
        // result, including failed ones, unless the step took its own.
        if self.screenshot_all_steps && result.screenshot_path.is_none() {
            if let Some(path) = self.try_capture(None) {
                result.screenshot_path = Some(path);
            }
        }

        result
    }

    fn apply(&mut self, action: &Action) -> ActionResult {
        match action {
            Action::Navigate { url, .. } => match self.browser.navigate(url) {
                Ok(()) => ActionResult::ok(format!("Navigated to {}", url)),
                Err(e) => ActionResult::fail(
                    format!("Failed to navigate to {}", url),
                    Some(e.to_string()),
                ),
            },

            Action::Click { target, .. } => match self.browser.click(target) {
                Ok(()) => ActionResult::ok(format!("Clicked {}", target)),
                Err(e) => {
                    ActionResult::fail(format!("Failed to click {}", target), Some(e.to_string()))
                }
            },

            Action::TypeText { target, text, .. } => match self.browser.type_text(target, text) {
                Ok(()) => ActionResult::ok(format!("Typed '{}' into {}", text, target)),
                Err(e) => ActionResult::fail(
                    format!("Failed to type into {}", target),
                    Some(e.to_string()),
                ),
            },

            Action::VerifyTextPresent { text, .. } => match self.browser.page_text() {
                Ok(page) if page.contains(text.as_str()) => {
                    ActionResult::ok(format!("Text '{}' is present on the page", text))
                }
                Ok(_) => {
                    // A mismatch is an expected test outcome, not a fault.
                    ActionResult::fail(format!("Text '{}' not found on the page", text), None)
                }
                Err(e) => ActionResult::fail(
                    format!("Could not read the page to verify '{}'", text),
                    Some(e.to_string()),
                ),
            },

            Action::VerifyUrlContains { substring, .. } => match self.browser.current_url() {
                Ok(url) if url.contains(substring.as_str()) => {
                    ActionResult::ok(format!("URL contains '{}'", substring))
                }
                Ok(url) => ActionResult::fail(
                    format!("URL '{}' does not contain '{}'", url, substring),
                    None,
                ),
                Err(e) => ActionResult::fail(
                    format!("Could not read the URL to verify '{}'", substring),
                    Some(e.to_string()),
                ),
            },

            Action::Wait { seconds, .. } => {
                // Validation only guarantees finite and non-negative; a
                // value too large for a Duration must fail the step, not
                // abort the run.
                let duration = match Duration::try_from_secs_f64(*seconds) {
                    Ok(duration) => duration,
                    Err(e) => {
                        return ActionResult::fail(
                            format!("Cannot wait {} seconds", seconds),
                            Some(e.to_string()),
                        );
                    }
                };
                match self.browser.wait(duration) {
                    Ok(()) => ActionResult::ok(format!("Waited {} seconds", seconds)),
                    Err(e) => ActionResult::fail(
                        format!("Wait of {} seconds was interrupted", seconds),
                        Some(e.to_string()),
                    ),
                }
            }

            Action::Screenshot { name, .. } => match self.capture(name.as_deref()) {
                Ok(path) => ActionResult::ok(format!("Screenshot saved to {}", path.display()))
                    .with_screenshot(path),
                Err(e) => ActionResult::fail("Failed to capture screenshot", Some(e)),
            },

            Action::ExtractData { target, .. } => match self.browser.extract_text(target) {
                Ok(text) => ActionResult::ok(format!("Extracted data from {}", target)).with_data(
                    serde_json::json!({
                        "target": target,
                        "value": text,
                    }),
                ),
                Err(e) => ActionResult::fail(
                    format!("Failed to extract data from {}", target),
                    Some(e.to_string()),
                ),
            },
        }
    }

    /// Capture a screenshot to a path unique within this run.
    fn capture(&mut self, name: Option<&str>) -> Result<PathBuf, String> {
        let bytes = self.browser.screenshot().map_err(|e| e.to_string())?;
        let path = self.run_dir.screenshot_path(self.step, name);
        std::fs::write(&path, &bytes).map_err(|e| e.to_string())?;
        Ok(path)
    }

    /// Best-effort capture for capture-on-every-step mode.
    fn try_capture(&mut self, name: Option<&str>) -> Option<PathBuf> {
        match self.capture(name) {
            Ok(path) => Some(path),
            Err(e) => {
                self.notes
                    .push(format!("Warning: step {} screenshot failed: {}", self.step, e));
                None
            }
        }
    }

    /// Release the browser session.
    pub fn close(&mut self) -> BrowserResult<()> {
        self.browser.close()
    }
}
