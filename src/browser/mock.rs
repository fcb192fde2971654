//! Scriptable in-memory browser for testing.
//!
//! `MockBrowser` models just enough of a browser for executor and runner
//! tests: a set of pages keyed by URL, each with page text and named
//! elements, plus scripted navigation failures. It is a cheap clonable
//! handle over shared state, so tests can keep a copy and inspect the
//! call log after the runner has consumed the boxed session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{BrowserError, BrowserResult, BrowserSession};

/// Minimal valid PNG header, enough for anything that sniffs file magic.
const PNG_STUB: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x00,
];

#[derive(Debug, Default)]
struct MockPage {
    text: String,
    /// (hint, element text) pairs; duplicate hints model ambiguity
    elements: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct MockState {
    pages: HashMap<String, MockPage>,
    failing_urls: HashMap<String, String>,
    screenshot_error: Option<String>,
    current: Option<String>,
    calls: Vec<String>,
    closed: bool,
}

/// Scriptable browser session for tests
#[derive(Debug, Clone, Default)]
pub struct MockBrowser {
    state: Arc<Mutex<MockState>>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a page with visible text.
    pub fn with_page(self, url: &str, text: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.pages.entry(url.to_string()).or_default().text = text.to_string();
        }
        self
    }

    /// Script an element on a page. Adding the same hint twice makes it
    /// ambiguous.
    pub fn with_element(self, url: &str, hint: &str, text: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state
                .pages
                .entry(url.to_string())
                .or_default()
                .elements
                .push((hint.to_string(), text.to_string()));
        }
        self
    }

    /// Script a navigation failure for a URL.
    pub fn fail_navigation(self, url: &str, error: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.failing_urls.insert(url.to_string(), error.to_string());
        }
        self
    }

    /// Make every screenshot attempt fail.
    pub fn fail_screenshot(self, error: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.screenshot_error = Some(error.to_string());
        }
        self
    }

    /// Ordered log of every boundary call made so far.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Whether `close` was called.
    pub fn closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn find_element(state: &MockState, hint: &str) -> BrowserResult<String> {
        let current = state.current.as_deref().unwrap_or_default();
        let page = match state.pages.get(current) {
            Some(page) => page,
            None => return Err(BrowserError::ElementNotFound(hint.to_string())),
        };

        let needle = hint.to_lowercase();
        let matches: Vec<&(String, String)> = page
            .elements
            .iter()
            .filter(|(h, _)| h.to_lowercase() == needle || h.to_lowercase().contains(&needle))
            .collect();

        match matches.len() {
            0 => Err(BrowserError::ElementNotFound(hint.to_string())),
            1 => Ok(matches[0].1.clone()),
            count => Err(BrowserError::AmbiguousElement {
                hint: hint.to_string(),
                count,
            }),
        }
    }
}

impl BrowserSession for MockBrowser {
    fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("navigate {}", url));
        if let Some(error) = state.failing_urls.get(url) {
            return Err(BrowserError::Navigation(error.clone()));
        }
        state.pages.entry(url.to_string()).or_default();
        state.current = Some(url.to_string());
        Ok(())
    }

    fn click(&mut self, hint: &str) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("click {}", hint));
        Self::find_element(&state, hint).map(|_| ())
    }

    fn type_text(&mut self, hint: &str, text: &str) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("type {} = {}", hint, text));
        Self::find_element(&state, hint).map(|_| ())
    }

    fn page_text(&mut self) -> BrowserResult<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("text".to_string());
        let current = state.current.as_deref().unwrap_or_default();
        Ok(state.pages.get(current).map(|p| p.text.clone()).unwrap_or_default())
    }

    fn current_url(&mut self) -> BrowserResult<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("url".to_string());
        Ok(state.current.clone().unwrap_or_default())
    }

    fn extract_text(&mut self, hint: &str) -> BrowserResult<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("extract {}", hint));
        match Self::find_element(&state, hint) {
            Ok(text) => Ok(text),
            Err(BrowserError::ElementNotFound(h)) => {
                Err(BrowserError::Extraction(format!("no element matched '{}'", h)))
            }
            Err(e) => Err(e),
        }
    }

    fn screenshot(&mut self) -> BrowserResult<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("screenshot".to_string());
        if let Some(error) = &state.screenshot_error {
            return Err(BrowserError::Protocol(error.clone()));
        }
        Ok(PNG_STUB.to_vec())
    }

    fn wait(&mut self, duration: Duration) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("wait {}ms", duration.as_millis()));
        Ok(())
    }

    fn close(&mut self) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("close".to_string());
        state.closed = true;
        Ok(())
    }

    fn kind(&self) -> &str {
        "mock"
    }
}
