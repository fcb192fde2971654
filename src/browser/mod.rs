//! Browser session abstraction.
//!
//! This module provides a unified interface over a live browser:
//! - `PlaywrightSession` drives a real browser through a Node.js Playwright
//!   driver subprocess
//! - `MockBrowser` is a scriptable in-memory page model for testing
//!
//! All calls are bounded: a call that hangs resolves to a timeout error
//! rather than blocking the run forever.

pub mod mock;
pub mod playwright;

pub use mock::MockBrowser;
pub use playwright::{PlaywrightConfig, PlaywrightSession};

use std::time::Duration;

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// Errors that can occur at the browser boundary
#[derive(Debug)]
pub enum BrowserError {
    /// Could not start the browser or its driver process
    Launch(String),
    /// Page load failed or timed out
    Navigation(String),
    /// No element matched the locator hint within the bounded wait
    ElementNotFound(String),
    /// More than one equally-plausible element matched the hint
    AmbiguousElement { hint: String, count: usize },
    /// Extraction target absent or unreadable
    Extraction(String),
    /// No reply from the browser within the bounded wait
    Timeout(Duration),
    /// Driver protocol violation (unexpected or missing reply)
    Protocol(String),
    /// IO error talking to the driver
    Io(std::io::Error),
}

impl std::fmt::Display for BrowserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrowserError::Launch(msg) => write!(f, "Browser launch failed: {}", msg),
            BrowserError::Navigation(msg) => write!(f, "Navigation failed: {}", msg),
            BrowserError::ElementNotFound(hint) => {
                write!(f, "No element matched '{}'", hint)
            }
            BrowserError::AmbiguousElement { hint, count } => {
                write!(f, "{} elements matched '{}', no way to choose", count, hint)
            }
            BrowserError::Extraction(msg) => write!(f, "Extraction failed: {}", msg),
            BrowserError::Timeout(d) => write!(f, "No response from browser for {:?}", d),
            BrowserError::Protocol(msg) => write!(f, "Driver protocol error: {}", msg),
            BrowserError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for BrowserError {}

impl From<std::io::Error> for BrowserError {
    fn from(e: std::io::Error) -> Self {
        BrowserError::Io(e)
    }
}

/// Browser engine selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    /// Parse an engine name ("chromium", "firefox", "webkit")
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "chromium" | "chrome" => Some(BrowserKind::Chromium),
            "firefox" => Some(BrowserKind::Firefox),
            "webkit" | "safari" => Some(BrowserKind::Webkit),
            _ => None,
        }
    }

    /// Playwright engine name
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl Default for BrowserKind {
    fn default() -> Self {
        BrowserKind::Chromium
    }
}

impl std::fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live, exclusively-owned browser session.
///
/// Locator hints (`hint` parameters) are plain-language element
/// descriptions or CSS selectors; implementations resolve them with a
/// bounded wait and report `ElementNotFound` / `AmbiguousElement` when
/// resolution fails.
pub trait BrowserSession {
    /// Load a URL and wait for the page to settle.
    fn navigate(&mut self, url: &str) -> BrowserResult<()>;

    /// Click the element matching the hint.
    fn click(&mut self, hint: &str) -> BrowserResult<()>;

    /// Replace the value of the element matching the hint.
    fn type_text(&mut self, hint: &str, text: &str) -> BrowserResult<()>;

    /// Visible text of the whole page.
    fn page_text(&mut self) -> BrowserResult<String>;

    /// URL of the current page.
    fn current_url(&mut self) -> BrowserResult<String>;

    /// Text content of the element matching the hint.
    fn extract_text(&mut self, hint: &str) -> BrowserResult<String>;

    /// PNG bytes of the current viewport.
    fn screenshot(&mut self) -> BrowserResult<Vec<u8>>;

    /// Suspend the session for the given duration.
    fn wait(&mut self, duration: Duration) -> BrowserResult<()>;

    /// Release the session. Implementations must tolerate repeated calls;
    /// `Drop` is the backstop when this is skipped.
    fn close(&mut self) -> BrowserResult<()>;

    /// Engine identifier for logging (e.g. "chromium", "mock").
    fn kind(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_kind_from_str() {
        assert_eq!(BrowserKind::from_str("chromium"), Some(BrowserKind::Chromium));
        assert_eq!(BrowserKind::from_str("Firefox"), Some(BrowserKind::Firefox));
        assert_eq!(BrowserKind::from_str("webkit"), Some(BrowserKind::Webkit));
        assert_eq!(BrowserKind::from_str("ie6"), None);
    }

    #[test]
    fn test_browser_kind_display() {
        assert_eq!(BrowserKind::Chromium.to_string(), "chromium");
        assert_eq!(BrowserKind::default(), BrowserKind::Chromium);
    }

    #[test]
    fn test_error_display() {
        let err = BrowserError::AmbiguousElement {
            hint: "button".to_string(),
            count: 3,
        };
        assert_eq!(err.to_string(), "3 elements matched 'button', no way to choose");
    }
}
