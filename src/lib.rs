//! Agentest - natural-language browser testing.
//!
//! This crate provides:
//! - Translation of plain-English test descriptions into structured browser
//!   actions via an OpenAI-compatible chat-completions service
//! - A Playwright-driven browser boundary (plus a scriptable mock)
//! - Sequential action execution with per-step results and screenshots
//! - Self-contained HTML reports per run
//! - A plain-text `.atf` scenario file format for authoring suites
//!
//! # Example
//!
//! ```rust,no_run
//! use agentest::parser::{OpenAiParser, ParserConfig};
//! use agentest::runner::{RunnerConfig, TestRunner};
//!
//! let parser = OpenAiParser::new(ParserConfig::default());
//! let runner = TestRunner::new(Box::new(parser), RunnerConfig::default());
//! let run = runner.run("Go to example.com and take a screenshot").unwrap();
//! println!("{} passed, {} failed", run.successful, run.failed);
//! ```

pub mod actions;
pub mod atf;
pub mod browser;
pub mod config;
pub mod executor;
pub mod parser;
pub mod reporter;
pub mod runner;
pub mod session;

// Re-export the action model
pub use actions::{Action, ActionResult, MalformedAction};

// Re-export browser boundary types
pub use browser::{
    BrowserError, BrowserKind, BrowserResult, BrowserSession, MockBrowser, PlaywrightConfig,
    PlaywrightSession,
};

// Re-export translation types
pub use parser::{ActionParser, OpenAiParser, ParseError, ParseResult, ParserConfig};

// Re-export run orchestration
pub use runner::{
    ConsoleObserver, Run, RunError, RunObserver, RunResult, RunnerConfig, SilentObserver,
    TestRunner,
};

// Re-export report generation
pub use reporter::HtmlReporter;

// Re-export artifact management
pub use session::{RunDir, cleanup_old_runs, list_runs, list_runs_in};

// Re-export scenario files
pub use atf::{Scenario, TemplateKind, TestSuite, create_template_file};
