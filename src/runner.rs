//! Orchestrates the complete test flow: translate, execute, report.
//!
//! A run moves linearly through translation, execution, and reporting.
//! Only a translation-service connectivity failure (or a browser that will
//! not launch) aborts a run; every per-step failure is captured in that
//! step's result and execution continues, so one flaky step cannot hide
//! the status of later independent steps. Progress goes through an
//! injectable [`RunObserver`], keeping console output out of the core
//! logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::actions::{Action, ActionResult};
use crate::browser::{
    BrowserKind, BrowserResult, BrowserSession, PlaywrightConfig, PlaywrightSession,
};
use crate::executor::Executor;
use crate::parser::{ActionParser, ParseError};
use crate::reporter::HtmlReporter;
use crate::session::RunDir;

/// Result type for run-level operations
pub type RunResult<T> = Result<T, RunError>;

/// Errors that abort a whole run
#[derive(Debug)]
pub enum RunError {
    /// The translation service could not be reached or refused us
    Translation(ParseError),
    /// The browser session could not be started
    Browser(crate::browser::BrowserError),
    /// IO error preparing the run directory
    Io(std::io::Error),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Translation(e) => write!(f, "Translation failed: {}", e),
            RunError::Browser(e) => write!(f, "Browser failed: {}", e),
            RunError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Translation(e) => Some(e),
            RunError::Browser(e) => Some(e),
            RunError::Io(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for RunError {
    fn from(e: std::io::Error) -> Self {
        RunError::Io(e)
    }
}

/// One end-to-end test run, sealed when the last action finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Unique run id (also the artifact directory name)
    pub id: String,

    /// The source test description
    pub description: String,

    /// When the run started
    pub start_time: DateTime<Utc>,

    /// When the run was sealed
    pub end_time: DateTime<Utc>,

    /// The translated actions, in execution order
    pub actions: Vec<Action>,

    /// One result per action, same order
    pub results: Vec<ActionResult>,

    /// Count of successful steps
    pub successful: usize,

    /// Count of failed steps
    pub failed: usize,

    /// Report artifact, when one was generated
    pub report_path: Option<PathBuf>,
}

impl Run {
    fn begin(id: String, description: &str) -> Self {
        let now = Utc::now();
        Self {
            id,
            description: description.to_string(),
            start_time: now,
            end_time: now,
            actions: Vec::new(),
            results: Vec::new(),
            successful: 0,
            failed: 0,
            report_path: None,
        }
    }

    fn push(&mut self, action: Action, result: ActionResult) {
        if result.success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.actions.push(action);
        self.results.push(result);
    }

    fn seal(&mut self) {
        self.end_time = Utc::now();
    }

    /// Wall-clock duration of the run in seconds.
    pub fn duration_secs(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }

    /// Whether every step succeeded (an empty run passes).
    pub fn passed(&self) -> bool {
        self.failed == 0
    }
}

/// Receives progress callbacks during a run.
///
/// All methods default to no-ops, so observers implement only what they
/// care about.
pub trait RunObserver {
    fn on_translation_start(&mut self, _description: &str) {}
    fn on_actions(&mut self, _actions: &[Action]) {}
    fn on_step_start(&mut self, _step: usize, _total: usize, _action: &Action) {}
    fn on_step_complete(&mut self, _step: usize, _result: &ActionResult) {}
    fn on_note(&mut self, _message: &str) {}
    fn on_run_complete(&mut self, _run: &Run) {}
}

/// Observer that stays quiet (useful in tests and library embedding)
#[derive(Debug, Default)]
pub struct SilentObserver;

impl RunObserver for SilentObserver {}

/// Observer that prints step-by-step progress to the console
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl RunObserver for ConsoleObserver {
    fn on_translation_start(&mut self, description: &str) {
        println!("{}", "=".repeat(60));
        println!("Test: {}", description);
        println!("{}", "=".repeat(60));
        println!("Translating test description...");
    }

    fn on_actions(&mut self, actions: &[Action]) {
        if actions.is_empty() {
            println!("No actions generated from the test description");
            return;
        }
        println!("Generated {} actions:", actions.len());
        for (i, action) in actions.iter().enumerate() {
            println!("  {}. [{}] {}", i + 1, action.kind(), action.description());
        }
    }

    fn on_step_start(&mut self, step: usize, total: usize, action: &Action) {
        println!("Executing step {}/{}: {}", step, total, action.description());
    }

    fn on_step_complete(&mut self, _step: usize, result: &ActionResult) {
        if result.success {
            println!("  ok: {}", result.message);
        } else {
            println!("  FAILED: {}", result.message);
            if let Some(error) = &result.error {
                println!("  error: {}", error);
            }
        }
        if let Some(path) = &result.screenshot_path {
            println!("  screenshot: {}", path.display());
        }
        if let Some(data) = &result.extracted_data {
            println!("  data: {}", data);
        }
    }

    fn on_note(&mut self, message: &str) {
        eprintln!("{}", message);
    }

    fn on_run_complete(&mut self, run: &Run) {
        println!("{}", "=".repeat(60));
        println!(
            "Test complete: {} passed, {} failed ({:.1}s)",
            run.successful,
            run.failed,
            run.duration_secs()
        );
        if let Some(path) = &run.report_path {
            println!("Report: {}", path.display());
        }
        println!("{}", "=".repeat(60));
    }
}

/// Produces a fresh browser session for a run
pub type BrowserFactory = Box<dyn Fn(&RunnerConfig) -> BrowserResult<Box<dyn BrowserSession>>>;

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Browser engine to launch
    pub browser: BrowserKind,
    /// Run the browser without a visible window
    pub headless: bool,
    /// Generate an HTML report for each run
    pub generate_report: bool,
    /// Attach a screenshot to every step's result
    pub screenshot_all_steps: bool,
    /// Override for the artifact base directory
    pub output_dir: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::from_str(&crate::config::get().browser.engine)
                .unwrap_or_default(),
            headless: true,
            generate_report: true,
            screenshot_all_steps: true,
            output_dir: None,
        }
    }
}

impl RunnerConfig {
    pub fn browser(mut self, browser: BrowserKind) -> Self {
        self.browser = browser;
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn generate_report(mut self, generate: bool) -> Self {
        self.generate_report = generate;
        self
    }

    pub fn screenshot_all_steps(mut self, capture: bool) -> Self {
        self.screenshot_all_steps = capture;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

/// Orchestrates the complete test execution flow.
pub struct TestRunner {
    parser: Box<dyn ActionParser>,
    factory: BrowserFactory,
    config: RunnerConfig,
}

impl TestRunner {
    /// Runner that launches a real Playwright-driven browser.
    pub fn new(parser: Box<dyn ActionParser>, config: RunnerConfig) -> Self {
        Self {
            parser,
            factory: Box::new(|cfg: &RunnerConfig| {
                let pw = PlaywrightConfig::new(cfg.browser).headless(cfg.headless);
                Ok(Box::new(PlaywrightSession::launch(&pw)?) as Box<dyn BrowserSession>)
            }),
            config,
        }
    }

    /// Replace the browser factory (tests inject a mock session here).
    pub fn with_browser_factory(mut self, factory: BrowserFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Run a complete test from a natural-language description.
    pub fn run(&self, description: &str) -> RunResult<Run> {
        self.run_with_observer(description, &mut SilentObserver)
    }

    /// Run a test, reporting progress through the observer.
    ///
    /// Guarantees: results appear in action order, one result per action,
    /// no retry, no short-circuit on step failure. The browser session is
    /// released on every exit path.
    pub fn run_with_observer(
        &self,
        description: &str,
        observer: &mut dyn RunObserver,
    ) -> RunResult<Run> {
        self.run_named(description, None, observer)
    }

    /// Run with an explicit artifact-directory name prefix (used by the
    /// scenario-file front end so each scenario gets a readable run id).
    pub fn run_named(
        &self,
        description: &str,
        name: Option<&str>,
        observer: &mut dyn RunObserver,
    ) -> RunResult<Run> {
        observer.on_translation_start(description);
        let mut notes = Vec::new();
        let actions = self
            .parser
            .parse_with_notes(description, &mut notes)
            .map_err(RunError::Translation)?;
        for note in &notes {
            observer.on_note(note);
        }
        observer.on_actions(&actions);

        let run_dir = self.make_run_dir(name);
        let mut run = Run::begin(run_dir.id.clone(), description);

        if self.config.generate_report || !actions.is_empty() {
            run_dir.init()?;
        }

        if !actions.is_empty() {
            let browser = (self.factory)(&self.config).map_err(RunError::Browser)?;
            let mut executor =
                Executor::new(browser, run_dir.clone(), self.config.screenshot_all_steps);

            for (i, action) in actions.iter().enumerate() {
                observer.on_step_start(i + 1, actions.len(), action);
                let result = executor.execute(action);
                for note in executor.take_notes() {
                    observer.on_note(&note);
                }
                observer.on_step_complete(i + 1, &result);
                run.push(action.clone(), result);
            }

            if let Err(e) = executor.close() {
                observer.on_note(&format!("Warning: browser close failed: {}", e));
            }
        }

        run.seal();

        if self.config.generate_report {
            match HtmlReporter::new().generate(&run, &run_dir) {
                Ok(path) => run.report_path = Some(path),
                Err(e) => observer.on_note(&format!("Warning: report generation failed: {}", e)),
            }
        }

        observer.on_run_complete(&run);
        Ok(run)
    }

    fn make_run_dir(&self, name: Option<&str>) -> RunDir {
        let run_dir = match name {
            Some(n) => RunDir::with_name(n),
            None => RunDir::new(),
        };
        match &self.config.output_dir {
            Some(base) => RunDir::in_dir(base.join(&run_dir.id)),
            None => run_dir,
        }
    }
}
