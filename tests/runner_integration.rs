//! End-to-end runner tests with a stubbed translator and mock browser.

use std::fs;

use agentest::actions::Action;
use agentest::browser::{BrowserSession, MockBrowser};
use agentest::parser::{ActionParser, ParseResult, parse_actions_payload};
use agentest::runner::{RunnerConfig, SilentObserver, TestRunner};

/// Translator that replays a canned action sequence.
struct StubParser(Vec<Action>);

impl ActionParser for StubParser {
    fn parse_with_notes(
        &self,
        _description: &str,
        _notes: &mut Vec<String>,
    ) -> ParseResult<Vec<Action>> {
        Ok(self.0.clone())
    }
}

fn runner(actions: Vec<Action>, browser: MockBrowser, output: &std::path::Path) -> TestRunner {
    let config = RunnerConfig::default().output_dir(output);
    TestRunner::new(Box::new(StubParser(actions)), config).with_browser_factory(Box::new(
        move |_| Ok(Box::new(browser.clone()) as Box<dyn BrowserSession>),
    ))
}

fn navigate(url: &str) -> Action {
    Action::Navigate {
        description: format!("Go to {}", url),
        url: url.to_string(),
    }
}

#[test]
fn test_one_result_per_action_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let actions = vec![
        navigate("https://example.com"),
        Action::Wait {
            description: "settle".to_string(),
            seconds: 0.0,
        },
        Action::Screenshot {
            description: "capture".to_string(),
            name: Some("end".to_string()),
        },
    ];
    let run = runner(actions.clone(), MockBrowser::new(), tmp.path())
        .run("navigate, wait, screenshot")
        .unwrap();

    assert_eq!(run.results.len(), run.actions.len());
    assert_eq!(run.actions.len(), 3);
    let kinds: Vec<_> = run.actions.iter().map(|a| a.kind()).collect();
    assert_eq!(kinds, vec!["navigate", "wait", "screenshot"]);
    assert!(run.passed());
}

#[test]
fn test_step_failure_does_not_stop_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let browser = MockBrowser::new()
        .with_page("https://example.com", "Example Domain")
        .fail_navigation("https://down.example", "connection refused");

    // A failing navigation in the middle must not hide the later steps.
    let actions = vec![
        navigate("https://example.com"),
        navigate("https://down.example"),
        Action::VerifyTextPresent {
            description: "heading still reachable".to_string(),
            text: "Example Domain".to_string(),
        },
    ];
    let run = runner(actions, browser.clone(), tmp.path())
        .run("resilient run")
        .unwrap();

    assert_eq!(run.results.len(), 3);
    assert!(run.results[0].success);
    assert!(!run.results[1].success);
    assert!(run.results[2].success, "later step must still execute");
    assert_eq!(run.successful, 2);
    assert_eq!(run.failed, 1);
    assert!(!run.passed());
    assert!(browser.closed());
}

#[test]
fn test_zero_action_run_produces_valid_report() {
    let tmp = tempfile::tempdir().unwrap();
    let run = runner(Vec::new(), MockBrowser::new(), tmp.path())
        .run("do nothing in particular")
        .unwrap();

    assert!(run.results.is_empty());
    assert!(run.passed());

    let report = run.report_path.expect("report must exist for an empty run");
    let html = fs::read_to_string(&report).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("No actions were generated"));
}

#[test]
fn test_screenshot_paths_are_unique_within_a_run() {
    let tmp = tempfile::tempdir().unwrap();
    let shot = |name: &str| Action::Screenshot {
        description: "capture".to_string(),
        name: Some(name.to_string()),
    };
    let actions = vec![
        navigate("https://example.com"),
        shot("state"),
        shot("state"),
        shot("state"),
    ];
    let run = runner(actions, MockBrowser::new(), tmp.path())
        .run("repeat screenshots")
        .unwrap();

    let mut paths: Vec<_> = run
        .results
        .iter()
        .filter_map(|r| r.screenshot_path.clone())
        .collect();
    assert_eq!(paths.len(), 4, "capture-on-every-step covers all steps");
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 4, "no screenshot path may repeat");
    for path in &paths {
        assert!(path.exists());
    }
}

#[test]
fn test_go_to_example_and_take_a_screenshot() {
    let tmp = tempfile::tempdir().unwrap();
    // Exactly the translation an LLM would return for the canonical
    // two-step description, fed through the payload validator.
    let (actions, dropped) = parse_actions_payload(
        r#"{"actions": [
            {"type": "navigate", "description": "Go to example.com", "url": "https://example.com"},
            {"type": "screenshot", "description": "Capture the page"}
        ]}"#,
        &mut Vec::new(),
    );
    assert_eq!(dropped, 0);
    assert_eq!(actions.len(), 2);

    let run = runner(actions, MockBrowser::new(), tmp.path())
        .run_with_observer("Go to example.com and take a screenshot", &mut SilentObserver)
        .unwrap();

    assert_eq!(run.successful, 2);
    assert_eq!(run.failed, 0);
    assert!(run.results[1].screenshot_path.is_some());

    let report = fs::read_to_string(run.report_path.unwrap()).unwrap();
    assert!(report.contains("Navigated to https://example.com"));
    assert!(report.contains("2 passed"));
}

#[test]
fn test_artifacts_land_in_one_run_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let actions = vec![
        navigate("https://example.com"),
        Action::Screenshot {
            description: "capture".to_string(),
            name: None,
        },
    ];
    let run = runner(actions, MockBrowser::new(), tmp.path())
        .run("artifact layout")
        .unwrap();

    let run_root = tmp.path().join(&run.id);
    assert!(run_root.is_dir());
    assert!(run_root.join("report.html").exists());
    for result in &run.results {
        let shot = result.screenshot_path.as_ref().unwrap();
        assert_eq!(shot.parent().unwrap(), run_root);
    }
}
