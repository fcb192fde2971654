//! HTML report generation for sealed runs.
//!
//! The report is a single self-contained HTML file written into the run's
//! artifact directory, next to the screenshots it references by file name.
//! Zero-action runs render an empty-but-valid report. Every piece of user
//! or page text is HTML-escaped before it reaches the document.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::runner::Run;
use crate::session::RunDir;

/// Renders a sealed run into an HTML artifact.
#[derive(Debug, Default)]
pub struct HtmlReporter;

impl HtmlReporter {
    pub fn new() -> Self {
        Self
    }

    /// Write the report into the run directory and return its path.
    pub fn generate(&self, run: &Run, run_dir: &RunDir) -> io::Result<PathBuf> {
        let path = run_dir.report_path();
        fs::write(&path, self.render(run))?;
        Ok(path)
    }

    /// Render the report document.
    pub fn render(&self, run: &Run) -> String {
        let mut html = String::with_capacity(4096);

        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>Test Report - {}</title>\n", escape(&run.id)));
        html.push_str("<style>\n");
        html.push_str(REPORT_CSS);
        html.push_str("</style>\n</head>\n<body>\n");

        html.push_str("<h1>Test Report</h1>\n");
        html.push_str(&format!(
            "<p class=\"description\">{}</p>\n",
            escape(&run.description)
        ));

        let status_class = if run.passed() { "passed" } else { "failed" };
        html.push_str(&format!(
            "<div class=\"summary {}\">\n<span>{} passed</span> / <span>{} failed</span> \
             of {} steps &mdash; {:.1}s\n</div>\n",
            status_class,
            run.successful,
            run.failed,
            run.results.len(),
            run.duration_secs()
        ));
        html.push_str(&format!(
            "<p class=\"meta\">Run <code>{}</code>, started {}, finished {}</p>\n",
            escape(&run.id),
            run.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
            run.end_time.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        if run.results.is_empty() {
            html.push_str("<p class=\"empty\">No actions were generated for this test.</p>\n");
        } else {
            html.push_str("<ol class=\"steps\">\n");
            for (action, result) in run.actions.iter().zip(run.results.iter()) {
                let class = if result.success { "step ok" } else { "step failed" };
                html.push_str(&format!("<li class=\"{}\">\n", class));
                html.push_str(&format!(
                    "<div class=\"head\"><span class=\"kind\">[{}]</span> {}</div>\n",
                    escape(action.kind()),
                    escape(action.description())
                ));
                html.push_str(&format!(
                    "<div class=\"message\">{}</div>\n",
                    escape(&result.message)
                ));
                if let Some(error) = &result.error {
                    html.push_str(&format!("<div class=\"error\">{}</div>\n", escape(error)));
                }
                if let Some(path) = &result.screenshot_path {
                    // The report sits next to the screenshots; reference by
                    // file name so the directory can be moved as a whole.
                    let file = path
                        .file_name()
                        .map(|f| f.to_string_lossy().to_string())
                        .unwrap_or_else(|| path.display().to_string());
                    html.push_str(&format!(
                        "<a href=\"{0}\"><img class=\"shot\" src=\"{0}\" alt=\"step screenshot\"></a>\n",
                        escape(&file)
                    ));
                }
                if let Some(data) = &result.extracted_data {
                    let pretty = serde_json::to_string_pretty(data)
                        .unwrap_or_else(|_| data.to_string());
                    html.push_str(&format!("<pre class=\"data\">{}</pre>\n", escape(&pretty)));
                }
                html.push_str("</li>\n");
            }
            html.push_str("</ol>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}

const REPORT_CSS: &str = "\
body { font-family: -apple-system, 'Segoe UI', sans-serif; margin: 2rem auto; max-width: 60rem; color: #222; }
h1 { margin-bottom: 0.25rem; }
.description { font-size: 1.1rem; color: #444; }
.summary { padding: 0.75rem 1rem; border-radius: 6px; margin: 1rem 0; font-weight: 600; }
.summary.passed { background: #e6f4ea; color: #1e7e34; }
.summary.failed { background: #fdecea; color: #b02a37; }
.meta { color: #777; font-size: 0.9rem; }
.steps { padding-left: 1.5rem; }
.step { margin: 1rem 0; padding: 0.75rem 1rem; border-left: 4px solid #ccc; background: #fafafa; }
.step.ok { border-left-color: #1e7e34; }
.step.failed { border-left-color: #b02a37; }
.kind { font-family: monospace; color: #666; }
.message { margin-top: 0.25rem; }
.error { margin-top: 0.25rem; color: #b02a37; font-family: monospace; white-space: pre-wrap; }
.shot { max-width: 24rem; margin-top: 0.5rem; border: 1px solid #ddd; border-radius: 4px; display: block; }
.data { background: #f0f0f0; padding: 0.5rem; border-radius: 4px; overflow-x: auto; }
.empty { color: #777; font-style: italic; }
";

/// Escape text for inclusion in HTML.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Action, ActionResult};
    use chrono::Utc;

    fn sample_run(results: Vec<(Action, ActionResult)>) -> Run {
        let (actions, results): (Vec<_>, Vec<_>) = results.into_iter().unzip();
        let successful = results.iter().filter(|r: &&ActionResult| r.success).count();
        let failed = results.len() - successful;
        Run {
            id: "run_test_1".to_string(),
            description: "Go to example.com & <check> things".to_string(),
            start_time: Utc::now(),
            end_time: Utc::now(),
            actions,
            results,
            successful,
            failed,
            report_path: None,
        }
    }

    #[test]
    fn test_zero_action_report_is_valid() {
        let html = HtmlReporter::new().render(&sample_run(Vec::new()));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("No actions were generated"));
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn test_description_is_escaped() {
        let html = HtmlReporter::new().render(&sample_run(Vec::new()));
        assert!(html.contains("Go to example.com &amp; &lt;check&gt; things"));
        assert!(!html.contains("<check>"));
    }

    #[test]
    fn test_step_detail_rendered() {
        let run = sample_run(vec![
            (
                Action::Navigate {
                    description: "Go to example.com".to_string(),
                    url: "https://example.com".to_string(),
                },
                ActionResult::ok("Navigated to https://example.com"),
            ),
            (
                Action::VerifyTextPresent {
                    description: "Check heading".to_string(),
                    text: "Example".to_string(),
                },
                ActionResult::fail("Text 'Example' not found on the page", Some("boom".to_string())),
            ),
        ]);
        let html = HtmlReporter::new().render(&run);
        assert!(html.contains("1 passed"));
        assert!(html.contains("1 failed"));
        assert!(html.contains("[navigate]"));
        assert!(html.contains("class=\"step failed\""));
        assert!(html.contains("boom"));
    }

    #[test]
    fn test_screenshot_referenced_by_file_name() {
        let run = sample_run(vec![(
            Action::Screenshot {
                description: "Capture".to_string(),
                name: None,
            },
            ActionResult::ok("Screenshot saved")
                .with_screenshot(std::path::PathBuf::from("/tmp/run_x/step_1.png")),
        )]);
        let html = HtmlReporter::new().render(&run);
        assert!(html.contains("src=\"step_1.png\""));
        assert!(!html.contains("/tmp/run_x"));
    }

    #[test]
    fn test_generate_writes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let run_dir = RunDir::in_dir(tmp.path().join("run_r"));
        run_dir.init().unwrap();
        let path = HtmlReporter::new()
            .generate(&sample_run(Vec::new()), &run_dir)
            .unwrap();
        assert!(path.exists());
        assert!(path.ends_with("report.html"));
    }
}
