use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use std::collections::HashMap;

use agentest::atf::{self, TemplateKind, TestSuite};
use agentest::browser::BrowserKind;
use agentest::config;
use agentest::parser::{OpenAiParser, ParserConfig};
use agentest::runner::{ConsoleObserver, Run, RunnerConfig, SilentObserver, TestRunner};
use agentest::session::{self, RunDir};

/// Agentest - natural-language browser testing
#[derive(Parser, Debug)]
#[command(
    name = "agentest",
    about = "Run browser tests written in plain English",
    after_help = "ENVIRONMENT VARIABLES:\n\
        AGENTEST_API_ENDPOINT   Chat-completions endpoint URL\n\
        AGENTEST_API_KEY        API bearer token (falls back to OPENAI_API_KEY)\n\
        AGENTEST_MODEL          Model used for translation\n\
        AGENTEST_BROWSER        Browser engine: chromium, firefox, webkit\n\
        AGENTEST_OUTPUT_DIR     Base directory for run artifacts"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single test from a plain-English description
    Run {
        /// The test description, e.g. "Go to example.com and take a screenshot"
        description: String,

        /// Browser engine to use
        #[arg(long, env = "AGENTEST_BROWSER", default_value = "chromium")]
        browser: String,

        /// Show the browser window while the test runs
        #[arg(long)]
        headed: bool,

        /// Skip HTML report generation
        #[arg(long)]
        no_report: bool,

        /// Only capture screenshots the test asks for
        #[arg(long)]
        no_screenshots: bool,

        /// Output directory for run artifacts (default: AGENTEST_OUTPUT_DIR)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the sealed run as JSON instead of progress output
        #[arg(long)]
        json: bool,
    },

    /// Run every scenario in a .atf scenario file
    Suite {
        /// Path to the scenario file
        file: PathBuf,

        /// Only run scenarios carrying one of these tags (repeatable)
        #[arg(short, long)]
        tag: Vec<String>,

        /// Browser engine to use (overrides the suite's @config browser)
        #[arg(long, env = "AGENTEST_BROWSER")]
        browser: Option<String>,

        /// Show the browser window while tests run
        #[arg(long)]
        headed: bool,

        /// Skip HTML report generation
        #[arg(long)]
        no_report: bool,

        /// Output directory for run artifacts (default: AGENTEST_OUTPUT_DIR)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create a scenario file from a built-in template
    Template {
        /// Where to write the file (.atf extension is added if missing)
        path: PathBuf,

        /// Template to use: basic, login, ecommerce, api
        #[arg(short, long, default_value = "basic")]
        kind: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// List run directories under the output base
    List,

    /// Remove old run directories from the output base
    Clean {
        /// Remove runs older than this many hours
        #[arg(long, default_value = "24")]
        max_age_hours: u64,
    },
}

fn main() {
    let args = Args::parse();
    let code = match run_command(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };
    std::process::exit(code);
}

fn run_command(args: Args) -> Result<i32, Box<dyn Error>> {
    match args.command {
        Some(Commands::Run {
            description,
            browser,
            headed,
            no_report,
            no_screenshots,
            output,
            json,
        }) => {
            let runner = build_runner(&browser, headed, no_report, no_screenshots, output)?;

            let run = if json {
                runner.run_with_observer(&description, &mut SilentObserver)?
            } else {
                runner.run_with_observer(&description, &mut ConsoleObserver)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&run)?);
            }

            Ok(if run.passed() { 0 } else { 1 })
        }

        Some(Commands::Suite {
            file,
            tag,
            browser,
            headed,
            no_report,
            output,
        }) => {
            let suite = TestSuite::load(&file)?;
            let scenarios = suite.scenarios_tagged(&tag);
            if scenarios.is_empty() {
                println!("No scenarios matched in {}", file.display());
                return Ok(0);
            }

            // An explicit --browser flag (or AGENTEST_BROWSER) beats the
            // suite's @config; the suite beats the built-in default.
            let engine = resolve_engine(browser, &suite.config);
            let headless = !headed
                && suite
                    .config
                    .get("headless")
                    .map(|v| v != "false")
                    .unwrap_or(true);

            let runner = build_runner(&engine, !headless, no_report, false, output)?;

            if !suite.name.is_empty() {
                println!("Suite: {}", suite.name);
            }
            if let Some(description) = &suite.description {
                println!("{}", description);
            }

            let mut runs: Vec<(String, Run)> = Vec::new();
            let mut aborted = 0usize;
            for scenario in &scenarios {
                let result = runner.run_named(
                    &scenario.description(),
                    Some(&scenario.name),
                    &mut ConsoleObserver,
                );
                match result {
                    Ok(run) => runs.push((scenario.name.clone(), run)),
                    Err(e) => {
                        eprintln!("Scenario '{}' aborted: {}", scenario.name, e);
                        aborted += 1;
                    }
                }
            }

            let passed = runs.iter().filter(|(_, r)| r.passed()).count();
            let failed = runs.len() - passed;
            println!();
            println!("{}", "=".repeat(60));
            println!(
                "Suite complete: {} passed, {} failed, {} aborted of {} scenarios",
                passed,
                failed,
                aborted,
                scenarios.len()
            );
            for (name, run) in &runs {
                let status = if run.passed() { "ok" } else { "FAILED" };
                println!("  {}: {} ({}/{} steps passed)", status, name, run.successful, run.results.len());
            }
            println!("{}", "=".repeat(60));

            Ok(if failed == 0 && aborted == 0 { 0 } else { 1 })
        }

        Some(Commands::Template { path, kind, force }) => {
            let template_kind = TemplateKind::from_str(&kind).ok_or_else(|| {
                format!("Unknown template '{}'. Use: basic, login, ecommerce, api", kind)
            })?;

            if atf::create_template_file(&path, template_kind, force)? {
                println!("Created {}", atf::template_file_path(&path).display());
            } else {
                println!(
                    "{} already exists (use --force to overwrite)",
                    atf::template_file_path(&path).display()
                );
                return Ok(1);
            }
            Ok(0)
        }

        Some(Commands::List) => {
            let runs = session::list_runs()?;
            if runs.is_empty() {
                println!("No runs found");
                return Ok(0);
            }
            for dir in runs {
                let run_dir = RunDir::in_dir(&dir);
                let shots = run_dir.list_screenshots().map(|s| s.len()).unwrap_or(0);
                let report = if run_dir.report_path().exists() {
                    ", report"
                } else {
                    ""
                };
                println!("{}  ({} screenshots{})", dir.display(), shots, report);
            }
            Ok(0)
        }

        Some(Commands::Clean { max_age_hours }) => {
            let cleaned = session::cleanup_old_runs(Duration::from_secs(max_age_hours * 3600))?;
            println!("Removed {} old run director{}", cleaned, if cleaned == 1 { "y" } else { "ies" });
            Ok(0)
        }

        None => {
            println!("Agentest - run browser tests written in plain English");
            println!();
            println!("Usage: agentest <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run       Run a single test from a plain-English description");
            println!("  suite     Run every scenario in a .atf scenario file");
            println!("  template  Create a scenario file from a built-in template");
            println!("  list      List run directories under the output base");
            println!("  clean     Remove old run directories");
            println!();
            println!("Run with --help for more information.");
            Ok(0)
        }
    }
}

/// Pick the suite's browser engine: explicit flag first, then the suite's
/// `@config browser=...`, then the configured default.
fn resolve_engine(flag: Option<String>, suite_config: &HashMap<String, String>) -> String {
    flag.or_else(|| suite_config.get("browser").cloned())
        .unwrap_or_else(|| config::get().browser.engine.clone())
}

fn build_runner(
    browser: &str,
    headed: bool,
    no_report: bool,
    no_screenshots: bool,
    output: Option<PathBuf>,
) -> Result<TestRunner, Box<dyn Error>> {
    let kind = BrowserKind::from_str(browser)
        .ok_or_else(|| format!("Unknown browser '{}'. Use: chromium, firefox, webkit", browser))?;

    let mut config = RunnerConfig::default()
        .browser(kind)
        .headless(!headed)
        .generate_report(!no_report)
        .screenshot_all_steps(!no_screenshots);
    if let Some(dir) = output {
        config = config.output_dir(dir);
    }

    let parser = OpenAiParser::new(ParserConfig::default());
    Ok(TestRunner::new(Box::new(parser), config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_browser_flag_beats_suite_config() {
        let mut suite_config = HashMap::new();
        suite_config.insert("browser".to_string(), "webkit".to_string());

        // An explicit flag always wins, even when it names the default
        // engine.
        assert_eq!(
            resolve_engine(Some("chromium".to_string()), &suite_config),
            "chromium"
        );
        assert_eq!(
            resolve_engine(Some("firefox".to_string()), &suite_config),
            "firefox"
        );

        // No flag: the suite's @config applies.
        assert_eq!(resolve_engine(None, &suite_config), "webkit");

        // Neither: the configured default.
        let engine = resolve_engine(None, &HashMap::new());
        assert!(BrowserKind::from_str(&engine).is_some());
    }
}
