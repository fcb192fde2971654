//! The `.atf` scenario file format.
//!
//! A plain-text authoring surface for test suites:
//!
//! ```text
//! # Suite Name
//! Description: what this suite covers
//! @config browser=chromium
//! @config headless=true
//!
//! ## Scenario: Login works
//! @tag smoke
//! Go to example.com/login
//! Type 'alice' into username field
//! Click login button
//! Verify page contains 'Welcome'
//! ```
//!
//! Step lines are free text, handed to the translator exactly like an ad
//! hoc description; each scenario maps to one independent run. Parsing is
//! lenient: unrecognized lines outside a scenario are ignored.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A parsed scenario file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestSuite {
    /// Suite title from the first `# ` line
    pub name: String,
    /// Text of the `Description:` line, if any
    pub description: Option<String>,
    /// Document-level `@config key=value` entries
    pub config: HashMap<String, String>,
    /// Scenarios in file order
    pub scenarios: Vec<Scenario>,
}

/// One scenario: a named, tagged sequence of free-text steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub tags: Vec<String>,
    pub steps: Vec<String>,
}

impl Scenario {
    /// The scenario's steps as one translator-ready description.
    pub fn description(&self) -> String {
        self.steps.join("\n")
    }

    /// Whether this scenario carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

impl TestSuite {
    /// Parse scenario-file text. Lenient: never fails, skips what it does
    /// not recognize.
    pub fn parse(text: &str) -> Self {
        let mut suite = TestSuite::default();
        let mut current: Option<Scenario> = None;

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(name) = line.strip_prefix("## Scenario:") {
                if let Some(done) = current.take() {
                    suite.scenarios.push(done);
                }
                current = Some(Scenario {
                    name: name.trim().to_string(),
                    ..Default::default()
                });
                continue;
            }

            if let Some(tag) = line.strip_prefix("@tag") {
                if let Some(scenario) = current.as_mut() {
                    let tag = tag.trim();
                    if !tag.is_empty() {
                        scenario.tags.push(tag.to_string());
                    }
                }
                continue;
            }

            if let Some(entry) = line.strip_prefix("@config") {
                // Document-level only; a stray @config inside a scenario is
                // ignored rather than silently changing suite behavior.
                if current.is_none() {
                    if let Some((key, value)) = entry.trim().split_once('=') {
                        suite
                            .config
                            .insert(key.trim().to_string(), value.trim().to_string());
                    }
                }
                continue;
            }

            if let Some(description) = line.strip_prefix("Description:") {
                if current.is_none() && suite.description.is_none() {
                    suite.description = Some(description.trim().to_string());
                }
                continue;
            }

            if let Some(title) = line.strip_prefix("# ") {
                if suite.name.is_empty() {
                    suite.name = title.trim().to_string();
                }
                continue;
            }
            if line.starts_with('#') {
                continue;
            }

            if let Some(scenario) = current.as_mut() {
                scenario.steps.push(line.to_string());
            }
        }

        if let Some(done) = current.take() {
            suite.scenarios.push(done);
        }

        suite
    }

    /// Load and parse a scenario file.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    /// Scenarios matching any of the given tags (all scenarios when the
    /// tag list is empty).
    pub fn scenarios_tagged(&self, tags: &[String]) -> Vec<&Scenario> {
        self.scenarios
            .iter()
            .filter(|s| tags.is_empty() || tags.iter().any(|t| s.has_tag(t)))
            .collect()
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Built-in scenario file templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Basic,
    Login,
    Ecommerce,
    Api,
}

impl TemplateKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "basic" => Some(TemplateKind::Basic),
            "login" => Some(TemplateKind::Login),
            "ecommerce" => Some(TemplateKind::Ecommerce),
            "api" => Some(TemplateKind::Api),
            _ => None,
        }
    }
}

/// The text of a built-in template.
pub fn template(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::Basic => BASIC_TEMPLATE,
        TemplateKind::Login => LOGIN_TEMPLATE,
        TemplateKind::Ecommerce => ECOMMERCE_TEMPLATE,
        TemplateKind::Api => API_TEMPLATE,
    }
}

/// Create a scenario file from a template.
///
/// Appends the `.atf` extension when missing. Returns `false` without
/// touching the file when it already exists and `overwrite` is not set.
pub fn create_template_file(
    output_path: impl AsRef<Path>,
    kind: TemplateKind,
    overwrite: bool,
) -> io::Result<bool> {
    let mut path = output_path.as_ref().to_path_buf();
    if path.extension().map(|e| e != "atf").unwrap_or(true) {
        let mut name = path.file_name().map(|f| f.to_os_string()).unwrap_or_default();
        name.push(".atf");
        path = path.with_file_name(name);
    }

    if path.exists() && !overwrite {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(&path, template(kind))?;
    Ok(true)
}

/// Path a template file would be written to (with the enforced extension).
pub fn template_file_path(output_path: impl AsRef<Path>) -> PathBuf {
    let path = output_path.as_ref().to_path_buf();
    if path.extension().map(|e| e == "atf").unwrap_or(false) {
        path
    } else {
        let mut name = path.file_name().map(|f| f.to_os_string()).unwrap_or_default();
        name.push(".atf");
        path.with_file_name(name)
    }
}

const BASIC_TEMPLATE: &str = "\
# Test Suite Name

Description: Brief description of what this test suite does

@config browser=chromium
@config headless=true

## Scenario: First Test
@tag smoke

Go to example.com
Verify page contains 'Example Domain'
Take a screenshot

## Scenario: Second Test

Add your test steps here...
";

const LOGIN_TEMPLATE: &str = "\
# Login Test Suite

Description: Test suite for user authentication flows

@config browser=chromium
@config headless=true

## Scenario: Successful Login
@tag smoke
@tag login

Go to YOUR_APP_URL/login
Type 'YOUR_USERNAME' into username field
Type 'YOUR_PASSWORD' into password field
Click login button
Verify page contains 'Welcome'
Take a screenshot named 'successful_login'

## Scenario: Invalid Credentials
@tag login
@tag negative

Go to YOUR_APP_URL/login
Type 'invalid_user' into username field
Type 'wrong_password' into password field
Click login button
Verify page contains 'Invalid credentials'
Take a screenshot

## Scenario: Empty Form Validation
@tag login
@tag validation

Go to YOUR_APP_URL/login
Click login button
Verify page contains 'required'
";

const ECOMMERCE_TEMPLATE: &str = "\
# E-Commerce Test Suite

Description: Test suite for shopping and checkout flows

@config browser=chromium
@config headless=true

## Scenario: Product Search
@tag smoke
@tag search

Go to YOUR_SHOP_URL
Type 'product name' into search box
Click search button
Verify page contains 'results'
Take a screenshot

## Scenario: Add to Cart
@tag cart

Go to YOUR_SHOP_URL
Click first product
Click 'Add to Cart' button
Verify page contains 'Added to cart'
Click cart icon
Verify page contains product name

## Scenario: Checkout Flow
@tag checkout
@tag critical

Go to YOUR_SHOP_URL/cart
Click 'Checkout' button
Type 'customer@email.com' into email field
Type '123 Main St' into address field
Click 'Continue' button
Verify page contains 'Payment'
";

const API_TEMPLATE: &str = "\
# API Integration Test Suite

Description: Test suite for API endpoints and integrations

@config browser=chromium
@config headless=true

## Scenario: User Registration Flow
@tag smoke
@tag registration

Go to YOUR_APP_URL/register
Type 'newuser@example.com' into email field
Type 'SecurePass123' into password field
Type 'SecurePass123' into confirm password field
Click register button
Verify page contains 'Registration successful'
Verify URL contains 'dashboard'

## Scenario: Profile Update
@tag profile

Go to YOUR_APP_URL/login
Type 'user@example.com' into email field
Type 'password' into password field
Click login button
Click 'Profile' link
Type 'Updated Name' into name field
Click 'Save' button
Verify page contains 'Profile updated'
";

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_basic_template() {
        let suite = TestSuite::parse(template(TemplateKind::Basic));
        assert_eq!(suite.name, "Test Suite Name");
        assert_eq!(
            suite.description.as_deref(),
            Some("Brief description of what this test suite does")
        );
        assert_eq!(suite.config.get("browser").map(String::as_str), Some("chromium"));
        assert_eq!(suite.config.get("headless").map(String::as_str), Some("true"));
        assert_eq!(suite.scenarios.len(), 2);

        let first = &suite.scenarios[0];
        assert_eq!(first.name, "First Test");
        assert_eq!(first.tags, vec!["smoke"]);
        assert_eq!(first.steps.len(), 3);
        assert_eq!(first.steps[0], "Go to example.com");
    }

    #[test]
    fn test_scenario_description_joins_steps() {
        let scenario = Scenario {
            name: "s".to_string(),
            tags: Vec::new(),
            steps: vec!["Go to example.com".to_string(), "Take a screenshot".to_string()],
        };
        assert_eq!(scenario.description(), "Go to example.com\nTake a screenshot");
    }

    #[test]
    fn test_parse_every_builtin_template() {
        for kind in [
            TemplateKind::Basic,
            TemplateKind::Login,
            TemplateKind::Ecommerce,
            TemplateKind::Api,
        ] {
            let suite = TestSuite::parse(template(kind));
            assert!(!suite.name.is_empty());
            assert!(!suite.scenarios.is_empty());
            for scenario in &suite.scenarios {
                assert!(!scenario.name.is_empty());
            }
        }
    }

    #[test]
    fn test_tag_filtering() {
        let suite = TestSuite::parse(template(TemplateKind::Login));
        let smoke = suite.scenarios_tagged(&["smoke".to_string()]);
        assert_eq!(smoke.len(), 1);
        assert_eq!(smoke[0].name, "Successful Login");

        let login = suite.scenarios_tagged(&["login".to_string()]);
        assert_eq!(login.len(), 3);

        let all = suite.scenarios_tagged(&[]);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_steps_outside_scenario_ignored() {
        let suite = TestSuite::parse("# T\nA stray step line\n## Scenario: S\nGo somewhere\n");
        assert_eq!(suite.scenarios.len(), 1);
        assert_eq!(suite.scenarios[0].steps, vec!["Go somewhere"]);
    }

    #[test]
    fn test_empty_input() {
        let suite = TestSuite::parse("");
        assert!(suite.name.is_empty());
        assert!(suite.scenarios.is_empty());
    }

    #[test]
    fn test_create_template_file_adds_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("my-suite");
        assert!(create_template_file(&target, TemplateKind::Basic, false).unwrap());

        let expected = tmp.path().join("my-suite.atf");
        assert!(expected.exists());

        // Existing file is left alone without overwrite
        assert!(!create_template_file(&target, TemplateKind::Login, false).unwrap());
        let content = std::fs::read_to_string(&expected).unwrap();
        assert!(content.starts_with("# Test Suite Name"));

        // Overwrite replaces it
        assert!(create_template_file(&target, TemplateKind::Login, true).unwrap());
        let content = std::fs::read_to_string(&expected).unwrap();
        assert!(content.starts_with("# Login Test Suite"));
    }

    #[test]
    fn test_template_file_path() {
        assert_eq!(template_file_path("suite"), PathBuf::from("suite.atf"));
        assert_eq!(template_file_path("suite.atf"), PathBuf::from("suite.atf"));
    }
}
