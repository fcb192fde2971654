//! The action vocabulary: executable test steps and their result records.
//!
//! `Action` is a closed set of step kinds. Instances arriving from the
//! translation service are untrusted and must go through
//! [`Action::from_value`], which rejects unknown kinds and missing fields
//! before anything reaches the executor. Adding a kind means: a variant
//! here, an arm in the executor, and a vocabulary update in the
//! translation prompt.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// One executable test step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Load a URL in the browser.
    Navigate { description: String, url: String },

    /// Click an element resolved from a locator hint.
    Click { description: String, target: String },

    /// Type text into an element resolved from a locator hint.
    TypeText {
        description: String,
        target: String,
        text: String,
    },

    /// Check that the page text contains a substring.
    VerifyTextPresent { description: String, text: String },

    /// Check that the current URL contains a substring.
    VerifyUrlContains {
        description: String,
        substring: String,
    },

    /// Pause for a number of seconds.
    Wait { description: String, seconds: f64 },

    /// Capture the current viewport to a PNG file.
    Screenshot {
        description: String,
        name: Option<String>,
    },

    /// Extract the text of an element into structured result data.
    ExtractData { description: String, target: String },
}

impl Action {
    /// Wire name of this action's kind (matches the serde tag).
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Navigate { .. } => "navigate",
            Action::Click { .. } => "click",
            Action::TypeText { .. } => "type_text",
            Action::VerifyTextPresent { .. } => "verify_text_present",
            Action::VerifyUrlContains { .. } => "verify_url_contains",
            Action::Wait { .. } => "wait",
            Action::Screenshot { .. } => "screenshot",
            Action::ExtractData { .. } => "extract_data",
        }
    }

    /// Human-readable label, always present.
    pub fn description(&self) -> &str {
        match self {
            Action::Navigate { description, .. }
            | Action::Click { description, .. }
            | Action::TypeText { description, .. }
            | Action::VerifyTextPresent { description, .. }
            | Action::VerifyUrlContains { description, .. }
            | Action::Wait { description, .. }
            | Action::Screenshot { description, .. }
            | Action::ExtractData { description, .. } => description,
        }
    }

    /// All kind names the translation service is allowed to emit.
    pub fn known_kinds() -> &'static [&'static str] {
        &[
            "navigate",
            "click",
            "type_text",
            "verify_text_present",
            "verify_url_contains",
            "wait",
            "screenshot",
            "extract_data",
        ]
    }

    /// Build an action from an untrusted JSON object, validating that the
    /// kind is known and every required field is present and non-empty.
    ///
    /// A missing `description` is synthesized from the kind and its fields
    /// so that every constructed action carries a usable label.
    pub fn from_value(value: &Value) -> Result<Self, MalformedAction> {
        let obj = value
            .as_object()
            .ok_or_else(|| MalformedAction::NotAnObject(value.to_string()))?;

        let kind = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| MalformedAction::MissingField {
                kind: "<unknown>".to_string(),
                field: "type",
            })?;

        let action = match kind {
            "navigate" => {
                let url = require_str(obj, kind, "url")?;
                Action::Navigate {
                    description: description_or(obj, format!("Navigate to {}", url)),
                    url,
                }
            }
            "click" => {
                let target = require_str(obj, kind, "target")?;
                Action::Click {
                    description: description_or(obj, format!("Click {}", target)),
                    target,
                }
            }
            "type_text" => {
                let target = require_str(obj, kind, "target")?;
                let text = require_str(obj, kind, "text")?;
                Action::TypeText {
                    description: description_or(obj, format!("Type '{}' into {}", text, target)),
                    target,
                    text,
                }
            }
            "verify_text_present" => {
                let text = require_str(obj, kind, "text")?;
                Action::VerifyTextPresent {
                    description: description_or(obj, format!("Verify page contains '{}'", text)),
                    text,
                }
            }
            "verify_url_contains" => {
                let substring = require_str(obj, kind, "substring")?;
                Action::VerifyUrlContains {
                    description: description_or(obj, format!("Verify URL contains '{}'", substring)),
                    substring,
                }
            }
            "wait" => {
                let seconds = obj
                    .get("seconds")
                    .and_then(|v| v.as_f64())
                    .ok_or(MalformedAction::MissingField {
                        kind: kind.to_string(),
                        field: "seconds",
                    })?;
                if !seconds.is_finite() || seconds < 0.0 {
                    return Err(MalformedAction::InvalidField {
                        kind: kind.to_string(),
                        field: "seconds",
                        reason: format!("must be a non-negative number, got {}", seconds),
                    });
                }
                Action::Wait {
                    description: description_or(obj, format!("Wait {} seconds", seconds)),
                    seconds,
                }
            }
            "screenshot" => {
                let name = obj
                    .get("name")
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| s.to_string());
                Action::Screenshot {
                    description: description_or(obj, "Take a screenshot".to_string()),
                    name,
                }
            }
            "extract_data" => {
                let target = require_str(obj, kind, "target")?;
                Action::ExtractData {
                    description: description_or(obj, format!("Extract data from {}", target)),
                    target,
                }
            }
            other => return Err(MalformedAction::UnknownKind(other.to_string())),
        };

        Ok(action)
    }
}

fn require_str(
    obj: &serde_json::Map<String, Value>,
    kind: &str,
    field: &'static str,
) -> Result<String, MalformedAction> {
    match obj.get(field).and_then(|v| v.as_str()) {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(MalformedAction::MissingField {
            kind: kind.to_string(),
            field,
        }),
    }
}

fn description_or(obj: &serde_json::Map<String, Value>, fallback: String) -> String {
    obj.get("description")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
        .unwrap_or(fallback)
}

/// Why a service-supplied action entry was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum MalformedAction {
    /// Entry was not a JSON object.
    NotAnObject(String),

    /// The `type` field names no known action kind.
    UnknownKind(String),

    /// A field required for this kind is absent or empty.
    MissingField { kind: String, field: &'static str },

    /// A field is present but its value is unusable.
    InvalidField {
        kind: String,
        field: &'static str,
        reason: String,
    },
}

impl std::fmt::Display for MalformedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedAction::NotAnObject(v) => write!(f, "action entry is not an object: {}", v),
            MalformedAction::UnknownKind(kind) => write!(f, "unknown action kind '{}'", kind),
            MalformedAction::MissingField { kind, field } => {
                write!(f, "action '{}' is missing required field '{}'", kind, field)
            }
            MalformedAction::InvalidField { kind, field, reason } => {
                write!(f, "action '{}' field '{}': {}", kind, field, reason)
            }
        }
    }
}

impl std::error::Error for MalformedAction {}

/// Outcome record for one executed action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// Whether the step succeeded.
    pub success: bool,

    /// Human-readable outcome summary.
    pub message: String,

    /// Failure detail, present when the step failed for an infrastructure
    /// reason (element not found, navigation timeout, ...). Plain
    /// verification mismatches carry no error.
    pub error: Option<String>,

    /// Captured screenshot, when requested or when capture-on-every-step
    /// is enabled.
    pub screenshot_path: Option<PathBuf>,

    /// Structured payload produced by extraction actions.
    pub extracted_data: Option<Value>,
}

impl ActionResult {
    /// Successful result with a summary message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
            screenshot_path: None,
            extracted_data: None,
        }
    }

    /// Failed result. `error` is the underlying failure detail, if any.
    pub fn fail(message: impl Into<String>, error: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error,
            screenshot_path: None,
            extracted_data: None,
        }
    }

    /// Attach a screenshot path.
    pub fn with_screenshot(mut self, path: PathBuf) -> Self {
        self.screenshot_path = Some(path);
        self
    }

    /// Attach extracted data.
    pub fn with_data(mut self, data: Value) -> Self {
        self.extracted_data = Some(data);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_navigate() {
        let action = Action::from_value(&json!({
            "type": "navigate",
            "description": "Go to example.com",
            "url": "https://example.com"
        }))
        .unwrap();
        assert_eq!(action.kind(), "navigate");
        assert_eq!(action.description(), "Go to example.com");
    }

    #[test]
    fn test_from_value_synthesizes_description() {
        let action = Action::from_value(&json!({
            "type": "click",
            "target": "login button"
        }))
        .unwrap();
        assert_eq!(action.description(), "Click login button");
    }

    #[test]
    fn test_from_value_unknown_kind() {
        let err = Action::from_value(&json!({"type": "hover", "target": "menu"})).unwrap_err();
        assert_eq!(err, MalformedAction::UnknownKind("hover".to_string()));
    }

    #[test]
    fn test_from_value_missing_field() {
        let err = Action::from_value(&json!({"type": "navigate"})).unwrap_err();
        assert_eq!(
            err,
            MalformedAction::MissingField {
                kind: "navigate".to_string(),
                field: "url"
            }
        );
    }

    #[test]
    fn test_from_value_empty_field_rejected() {
        let err = Action::from_value(&json!({"type": "click", "target": "  "})).unwrap_err();
        assert!(matches!(err, MalformedAction::MissingField { .. }));
    }

    #[test]
    fn test_from_value_negative_wait_rejected() {
        let err = Action::from_value(&json!({"type": "wait", "seconds": -1.0})).unwrap_err();
        assert!(matches!(err, MalformedAction::InvalidField { .. }));
    }

    #[test]
    fn test_from_value_not_an_object() {
        let err = Action::from_value(&json!("navigate")).unwrap_err();
        assert!(matches!(err, MalformedAction::NotAnObject(_)));
    }

    #[test]
    fn test_screenshot_name_optional() {
        let action = Action::from_value(&json!({"type": "screenshot"})).unwrap();
        assert_eq!(
            action,
            Action::Screenshot {
                description: "Take a screenshot".to_string(),
                name: None
            }
        );
    }

    #[test]
    fn test_serde_tag_roundtrip() {
        let action = Action::TypeText {
            description: "Type username".to_string(),
            target: "username field".to_string(),
            text: "alice".to_string(),
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], "type_text");
        let back: Action = serde_json::from_value(value).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn test_result_builders() {
        let result = ActionResult::ok("Clicked login button")
            .with_screenshot(PathBuf::from("step_1.png"))
            .with_data(json!({"value": 42}));
        assert!(result.success);
        assert!(result.error.is_none());
        assert_eq!(result.screenshot_path.unwrap(), PathBuf::from("step_1.png"));

        let failed = ActionResult::fail("Element not found", Some("no match for 'x'".to_string()));
        assert!(!failed.success);
        assert!(failed.error.is_some());
    }
}
