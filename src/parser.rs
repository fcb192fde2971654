//! Natural-language to action-sequence translation.
//!
//! The translator is a thin adapter over an external OpenAI-compatible
//! chat-completions service. All the language understanding happens on the
//! other side of the wire; this module's job is the boundary: build a
//! prompt that constrains the response to the action vocabulary, and
//! validate the untrusted reply so a malformed entry can never reach the
//! executor.
//!
//! # Configuration
//!
//! Translator settings can be configured via environment variables:
//! - `AGENTEST_API_ENDPOINT`: chat-completions endpoint URL
//! - `AGENTEST_API_KEY` (or `OPENAI_API_KEY`): bearer token
//! - `AGENTEST_MODEL`: model name
//! - `AGENTEST_MAX_TOKENS`: max tokens in response
//! - `AGENTEST_CONNECT_TIMEOUT` / `AGENTEST_REQUEST_TIMEOUT`: seconds

use std::process::Command;

use crate::actions::Action;
use crate::config;

/// Result type for translation operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors that can occur during translation
#[derive(Debug)]
pub enum ParseError {
    /// Could not reach or authenticate against the translation service.
    /// The only translation error that is fatal to a run.
    ServiceUnavailable(String),
    /// The service delivered a reply, but not in the expected shape.
    /// Degraded to an empty action list at the parse boundary.
    InvalidResponse(String),
    /// IO error talking to the transport
    Io(std::io::Error),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::ServiceUnavailable(msg) => {
                write!(f, "Translation service unavailable: {}", msg)
            }
            ParseError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            ParseError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::Io(e)
    }
}

/// Translates a free-text test description into an ordered action sequence.
///
/// Implementations must return `Ok(vec![])` for descriptions that yield no
/// actionable steps; an empty sequence is a valid degenerate result, not an
/// error. Only unreachable-or-unauthorized service failures are errors.
pub trait ActionParser {
    /// Translate, collecting diagnostics (dropped entries, unusable
    /// content) into `notes` so the caller decides where they surface.
    fn parse_with_notes(
        &self,
        description: &str,
        notes: &mut Vec<String>,
    ) -> ParseResult<Vec<Action>>;

    /// Translate, printing diagnostics to stderr.
    fn parse(&self, description: &str) -> ParseResult<Vec<Action>> {
        let mut notes = Vec::new();
        let actions = self.parse_with_notes(description, &mut notes)?;
        for note in &notes {
            eprintln!("{}", note);
        }
        Ok(actions)
    }
}

/// Configuration for the OpenAI-compatible translator
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Chat-completions endpoint URL
    pub endpoint: String,
    /// Bearer token, if the endpoint requires one
    pub api_key: Option<String>,
    /// Model name to use
    pub model: String,
    /// Maximum tokens in the response
    pub max_tokens: u32,
    /// Timeout for initial connection (seconds)
    pub connect_timeout: u64,
    /// Timeout for the whole request (seconds)
    pub request_timeout: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        let cfg = config::get();
        Self {
            endpoint: cfg.api.endpoint.clone(),
            api_key: cfg.api.api_key.clone(),
            model: cfg.api.model.clone(),
            max_tokens: cfg.api.max_tokens,
            connect_timeout: cfg.api.connect_timeout,
            request_timeout: cfg.api.request_timeout,
        }
    }
}

impl ParserConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout = seconds;
        self
    }
}

/// Translator backed by an OpenAI-compatible chat-completions endpoint
#[derive(Debug, Clone, Default)]
pub struct OpenAiParser {
    config: ParserConfig,
}

impl OpenAiParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }
}

impl ActionParser for OpenAiParser {
    fn parse_with_notes(
        &self,
        description: &str,
        notes: &mut Vec<String>,
    ) -> ParseResult<Vec<Action>> {
        if description.trim().is_empty() {
            return Ok(Vec::new());
        }

        let body = send_request(&self.config, description)?;
        actions_from_body(&body, notes)
    }
}

/// Extract validated actions from a raw service reply.
///
/// A reply the service did deliver but shaped wrong is a data-quality
/// problem, not an outage: it degrades to an empty action list with a
/// diagnostic. Only an explicit service error body stays fatal.
fn actions_from_body(body: &[u8], notes: &mut Vec<String>) -> ParseResult<Vec<Action>> {
    let content = match content_from_response(body) {
        Ok(content) => content,
        Err(ParseError::InvalidResponse(msg)) => {
            notes.push(format!("Warning: unusable translation reply: {}", msg));
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let (actions, dropped) = parse_actions_payload(&content, notes);
    if dropped > 0 {
        notes.push(format!(
            "Warning: dropped {} malformed action entr{} from the translation response",
            dropped,
            if dropped == 1 { "y" } else { "ies" }
        ));
    }
    Ok(actions)
}

/// Send the translation request and return the raw response body.
fn send_request(config: &ParserConfig, description: &str) -> ParseResult<Vec<u8>> {
    let request = serde_json::json!({
        "model": config.model,
        "messages": [
            { "role": "system", "content": build_translation_prompt() },
            { "role": "user", "content": description }
        ],
        "max_tokens": config.max_tokens,
        "temperature": 0,
        "response_format": { "type": "json_object" }
    });

    let request_json = serde_json::to_string(&request)
        .map_err(|e| ParseError::InvalidResponse(e.to_string()))?;

    let mut args = vec![
        "-s".to_string(),
        "-X".to_string(),
        "POST".to_string(),
        config.endpoint.clone(),
        "-H".to_string(),
        "Content-Type: application/json".to_string(),
    ];
    if let Some(key) = &config.api_key {
        args.push("-H".to_string());
        args.push(format!("Authorization: Bearer {}", key));
    }
    args.push("-d".to_string());
    args.push(request_json);
    args.push("--connect-timeout".to_string());
    args.push(config.connect_timeout.to_string());
    args.push("--max-time".to_string());
    args.push(config.request_timeout.to_string());

    let output = Command::new("curl").args(&args).output()?;

    if !output.status.success() {
        return Err(ParseError::ServiceUnavailable(format!(
            "request to {} failed: {}",
            config.endpoint,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(output.stdout)
}

/// Pull the assistant message content out of a response body.
///
/// An OpenAI-style error body means the service rejected us (bad key,
/// quota, unknown model) and maps to `ServiceUnavailable`; a body that is
/// not JSON or carries no content maps to `InvalidResponse`.
fn content_from_response(body: &[u8]) -> ParseResult<String> {
    let response: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ParseError::InvalidResponse(format!("response is not JSON: {}", e)))?;

    if let Some(error) = response.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown service error");
        return Err(ParseError::ServiceUnavailable(message.to_string()));
    }

    let content = response["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| {
            ParseError::InvalidResponse("response carries no message content".to_string())
        })?;

    Ok(content.to_string())
}

/// Extract validated actions from the assistant message content.
///
/// Accepts `{"actions": [...]}` or a bare JSON array. Entries that fail
/// validation are dropped; the count of dropped entries is returned and
/// the detail lands in `notes`. Content that is not an action payload at
/// all yields an empty list -- only connectivity failures are fatal to a
/// run.
pub fn parse_actions_payload(content: &str, notes: &mut Vec<String>) -> (Vec<Action>, usize) {
    let value: serde_json::Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(e) => {
            notes.push(format!("Warning: translation content is not JSON: {}", e));
            return (Vec::new(), 0);
        }
    };

    let entries = match &value {
        serde_json::Value::Array(items) => items.as_slice(),
        serde_json::Value::Object(map) => match map.get("actions").and_then(|a| a.as_array()) {
            Some(items) => items.as_slice(),
            None => {
                notes.push("Warning: translation content carries no 'actions' array".to_string());
                return (Vec::new(), 0);
            }
        },
        _ => {
            notes.push("Warning: translation content is not an action payload".to_string());
            return (Vec::new(), 0);
        }
    };

    let mut actions = Vec::new();
    let mut dropped = 0;
    for entry in entries {
        match Action::from_value(entry) {
            Ok(action) => actions.push(action),
            Err(e) => {
                notes.push(format!("Warning: dropping action entry: {}", e));
                dropped += 1;
            }
        }
    }

    (actions, dropped)
}

/// Build the system prompt constraining the response to the action vocabulary.
pub fn build_translation_prompt() -> String {
    format!(
        "You convert natural-language browser test descriptions into JSON.\n\
         Respond with a JSON object of the form {{\"actions\": [...]}} and nothing else.\n\
         Each action is an object with a \"type\" field and the fields required for that type:\n\
         - navigate: url\n\
         - click: target (a plain-language hint for the element, e.g. \"login button\")\n\
         - type_text: target, text\n\
         - verify_text_present: text\n\
         - verify_url_contains: substring\n\
         - wait: seconds\n\
         - screenshot: name (optional)\n\
         - extract_data: target\n\
         Every action should also carry a short human-readable \"description\".\n\
         Only these types are allowed: {}.\n\
         Keep actions in the order the user describes them.\n\n\
         Example request: \"Go to example.com and take a screenshot\"\n\
         Example response:\n\
         {{\"actions\": [\n\
           {{\"type\": \"navigate\", \"description\": \"Go to example.com\", \"url\": \"https://example.com\"}},\n\
           {{\"type\": \"screenshot\", \"description\": \"Capture the page\"}}\n\
         ]}}\n\n\
         Example request: \"Log in as bob and check the greeting\"\n\
         Example response:\n\
         {{\"actions\": [\n\
           {{\"type\": \"type_text\", \"description\": \"Enter the username\", \"target\": \"username field\", \"text\": \"bob\"}},\n\
           {{\"type\": \"click\", \"description\": \"Submit the login form\", \"target\": \"login button\"}},\n\
           {{\"type\": \"verify_text_present\", \"description\": \"Check the greeting\", \"text\": \"Welcome, bob\"}}\n\
         ]}}",
        Action::known_kinds().join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prompt_names_every_kind() {
        let prompt = build_translation_prompt();
        for kind in Action::known_kinds() {
            assert!(prompt.contains(kind), "prompt is missing kind '{}'", kind);
        }
    }

    #[test]
    fn test_payload_object_form() {
        let (actions, dropped) = parse_actions_payload(
            r#"{"actions": [
                {"type": "navigate", "url": "https://example.com"},
                {"type": "screenshot"}
            ]}"#,
            &mut Vec::new(),
        );
        assert_eq!(dropped, 0);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].kind(), "navigate");
        assert_eq!(actions[1].kind(), "screenshot");
    }

    #[test]
    fn test_payload_bare_array() {
        let (actions, dropped) = parse_actions_payload(
            r#"[{"type": "verify_text_present", "text": "Welcome"}]"#,
            &mut Vec::new(),
        );
        assert_eq!(dropped, 0);
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn test_payload_drops_malformed_entries() {
        let mut notes = Vec::new();
        let (actions, dropped) = parse_actions_payload(
            r#"{"actions": [
                {"type": "navigate", "url": "https://example.com"},
                {"type": "hover", "target": "menu"},
                {"type": "click"},
                {"type": "click", "target": "login button"}
            ]}"#,
            &mut notes,
        );
        assert_eq!(dropped, 2);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].kind(), "navigate");
        assert_eq!(actions[1].kind(), "click");
        assert_eq!(notes.len(), 2, "one note per dropped entry");
        assert!(notes[0].contains("hover"));
    }

    #[test]
    fn test_payload_garbage_is_empty_not_fatal() {
        let mut notes = Vec::new();
        let (actions, dropped) =
            parse_actions_payload("the model rambled instead of emitting JSON", &mut notes);
        assert!(actions.is_empty());
        assert_eq!(dropped, 0);
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn test_payload_preserves_order() {
        let (actions, _) = parse_actions_payload(
            r#"{"actions": [
                {"type": "navigate", "url": "a"},
                {"type": "wait", "seconds": 1},
                {"type": "screenshot", "name": "end"}
            ]}"#,
            &mut Vec::new(),
        );
        let kinds: Vec<_> = actions.iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, vec!["navigate", "wait", "screenshot"]);
    }

    #[test]
    fn test_response_classification() {
        // Explicit service rejection stays fatal.
        let err = content_from_response(
            br#"{"error": {"message": "Incorrect API key provided"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::ServiceUnavailable(msg)
            if msg.contains("Incorrect API key")));

        // Delivered but shaped wrong is InvalidResponse.
        let err = content_from_response(b"<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, ParseError::InvalidResponse(_)));

        let err = content_from_response(br#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, ParseError::InvalidResponse(_)));

        let content = content_from_response(
            br#"{"choices": [{"message": {"content": "{\"actions\": []}"}}]}"#,
        )
        .unwrap();
        assert_eq!(content, r#"{"actions": []}"#);
    }

    #[test]
    fn test_malformed_reply_degrades_to_empty_list() {
        // A reply the service delivered but shaped wrong must not abort
        // the run; it becomes an empty action list plus a diagnostic.
        let mut notes = Vec::new();
        let actions = actions_from_body(b"<html>oops</html>", &mut notes).unwrap();
        assert!(actions.is_empty());
        assert_eq!(notes.len(), 1);
        assert!(notes[0].contains("unusable translation reply"));

        let mut notes = Vec::new();
        let actions = actions_from_body(br#"{"choices": []}"#, &mut notes).unwrap();
        assert!(actions.is_empty());
        assert!(notes[0].contains("no message content"));

        // An error body still aborts.
        let err = actions_from_body(
            br#"{"error": {"message": "quota exceeded"}}"#,
            &mut Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_good_reply_yields_actions_and_drop_summary() {
        let mut notes = Vec::new();
        let body = serde_json::json!({
            "choices": [{"message": {"content":
                r#"{"actions": [
                    {"type": "navigate", "url": "https://example.com"},
                    {"type": "hover", "target": "menu"}
                ]}"#
            }}]
        });
        let actions =
            actions_from_body(&serde_json::to_vec(&body).unwrap(), &mut notes).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind(), "navigate");
        // One note for the dropped entry, one summary.
        assert_eq!(notes.len(), 2);
        assert!(notes[1].contains("dropped 1 malformed action entry"));
    }

    #[test]
    fn test_empty_description_skips_service() {
        // Endpoint is unreachable on purpose: an empty description must not
        // produce a network call at all.
        let parser = OpenAiParser::new(ParserConfig::new("http://127.0.0.1:1/unreachable"));
        let actions = parser.parse("   ").unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn test_parser_config_builder() {
        let config = ParserConfig::new("http://localhost:8080/v1/chat/completions")
            .model("llama3")
            .api_key("sk-test")
            .max_tokens(500)
            .request_timeout(30);

        assert_eq!(config.endpoint, "http://localhost:8080/v1/chat/completions");
        assert_eq!(config.model, "llama3");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.max_tokens, 500);
        assert_eq!(config.request_timeout, 30);
    }
}
