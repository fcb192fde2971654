//! Configuration management with environment variable support.
//!
//! Centralized configuration for agentest, supporting:
//! - Environment variables for all configurable values
//! - Sensible defaults
//! - Builder-style per-component configs layered on top
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AGENTEST_API_ENDPOINT` | Chat-completions endpoint URL | `https://api.openai.com/v1/chat/completions` |
//! | `AGENTEST_API_KEY` | API key for the translation service | (none) |
//! | `AGENTEST_MODEL` | Model name | `gpt-4o-mini` |
//! | `AGENTEST_MAX_TOKENS` | Maximum tokens in the response | `1000` |
//! | `AGENTEST_CONNECT_TIMEOUT` | Connection timeout in seconds | `10` |
//! | `AGENTEST_REQUEST_TIMEOUT` | Whole-request timeout in seconds | `120` |
//! | `AGENTEST_OUTPUT_DIR` | Base directory for run artifacts | `./test-results` |
//! | `AGENTEST_BROWSER` | Browser engine (chromium/firefox/webkit) | `chromium` |
//! | `AGENTEST_ACTION_TIMEOUT_MS` | Per-action browser timeout (ms) | `10000` |
//! | `AGENTEST_NAVIGATION_TIMEOUT_MS` | Navigation timeout (ms) | `30000` |
//!
//! # Example
//!
//! ```bash
//! # Point at a local OpenAI-compatible server
//! export AGENTEST_API_ENDPOINT="http://127.0.0.1:8080/v1/chat/completions"
//! export AGENTEST_MODEL="llama3"
//!
//! # Collect artifacts somewhere else
//! export AGENTEST_OUTPUT_DIR="/var/tmp/agentest-runs"
//! ```

use std::env;
use std::sync::OnceLock;

// ============================================================================
// Default Values
// ============================================================================

/// Default translation-service endpoint
pub const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default model name
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default max tokens for translation responses
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Default connection timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

/// Default whole-request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 120;

/// Default base directory for run artifacts
pub const DEFAULT_OUTPUT_DIR: &str = "./test-results";

/// Default browser engine
pub const DEFAULT_BROWSER: &str = "chromium";

/// Default per-action browser timeout (milliseconds)
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 10_000;

/// Default navigation timeout (milliseconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the translation-service endpoint
pub const ENV_API_ENDPOINT: &str = "AGENTEST_API_ENDPOINT";

/// Environment variable for the API key
pub const ENV_API_KEY: &str = "AGENTEST_API_KEY";

/// Environment variable for the model name
pub const ENV_MODEL: &str = "AGENTEST_MODEL";

/// Environment variable for max tokens
pub const ENV_MAX_TOKENS: &str = "AGENTEST_MAX_TOKENS";

/// Environment variable for the connection timeout
pub const ENV_CONNECT_TIMEOUT: &str = "AGENTEST_CONNECT_TIMEOUT";

/// Environment variable for the whole-request timeout
pub const ENV_REQUEST_TIMEOUT: &str = "AGENTEST_REQUEST_TIMEOUT";

/// Environment variable for the artifact output directory
pub const ENV_OUTPUT_DIR: &str = "AGENTEST_OUTPUT_DIR";

/// Environment variable for the browser engine
pub const ENV_BROWSER: &str = "AGENTEST_BROWSER";

/// Environment variable for the per-action browser timeout
pub const ENV_ACTION_TIMEOUT_MS: &str = "AGENTEST_ACTION_TIMEOUT_MS";

/// Environment variable for the navigation timeout
pub const ENV_NAVIGATION_TIMEOUT_MS: &str = "AGENTEST_NAVIGATION_TIMEOUT_MS";

// ============================================================================
// Legacy Environment Variable Support
// ============================================================================

/// Legacy API key variable honored for OpenAI compatibility
pub const ENV_API_KEY_LEGACY: &str = "OPENAI_API_KEY";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for agentest
#[derive(Debug, Clone)]
pub struct Config {
    /// Translation-service settings
    pub api: ApiSettings,
    /// Browser settings
    pub browser: BrowserSettings,
    /// Artifact output settings
    pub output: OutputSettings,
}

/// Translation-service settings
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Chat-completions endpoint URL
    pub endpoint: String,
    /// API key, if the endpoint requires one
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// Maximum tokens in the response
    pub max_tokens: u32,
    /// Connection timeout (seconds)
    pub connect_timeout: u64,
    /// Whole-request timeout (seconds)
    pub request_timeout: u64,
}

/// Browser settings
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Browser engine name (chromium, firefox, webkit)
    pub engine: String,
    /// Per-action timeout (milliseconds)
    pub action_timeout_ms: u64,
    /// Navigation timeout (milliseconds)
    pub navigation_timeout_ms: u64,
}

/// Artifact output settings
#[derive(Debug, Clone)]
pub struct OutputSettings {
    /// Base directory for run artifacts
    pub base_dir: String,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            api: ApiSettings::from_env(),
            browser: BrowserSettings::from_env(),
            output: OutputSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            api: ApiSettings::defaults(),
            browser: BrowserSettings::defaults(),
            output: OutputSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ApiSettings {
    /// Create API settings from environment variables
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var(ENV_API_ENDPOINT)
                .unwrap_or_else(|_| DEFAULT_API_ENDPOINT.to_string()),
            api_key: env::var(ENV_API_KEY)
                .or_else(|_| env::var(ENV_API_KEY_LEGACY))
                .ok()
                .filter(|k| !k.is_empty()),
            model: env::var(ENV_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            max_tokens: env::var(ENV_MAX_TOKENS)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_TOKENS),
            connect_timeout: env::var(ENV_CONNECT_TIMEOUT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            request_timeout: env::var(ENV_REQUEST_TIMEOUT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        }
    }

    /// Create API settings with defaults
    pub fn defaults() -> Self {
        Self {
            endpoint: DEFAULT_API_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl BrowserSettings {
    /// Create browser settings from environment variables
    pub fn from_env() -> Self {
        Self {
            engine: env::var(ENV_BROWSER).unwrap_or_else(|_| DEFAULT_BROWSER.to_string()),
            action_timeout_ms: env::var(ENV_ACTION_TIMEOUT_MS)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_ACTION_TIMEOUT_MS),
            navigation_timeout_ms: env::var(ENV_NAVIGATION_TIMEOUT_MS)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_NAVIGATION_TIMEOUT_MS),
        }
    }

    /// Create browser settings with defaults
    pub fn defaults() -> Self {
        Self {
            engine: DEFAULT_BROWSER.to_string(),
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
        }
    }
}

impl OutputSettings {
    /// Create output settings from environment variables
    pub fn from_env() -> Self {
        Self {
            base_dir: env::var(ENV_OUTPUT_DIR).unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.to_string()),
        }
    }

    /// Create output settings with defaults
    pub fn defaults() -> Self {
        Self {
            base_dir: DEFAULT_OUTPUT_DIR.to_string(),
        }
    }
}

// ============================================================================
// Convenience Functions
// ============================================================================

/// Get the artifact base directory (convenience function)
pub fn output_base_dir() -> String {
    get().output.base_dir.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert_eq!(config.api.endpoint, DEFAULT_API_ENDPOINT);
        assert_eq!(config.api.model, DEFAULT_MODEL);
        assert_eq!(config.api.api_key, None);
        assert_eq!(config.browser.engine, DEFAULT_BROWSER);
        assert_eq!(config.output.base_dir, DEFAULT_OUTPUT_DIR);
    }

    #[test]
    fn test_timeout_defaults() {
        let config = Config::defaults();
        assert_eq!(config.browser.action_timeout_ms, DEFAULT_ACTION_TIMEOUT_MS);
        assert_eq!(
            config.browser.navigation_timeout_ms,
            DEFAULT_NAVIGATION_TIMEOUT_MS
        );
        assert_eq!(config.api.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
    }
}
