//! Step configuration (v0.1)
//!
//! A step definition is a small YAML document:
//!
//! ```yaml
//! credentials:
//!   api_key: sk-...          # or OPENAI_API_KEY from the environment
//!   base_url: ""             # empty = default endpoint
//! mode: per-record           # batch-once (default) | per-record
//! model: gpt-4o
//! script: |
//!   #{reply: openai.chat("Say hello to " + item.json.name)}
//! ```

use serde::Deserialize;

use crate::error::ScriptError;

/// Default OpenAI API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model for the script-facing client
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Credentials supplied by the host's credential store
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    /// OpenAI API key (required, non-empty)
    #[serde(default)]
    pub api_key: String,
    /// Optional custom base URL. Empty means the default endpoint.
    #[serde(default)]
    pub base_url: String,
}

/// How often the script runs per step invocation
///
/// Mode identifiers from earlier revisions of this step are accepted as
/// aliases so existing step definitions keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Run the script once, no matter how many input records there are
    #[default]
    #[serde(alias = "runOnceForAllItems")]
    BatchOnce,
    /// Run the script once per input record
    #[serde(alias = "runOnceForEachItem")]
    PerRecord,
}

/// One step invocation's configuration, fixed for its lifetime
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Script source text. Never mutated after parse.
    pub script: String,
    /// Default chat model override
    #[serde(default)]
    pub model: Option<String>,
}

impl StepConfig {
    /// Minimal configuration (used by hosts that assemble steps in code)
    pub fn new(api_key: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            credentials: Credentials {
                api_key: api_key.into(),
                base_url: String::new(),
            },
            mode: ExecutionMode::default(),
            script: script.into(),
            model: None,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Parse a YAML step definition, filling credentials from the
    /// environment when the document carries none.
    pub fn from_yaml(yaml: &str) -> Result<Self, ScriptError> {
        let mut config: StepConfig = serde_yaml::from_str(yaml)?;
        config.fill_from_env();
        Ok(config)
    }

    /// Fall back to `OPENAI_API_KEY` when the step carries no key of its own
    fn fill_from_env(&mut self) {
        if self.credentials.api_key.is_empty() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.credentials.api_key = key;
            }
        }
    }

    /// Check required fields. Called before any iteration runs.
    pub fn validate(&self) -> Result<(), ScriptError> {
        if self.credentials.api_key.trim().is_empty() {
            return Err(ScriptError::MissingApiKey);
        }
        if self.script.trim().is_empty() {
            return Err(ScriptError::EmptyScript);
        }
        Ok(())
    }

    /// Effective API base URL
    pub fn base_url(&self) -> &str {
        if self.credentials.base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            &self.credentials.base_url
        }
    }

    /// Effective default chat model
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}
