//! Error types with fix suggestions

use std::fmt;

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Attribution of a failure to the input record it occurred on.
///
/// Batch invocations carry no index; per-record invocations are tagged with
/// the 0-based index of the record whose iteration failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemTag(Option<usize>);

impl ItemTag {
    /// Untagged (batch mode)
    pub fn batch() -> Self {
        Self(None)
    }

    /// Tagged with a record index (per-record mode)
    pub fn item(index: usize) -> Self {
        Self(Some(index))
    }

    pub fn index(&self) -> Option<usize> {
        self.0
    }
}

impl fmt::Display for ItemTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(index) => write!(f, " [item {}]", index),
            None => Ok(()),
        }
    }
}

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum ScriptError {
    // ─────────────────────────────────────────────────────────────
    // Configuration errors (OAS-001 to OAS-002): reported before
    // any iteration runs
    // ─────────────────────────────────────────────────────────────
    #[error("OAS-001: Missing OpenAI API key")]
    MissingApiKey,

    #[error("OAS-002: Script is empty")]
    EmptyScript,

    // ─────────────────────────────────────────────────────────────
    // Compilation errors (OAS-010): structural, before any iteration
    // ─────────────────────────────────────────────────────────────
    #[error("OAS-010: Script compilation failed: {details}")]
    Compile { details: String },

    // ─────────────────────────────────────────────────────────────
    // Execution errors (OAS-020 to OAS-030): abort the whole step
    // ─────────────────────────────────────────────────────────────
    #[error("OAS-020: Script error{tag}: {message}")]
    Runtime { message: String, tag: ItemTag },

    #[error("OAS-021: No data was returned from the script{tag}")]
    NoResult { tag: ItemTag },

    #[error("OAS-030: The script result could not be converted into items{tag}")]
    Normalize { tag: ItemTag },

    // ─────────────────────────────────────────────────────────────
    // Host plumbing
    // ─────────────────────────────────────────────────────────────
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScriptError {
    /// Index of the input record this error is attributed to, if any
    pub fn item_index(&self) -> Option<usize> {
        match self {
            ScriptError::Runtime { tag, .. }
            | ScriptError::NoResult { tag }
            | ScriptError::Normalize { tag } => tag.index(),
            _ => None,
        }
    }
}

impl FixSuggestion for ScriptError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            ScriptError::MissingApiKey => {
                Some("Set credentials.api_key in the step definition or the OPENAI_API_KEY env var")
            }
            ScriptError::EmptyScript => Some("Provide a script body that returns an object or an array"),
            ScriptError::Compile { .. } => Some("Check the script syntax; the step never ran"),
            ScriptError::Runtime { .. } => Some("The error comes from the script itself; check the reported line"),
            ScriptError::NoResult { .. } => {
                Some("End the script with the value to emit, e.g. `#{ok: true}`")
            }
            ScriptError::Normalize { .. } => {
                Some("Return an object or an array of objects, not a bare primitive")
            }
            ScriptError::Yaml(_) => Some("Check YAML syntax: indentation and quoting"),
            ScriptError::Json(_) => Some("Input records must be a JSON array of objects"),
            ScriptError::Io(_) => Some("Check file path and permissions"),
        }
    }
}
