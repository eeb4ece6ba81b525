//! openai-script - pipeline step that runs user scripts against the OpenAI API
//!
//! Records in, user script (rhai) over a curated scope, records out.

pub mod bindings;
pub mod config;
pub mod context;
pub mod error;
pub mod modules;
pub mod normalize;
pub mod openai;
pub mod record;
pub mod runner;
pub mod scope;
pub mod script;

pub use bindings::BindingSet;
pub use config::{ExecutionMode, StepConfig};
pub use context::{DataProxy, DataProxySource, EmptyProxySource, StaticProxySource};
pub use error::{FixSuggestion, ItemTag, ScriptError};
pub use openai::{ChatBackend, MockChatBackend, OpenAiClient, ScriptClient};
pub use record::Record;
pub use runner::StepRunner;
pub use scope::ScopeResolver;
pub use script::{CompiledScript, ScriptEngine};
