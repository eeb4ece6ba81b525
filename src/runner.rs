//! Execution driver - the per-invocation state machine (v0.1)
//!
//! Init resolves the mode, builds the SDK and HTTP clients, and compiles
//! the script once; iterations then run strictly in order, each over a
//! freshly assembled binding set and scope resolver. Iteration i+1 starts
//! only after iteration i has settled. The first failed iteration aborts
//! the whole step invocation; there is no partial-failure continuation and
//! no engine-level retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task;
use tracing::{debug, instrument};

use crate::bindings::BindingSet;
use crate::config::{ExecutionMode, StepConfig};
use crate::context::{DataProxySource, EmptyProxySource};
use crate::error::{ItemTag, ScriptError};
use crate::modules::HttpModule;
use crate::normalize;
use crate::openai::{ChatBackend, OpenAiClient, ScriptClient};
use crate::record::Record;
use crate::scope::ScopeResolver;
use crate::script::{CompiledScript, ScriptEngine};

/// Default timeout for script-issued HTTP requests (30 seconds)
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs one step invocation over a record sequence
pub struct StepRunner {
    config: StepConfig,
    proxy_source: Box<dyn DataProxySource>,
    backend: Option<Arc<dyn ChatBackend>>,
}

impl std::fmt::Debug for StepRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRunner")
            .field("config", &self.config)
            .field("backend", &self.backend.as_ref().map(|_| "<backend>"))
            .finish_non_exhaustive()
    }
}

impl StepRunner {
    /// Create a runner, failing fast on configuration the engine cannot
    /// run with.
    pub fn new(config: StepConfig) -> Result<Self, ScriptError> {
        config.validate()?;
        Ok(Self {
            config,
            proxy_source: Box::new(EmptyProxySource),
            backend: None,
        })
    }

    /// Replace the ambient data source (host capability)
    pub fn with_proxy_source(mut self, source: impl DataProxySource + 'static) -> Self {
        self.proxy_source = Box::new(source);
        self
    }

    /// Replace the chat backend (tests use a mock)
    pub fn with_backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Execute the step, yielding the normalized output sequence.
    ///
    /// Script evaluation blocks in place, so this must run on the
    /// multi-thread runtime.
    #[instrument(skip(self, records), fields(mode = ?self.config.mode, records = records.len()))]
    pub async fn run(&self, records: Vec<Record>) -> Result<Vec<Record>, ScriptError> {
        let handle = Handle::current();

        // Init: one client per step invocation, shared across iterations
        let backend: Arc<dyn ChatBackend> = match &self.backend {
            Some(backend) => Arc::clone(backend),
            None => Arc::new(
                OpenAiClient::new(self.config.credentials.api_key.clone())
                    .with_base_url(self.config.credentials.base_url.clone())
                    .with_model(self.config.model().to_string()),
            ),
        };
        let client = ScriptClient::new(backend, handle.clone());

        let http_client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("openai-script/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        let mut engine = ScriptEngine::new(HttpModule::new(http_client, handle));
        let compiled = engine.compile(&self.config.script)?;

        debug!("Script compiled, starting iterations");

        let mut output = Vec::new();
        match self.config.mode {
            ExecutionMode::BatchOnce => {
                let tag = ItemTag::batch();
                let bindings = BindingSet::for_batch(&client, &records)?;
                let resolver = ScopeResolver::new(bindings, self.proxy_source.data_proxy(0));
                let value = invoke(&mut engine, &compiled, resolver, tag)?;
                output.extend(normalize::normalize(value, tag)?);
            }
            ExecutionMode::PerRecord => {
                for index in 0..records.len() {
                    let tag = ItemTag::item(index);
                    let bindings = BindingSet::for_record(&client, &records, index)?;
                    let resolver =
                        ScopeResolver::new(bindings, self.proxy_source.data_proxy(index));
                    let value = invoke(&mut engine, &compiled, resolver, tag)?;
                    output.extend(normalize::normalize(value, tag)?);
                    debug!(index, total = records.len(), "Record iteration finished");
                }
            }
        }

        Ok(output)
    }
}

/// Run one iteration of the compiled unit and validate that it produced a
/// value. A unit return means the script fell off the end without an
/// explicit value; that is an error distinct from a script exception.
fn invoke(
    engine: &mut ScriptEngine,
    compiled: &CompiledScript,
    resolver: ScopeResolver,
    tag: ItemTag,
) -> Result<serde_json::Value, ScriptError> {
    let result = task::block_in_place(|| engine.eval(compiled, resolver))
        .map_err(|message| ScriptError::Runtime { message, tag })?;

    if result.is_unit() {
        return Err(ScriptError::NoResult { tag });
    }

    rhai::serde::from_dynamic(&result).map_err(|_| ScriptError::Normalize { tag })
}
