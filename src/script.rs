//! Script compiler - the embedded-interpreter boundary
//!
//! Synthesizing a callable from raw text at run time only exists inside an
//! interpreter, so the mechanism is isolated here: the rhai engine is built
//! once per step invocation with the host surface registered and resource
//! limits applied, the script text is compiled once, and the compiled unit
//! is evaluated with a fresh scope resolver per iteration. Parse failures
//! are structural and never reach an iteration.

use std::rc::Rc;

use rhai::{Dynamic, Engine, Scope, AST};

use crate::error::ScriptError;
use crate::modules::{self, HttpModule};
use crate::openai::ScriptClient;
use crate::scope::ScopeResolver;

// Engine limits: the script is unreviewed text.
const MAX_OPERATIONS: u64 = 10_000_000;
const MAX_CALL_LEVELS: usize = 64;
const MAX_STRING_SIZE: usize = 1 << 20;
const MAX_ARRAY_SIZE: usize = 100_000;
const MAX_MAP_SIZE: usize = 100_000;
const MAX_EXPR_DEPTH: usize = 64;

/// A reusable unit of logic compiled from script text. Independent of
/// iteration state; invoke it as many times as there are records.
#[derive(Debug)]
pub struct CompiledScript {
    ast: AST,
}

/// The interpreter for one step invocation
pub struct ScriptEngine {
    engine: Engine,
}

impl ScriptEngine {
    pub fn new(http: HttpModule) -> Self {
        let mut engine = Engine::new();

        engine.set_max_call_levels(MAX_CALL_LEVELS);
        engine.set_max_operations(MAX_OPERATIONS);
        engine.set_max_string_size(MAX_STRING_SIZE);
        engine.set_max_array_size(MAX_ARRAY_SIZE);
        engine.set_max_map_size(MAX_MAP_SIZE);
        engine.set_max_expr_depths(MAX_EXPR_DEPTH, MAX_EXPR_DEPTH);

        ScriptClient::register(&mut engine);
        modules::register(&mut engine, http);

        Self { engine }
    }

    /// Turn raw script text into a reusable compiled unit
    pub fn compile(&self, script: &str) -> Result<CompiledScript, ScriptError> {
        let ast = self
            .engine
            .compile(script)
            .map_err(|e| ScriptError::Compile {
                details: e.to_string(),
            })?;
        Ok(CompiledScript { ast })
    }

    /// Run the compiled unit once, with free-variable lookups routed
    /// through `resolver`. The previous iteration's resolver is replaced,
    /// never reused. The raw interpreter message is returned for the
    /// caller to attribute to a record.
    pub fn eval(
        &mut self,
        script: &CompiledScript,
        resolver: ScopeResolver,
    ) -> Result<Dynamic, String> {
        let resolver = Rc::new(resolver);
        self.engine
            .on_var(move |name, _index, _context| Ok(resolver.resolve(name)));

        let mut scope = Scope::new();
        self.engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &script.ast)
            .map_err(|e| e.to_string())
    }
}
