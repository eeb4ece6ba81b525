//! Scope resolver - the ordered name-lookup chain for compiled scripts
//!
//! Free identifiers inside a user script resolve through three tiers:
//! the binding set, then the host's ambient data proxy, then the
//! interpreter's own environment (locals, constants, registered functions).
//! The resolver answers "not mine" for names it does not hold, so unknown
//! names fall through instead of failing here; an identifier nothing
//! recognizes surfaces as the interpreter's own undefined-variable error.

use rhai::Dynamic;
use tracing::warn;

use crate::bindings::BindingSet;
use crate::context::DataProxy;

/// One iteration's lookup surface. Rebuilt fresh per iteration; never
/// cached across records.
pub struct ScopeResolver {
    bindings: BindingSet,
    proxy: DataProxy,
}

impl ScopeResolver {
    pub fn new(bindings: BindingSet, proxy: DataProxy) -> Self {
        Self { bindings, proxy }
    }

    /// Resolve a free identifier. `None` defers to the interpreter.
    pub fn resolve(&self, name: &str) -> Option<Dynamic> {
        if let Some(value) = self.bindings.get(name) {
            return Some(value.clone());
        }
        let value = self.proxy.get(name)?;
        match rhai::serde::to_dynamic(value) {
            Ok(dynamic) => Some(dynamic),
            Err(e) => {
                warn!(name, error = %e, "Ambient value could not cross into the script");
                None
            }
        }
    }
}
