use std::collections::HashMap;
use std::sync::Arc;

use crate::function::ServerFunction;

/// Configures a [`Registry`] at construction time.
pub struct ServerOption(Box<dyn FnOnce(&mut Registry) + Send>);

impl ServerOption {
    pub fn new(apply: impl FnOnce(&mut Registry) + Send + 'static) -> Self {
        Self(Box::new(apply))
    }
}

impl std::fmt::Debug for ServerOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ServerOption")
    }
}

/// Registers `function` under `name`.
pub fn with_function(name: impl Into<String>, function: impl ServerFunction + 'static) -> ServerOption {
    let name = name.into();
    let function: Arc<dyn ServerFunction> = Arc::new(function);
    ServerOption::new(move |registry| registry.register(name, function))
}

/// Name → server function mapping.
///
/// Built once from an ordered list of options and read-only afterwards, so
/// concurrent lookups need no locking.
#[derive(Default)]
pub struct Registry {
    functions: HashMap<String, Arc<dyn ServerFunction>>,
}

impl Registry {
    pub fn new(opts: impl IntoIterator<Item = ServerOption>) -> Self {
        let mut registry = Self::default();
        for ServerOption(apply) in opts {
            apply(&mut registry);
        }
        registry
    }

    /// Insert `function` under `name`. A later registration of the same name
    /// replaces the earlier one.
    pub fn register(&mut self, name: impl Into<String>, function: Arc<dyn ServerFunction>) {
        let name = name.into();
        if self.functions.insert(name.clone(), function).is_some() {
            tracing::debug!(function = %name, "Replacing previously registered server function");
        } else {
            tracing::debug!(function = %name, "Registered server function");
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Arc<dyn ServerFunction>> {
        self.functions.get(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("functions", &self.names())
            .finish()
    }
}
