//! Script registry
//!
//! Persisted frames refer to scripts by name. The registry maps those names
//! back to scripts when a call stack is restored on the next turn.

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::RegistryError;
use crate::script::{Command, Script};

#[derive(Debug, Clone, Default)]
pub struct ScriptRegistry {
    scripts: HashMap<String, Arc<Script>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a script and, transitively, every script it calls
    ///
    /// Registering the same `Arc` twice is a no-op; a different script under an
    /// existing name is rejected.
    pub fn register(&mut self, script: Arc<Script>) -> Result<(), RegistryError> {
        let mut pending = vec![script];

        while let Some(script) = pending.pop() {
            if let Some(existing) = self.scripts.get(script.name()) {
                if Arc::ptr_eq(existing, &script) {
                    continue;
                }
                return Err(RegistryError::DuplicateScript(script.name().to_string()));
            }

            for command in script.commands() {
                if let Command::Call { script: child, .. } = command {
                    pending.push(child.clone());
                }
            }

            self.scripts.insert(script.name().to_string(), script);
        }

        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<Script>, RegistryError> {
        self.scripts
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownScript(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}
