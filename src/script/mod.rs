//! Script model
//!
//! A [`Script`] is immutable once built: its command list, the index of every
//! prompt and call key, the vars initializer and script-level metadata.
//! Scripts are shared behind `Arc` so frames and call commands can point at
//! them without copying.

pub mod command;
pub mod context;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value as JsonValue};

use crate::errors::ScriptError;

pub use command::Command;
pub use context::{ExecutionContext, Thread, Vars};

/// Builds a script's initial vars from call params or root input
pub type InitVarsFn = Arc<dyn Fn(Option<JsonValue>) -> Vars + Send + Sync>;

pub struct Script {
    name: String,
    commands: Vec<Command>,
    stop_point_index: HashMap<String, usize>,
    init_vars: InitVarsFn,
    meta: JsonValue,
}

impl Script {
    pub fn builder(name: impl Into<String>) -> ScriptBuilder {
        ScriptBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn command(&self, idx: usize) -> Option<&Command> {
        self.commands.get(idx)
    }

    pub fn stop_point_index(&self) -> &HashMap<String, usize> {
        &self.stop_point_index
    }

    pub fn meta(&self) -> &JsonValue {
        &self.meta
    }

    pub fn init_vars(&self, params: Option<JsonValue>) -> Vars {
        (self.init_vars)(params)
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("name", &self.name)
            .field("commands", &self.commands.len())
            .field("stop_points", &self.stop_point_index)
            .finish()
    }
}

/// Params pass through when they are an object; anything else starts empty
fn default_init_vars(params: Option<JsonValue>) -> Vars {
    match params {
        Some(JsonValue::Object(map)) => JsonValue::Object(map),
        _ => json!({}),
    }
}

/* ===================== Builder ===================== */

pub struct ScriptBuilder {
    name: String,
    commands: Vec<Command>,
    init_vars: InitVarsFn,
    meta: JsonValue,
}

impl ScriptBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
            init_vars: Arc::new(default_init_vars),
            meta: JsonValue::Null,
        }
    }

    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn commands(mut self, commands: impl IntoIterator<Item = Command>) -> Self {
        self.commands.extend(commands);
        self
    }

    pub fn init_vars<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<JsonValue>) -> Vars + Send + Sync + 'static,
    {
        self.init_vars = Arc::new(f);
        self
    }

    pub fn meta(mut self, meta: JsonValue) -> Self {
        self.meta = meta;
        self
    }

    /// Index the stop points and freeze the script
    pub fn build(self) -> Result<Arc<Script>, ScriptError> {
        let mut stop_point_index = HashMap::new();

        for (idx, command) in self.commands.iter().enumerate() {
            let Some(key) = command.key() else {
                continue;
            };
            if stop_point_index.insert(key.to_string(), idx).is_some() {
                return Err(ScriptError::DuplicateKey {
                    script: self.name,
                    key: key.to_string(),
                });
            }
        }

        Ok(Arc::new(Script {
            name: self.name,
            commands: self.commands,
            stop_point_index,
            init_vars: self.init_vars,
            meta: self.meta,
        }))
    }
}
