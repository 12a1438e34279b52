//! Execution context handed to every callback

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Variable bag threaded through a script
pub type Vars = JsonValue;

/// Identity of the conversation a script runs in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Thread {
    pub platform: String,
    pub uid: String,
}

impl Thread {
    pub fn new(platform: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            uid: uid.into(),
        }
    }
}

/// Snapshot of the running frame, rebuilt before each callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub platform: String,
    pub thread: Thread,
    pub vars: Vars,
    /// The running script's metadata
    pub meta: JsonValue,
}

impl ExecutionContext {
    pub fn new(thread: &Thread, vars: Vars, meta: JsonValue) -> Self {
        Self {
            platform: thread.platform.clone(),
            thread: thread.clone(),
            vars,
            meta,
        }
    }

    /// Look up a top-level variable
    pub fn var(&self, name: &str) -> Option<&JsonValue> {
        self.vars.get(name)
    }
}
