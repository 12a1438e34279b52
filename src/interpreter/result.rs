//! Result of one `execute()` call

use serde_json::Value as JsonValue;

use crate::continuation::{CallStack, FrameSnapshot};

#[derive(Debug, Clone)]
pub struct ExecuteResult {
    /// True when the root script returned or ran out of commands
    pub finished: bool,
    pub returned_value: Option<JsonValue>,
    /// Reverse fold of the effect yields run by this call
    pub yielded_value: Option<JsonValue>,
    /// Contents produced by this call, in order
    pub contents: Vec<JsonValue>,
    /// Continuation to persist; `None` iff finished
    pub call_stack: Option<CallStack>,
}

impl ExecuteResult {
    /// Persistable form of the continuation, if any
    pub fn snapshot(&self) -> Option<Vec<FrameSnapshot>> {
        self.call_stack.as_ref().map(CallStack::snapshot)
    }
}
