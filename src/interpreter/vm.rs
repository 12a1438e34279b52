//! Virtual machine state
//!
//! The VM holds the state of one `execute()` call:
//! - frames: open scripts with their command index, innermost last
//! - contents: output produced so far, in order
//! - yields: effect folds queued for after the run
//!
//! Nothing in here outlives the call. What survives a suspension is converted
//! back into a [`CallStack`] by [`VM::into_call_stack`].

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::continuation::{CallStack, Frame};
use crate::inject::{CallbackFn, Provisions, Scope};
use crate::script::{ExecutionContext, Script, Thread, Vars};

/* ===================== Frames ===================== */

/// A frame being executed
#[derive(Debug, Clone)]
pub struct ActiveFrame {
    pub script: Arc<Script>,
    pub vars: Vars,
    /// Next command to dispatch; stale while the frame waits on a child
    pub index: usize,
    /// Key of the call this frame waits on, or of the prompt it stopped at
    pub stop_at: Option<String>,
}

impl ActiveFrame {
    pub fn new(script: Arc<Script>, vars: Vars, index: usize) -> Self {
        Self {
            script,
            vars,
            index,
            stop_at: None,
        }
    }
}

/// An executed effect's yield callback, folded once the run stops
pub struct PendingYield {
    pub yield_fn: CallbackFn<(ExecutionContext, Option<JsonValue>), JsonValue>,
    pub ctx: ExecutionContext,
}

/* ===================== VM ===================== */

pub struct VM<'a> {
    pub scope: &'a dyn Scope,
    pub thread: &'a Thread,
    pub provisions: Provisions,

    pub frames: Vec<ActiveFrame>,
    pub contents: Vec<JsonValue>,
    pub yields: Vec<PendingYield>,

    pub steps: usize,
    pub max_steps: Option<usize>,
}

impl<'a> VM<'a> {
    pub fn new(scope: &'a dyn Scope, thread: &'a Thread, max_steps: Option<usize>) -> Self {
        VM {
            scope,
            thread,
            provisions: Provisions::new(thread.uid.clone()),
            frames: Vec::new(),
            contents: Vec::new(),
            yields: Vec::new(),
            steps: 0,
            max_steps,
        }
    }

    pub fn push_frame(&mut self, frame: ActiveFrame) {
        self.frames.push(frame);
    }

    /// Context for a callback of the innermost frame
    pub fn context(&self) -> Option<ExecutionContext> {
        self.frames.last().map(|frame| self.context_with(frame, frame.vars.clone()))
    }

    /// Context of `frame` carrying `vars` instead of the frame's own
    pub fn context_with(&self, frame: &ActiveFrame, vars: Vars) -> ExecutionContext {
        ExecutionContext::new(self.thread, vars, frame.script.meta().clone())
    }

    /// Convert the open frames into the continuation to persist
    pub fn into_call_stack(self) -> Option<CallStack> {
        let frames = self
            .frames
            .into_iter()
            .map(|frame| Frame {
                script: frame.script,
                vars: frame.vars,
                stop_at: frame.stop_at,
            })
            .collect::<Vec<_>>();

        CallStack::new(frames).ok()
    }
}

/* ===================== Step Result ===================== */

/// Result of dispatching one command
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Dispatch the next command
    Continue,
    /// Stopped at a prompt; the frames hold the continuation
    Suspend,
    /// The root frame ended with this returned value
    Done(Option<JsonValue>),
}
