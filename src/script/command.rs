//! Script commands
//!
//! A script is a flat list of these. Control flow is expressed with relative
//! jumps, sub-script calls and returns; the only point where a script can stop
//! between turns is a [`Command::Prompt`].

use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::context::{ExecutionContext, Vars};
use super::Script;
use crate::inject::Callback;

/// Produces a value from the context (content, call params, return value)
pub type ValueFn = Callback<ExecutionContext, JsonValue>;

/// Decides a conditional jump
pub type ConditionFn = Callback<ExecutionContext, bool>;

/// Computes new vars from the context alone
pub type VarsFn = Callback<ExecutionContext, Vars>;

/// Computes new vars from the context and an incoming value
/// (prompt input or a sub-script's returned value)
pub type MergeVarsFn = Callback<(ExecutionContext, Option<JsonValue>), Vars>;

/// Folds an effect's contribution into the value yielded by later effects
pub type YieldFn = Callback<(ExecutionContext, Option<JsonValue>), JsonValue>;

#[derive(Debug, Clone)]
pub enum Command {
    Content {
        get_content: ValueFn,
    },
    Prompt {
        key: String,
        set_vars: Option<MergeVarsFn>,
    },
    Call {
        key: String,
        script: Arc<Script>,
        /// Entry point in the child, used only when entering it fresh
        goto: Option<String>,
        with_params: Option<ValueFn>,
        set_vars: Option<MergeVarsFn>,
    },
    Jump {
        offset: isize,
    },
    JumpCond {
        condition: ConditionFn,
        is_not: bool,
        offset: isize,
    },
    Return {
        get_value: Option<ValueFn>,
    },
    Effect {
        set_vars: Option<VarsFn>,
        yield_value: Option<YieldFn>,
    },
}

impl Command {
    pub fn content(get_content: ValueFn) -> Self {
        Command::Content { get_content }
    }

    pub fn prompt(key: impl Into<String>, set_vars: Option<MergeVarsFn>) -> Self {
        Command::Prompt {
            key: key.into(),
            set_vars,
        }
    }

    /// A plain call: no goto, no params, returned value discarded
    pub fn call(key: impl Into<String>, script: Arc<Script>) -> Self {
        Command::Call {
            key: key.into(),
            script,
            goto: None,
            with_params: None,
            set_vars: None,
        }
    }

    pub fn jump(offset: isize) -> Self {
        Command::Jump { offset }
    }

    pub fn jump_if(condition: ConditionFn, offset: isize) -> Self {
        Command::JumpCond {
            condition,
            is_not: false,
            offset,
        }
    }

    pub fn jump_unless(condition: ConditionFn, offset: isize) -> Self {
        Command::JumpCond {
            condition,
            is_not: true,
            offset,
        }
    }

    pub fn ret(get_value: Option<ValueFn>) -> Self {
        Command::Return { get_value }
    }

    pub fn effect(set_vars: Option<VarsFn>, yield_value: Option<YieldFn>) -> Self {
        Command::Effect {
            set_vars,
            yield_value,
        }
    }

    /// Stop point key, for prompts and calls
    pub fn key(&self) -> Option<&str> {
        match self {
            Command::Prompt { key, .. } | Command::Call { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Command::Content { .. } => "content",
            Command::Prompt { .. } => "prompt",
            Command::Call { .. } => "call",
            Command::Jump { .. } => "jump",
            Command::JumpCond { .. } => "jump_cond",
            Command::Return { .. } => "return",
            Command::Effect { .. } => "effect",
        }
    }
}
