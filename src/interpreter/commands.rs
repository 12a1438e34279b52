//! Command handlers
//!
//! Each command type has its own handler. Handlers run against the innermost
//! frame and either advance its index, push a child frame, pop the frame, or
//! stop the run.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::vm::{ActiveFrame, PendingYield, Step, VM};
use crate::continuation::{assert_call_target, resolve_stop_key};
use crate::errors::ExecuteError;
use crate::script::command::{ConditionFn, MergeVarsFn, ValueFn, VarsFn, YieldFn};
use crate::script::{Command, ExecutionContext, Script};

/* ===================== Helpers ===================== */

fn innermost<'v>(vm: &'v mut VM<'_>) -> Result<&'v mut ActiveFrame, ExecuteError> {
    vm.frames
        .last_mut()
        .ok_or_else(|| ExecuteError::MalformedCallStack("no active frame".to_string()))
}

fn current_context(vm: &VM<'_>) -> Result<ExecutionContext, ExecuteError> {
    vm.context()
        .ok_or_else(|| ExecuteError::MalformedCallStack("no active frame".to_string()))
}

/// Move the innermost frame's index by `offset`
///
/// Landing past the last command is allowed and ends the frame on the next step.
fn advance(vm: &mut VM<'_>, offset: isize) -> Result<Step, ExecuteError> {
    let frame = innermost(vm)?;
    let target = frame.index as isize + offset;

    if target < 0 {
        return Err(ExecuteError::JumpOutOfRange {
            script: frame.script.name().to_string(),
            index: frame.index,
            offset,
        });
    }

    frame.index = target as usize;
    Ok(Step::Continue)
}

async fn eval_value(vm: &VM<'_>, callback: &ValueFn) -> Result<JsonValue, ExecuteError> {
    let f = callback.resolve(vm.scope, &vm.provisions)?;
    Ok(f(current_context(vm)?).await?)
}

/* ===================== Command Handlers ===================== */

pub async fn execute_content(vm: &mut VM<'_>, get_content: &ValueFn) -> Result<Step, ExecuteError> {
    let content = eval_value(vm, get_content).await?;
    vm.contents.push(content);
    advance(vm, 1)
}

/// A prompt reached by normal flow stops the run
pub fn execute_prompt(vm: &mut VM<'_>, key: &str) -> Result<Step, ExecuteError> {
    let frame = innermost(vm)?;
    frame.stop_at = Some(key.to_string());

    tracing::debug!(script = frame.script.name(), key, "suspending at prompt");
    Ok(Step::Suspend)
}

/// Apply a prompt's input on resume and move past it
pub async fn resume_prompt(
    vm: &mut VM<'_>,
    idx: usize,
    set_vars: Option<&MergeVarsFn>,
    input: Option<JsonValue>,
) -> Result<(), ExecuteError> {
    if let Some(set_vars) = set_vars {
        let f = set_vars.resolve(vm.scope, &vm.provisions)?;
        let vars = f((current_context(vm)?, input)).await?;
        innermost(vm)?.vars = vars;
    }

    let frame = innermost(vm)?;
    frame.index = idx + 1;
    frame.stop_at = None;
    Ok(())
}

pub async fn execute_call(
    vm: &mut VM<'_>,
    key: &str,
    script: &Arc<Script>,
    goto: Option<&str>,
    with_params: Option<&ValueFn>,
) -> Result<Step, ExecuteError> {
    let params = match with_params {
        Some(with_params) => Some(eval_value(vm, with_params).await?),
        None => None,
    };

    let vars = script.init_vars(params);
    let start = match goto {
        Some(goto) => resolve_stop_key(script, goto)?,
        None => 0,
    };

    innermost(vm)?.stop_at = Some(key.to_string());

    tracing::debug!(callee = script.name(), key, start, "entering sub-script");
    vm.push_frame(ActiveFrame::new(script.clone(), vars, start));

    Ok(Step::Continue)
}

pub fn execute_jump(vm: &mut VM<'_>, offset: isize) -> Result<Step, ExecuteError> {
    advance(vm, offset)
}

pub async fn execute_jump_cond(
    vm: &mut VM<'_>,
    condition: &ConditionFn,
    is_not: bool,
    offset: isize,
) -> Result<Step, ExecuteError> {
    let f = condition.resolve(vm.scope, &vm.provisions)?;
    let satisfied = f(current_context(vm)?).await?;

    if satisfied != is_not {
        advance(vm, offset)
    } else {
        advance(vm, 1)
    }
}

pub async fn execute_return(vm: &mut VM<'_>, get_value: Option<&ValueFn>) -> Result<Step, ExecuteError> {
    let value = match get_value {
        Some(get_value) => Some(eval_value(vm, get_value).await?),
        None => None,
    };

    complete_frame(vm, value).await
}

pub async fn execute_effect(
    vm: &mut VM<'_>,
    set_vars: Option<&VarsFn>,
    yield_value: Option<&YieldFn>,
) -> Result<Step, ExecuteError> {
    if let Some(set_vars) = set_vars {
        let f = set_vars.resolve(vm.scope, &vm.provisions)?;
        let vars = f(current_context(vm)?).await?;
        innermost(vm)?.vars = vars;
    }

    if let Some(yield_value) = yield_value {
        let yield_fn = yield_value.resolve(vm.scope, &vm.provisions)?;
        let ctx = current_context(vm)?;
        vm.yields.push(PendingYield { yield_fn, ctx });
    }

    advance(vm, 1)
}

/* ===================== Frame Completion ===================== */

/// End the innermost frame with `value`
///
/// The root frame finishes the run. Otherwise the parent's recorded key must
/// still point at a call; its `set_vars` receives the value and the parent
/// continues after the call.
pub async fn complete_frame(vm: &mut VM<'_>, value: Option<JsonValue>) -> Result<Step, ExecuteError> {
    let Some(child) = vm.frames.pop() else {
        return Ok(Step::Done(value));
    };

    let Some(parent) = vm.frames.last() else {
        tracing::debug!(script = child.script.name(), "root script finished");
        return Ok(Step::Done(value));
    };

    let script = parent.script.clone();
    let key = parent.stop_at.clone().ok_or_else(|| {
        ExecuteError::MalformedCallStack(format!(
            "frame of script '{}' has no call to return to",
            script.name()
        ))
    })?;

    let idx = assert_call_target(&script, &key)?;
    tracing::debug!(
        callee = child.script.name(),
        caller = script.name(),
        key = key.as_str(),
        "returning from sub-script"
    );

    if let Some(Command::Call {
        set_vars: Some(set_vars),
        ..
    }) = script.command(idx)
    {
        let f = set_vars.resolve(vm.scope, &vm.provisions)?;
        let vars = f((current_context(vm)?, value)).await?;
        innermost(vm)?.vars = vars;
    }

    let parent = innermost(vm)?;
    parent.index = idx + 1;
    parent.stop_at = None;

    Ok(Step::Continue)
}
