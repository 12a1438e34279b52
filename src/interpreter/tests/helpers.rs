//! Test helpers for interpreter tests
//!
//! Common commands, callbacks and shortcuts for running scripts

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value as JsonValue};

use crate::continuation::CallStack;
use crate::errors::ExecuteError;
use crate::inject::{Callback, ServiceScope};
use crate::interpreter::{execute, ExecuteResult};
use crate::script::command::MergeVarsFn;
use crate::script::{Command, ExecutionContext, Script, Thread};

pub fn thread() -> Thread {
    Thread::new("test", "user-1")
}

/// Content command emitting a fixed string
pub fn text(s: &'static str) -> Command {
    Command::content(Callback::from_fn(move |_| Ok(json!(s))))
}

/// Content command emitting a fixed string and counting its invocations
pub fn counted_text(s: &'static str, counter: Arc<AtomicUsize>) -> Command {
    Command::content(Callback::from_fn(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(json!(s))
    }))
}

/// Content command emitting the value of a variable
pub fn show_var(name: &'static str) -> Command {
    Command::content(Callback::from_fn(move |ctx: ExecutionContext| {
        Ok(ctx.vars.get(name).cloned().unwrap_or(JsonValue::Null))
    }))
}

/// Shallow merge of an object value into vars
pub fn merged(vars: &JsonValue, extra: Option<JsonValue>) -> JsonValue {
    let mut out = vars.as_object().cloned().unwrap_or_default();
    if let Some(JsonValue::Object(extra)) = extra {
        out.extend(extra);
    }
    JsonValue::Object(out)
}

/// `set_vars` merging the incoming value into vars
pub fn merge_vars() -> MergeVarsFn {
    Callback::from_fn(|(ctx, input): (ExecutionContext, Option<JsonValue>)| Ok(merged(&ctx.vars, input)))
}

/// Prompt whose input is merged into vars on resume
pub fn ask(key: &'static str) -> Command {
    Command::prompt(key, Some(merge_vars()))
}

pub async fn run_fresh(
    script: Arc<Script>,
    vars: JsonValue,
) -> Result<ExecuteResult, ExecuteError> {
    let scope = ServiceScope::new();
    let stack = CallStack::new_root(script, Some(vars));
    execute(&scope, &thread(), stack, false, None).await
}

pub async fn resume(
    result: ExecuteResult,
    input: Option<JsonValue>,
) -> Result<ExecuteResult, ExecuteError> {
    let scope = ServiceScope::new();
    let stack = result.call_stack.expect("suspended result has a call stack");
    execute(&scope, &thread(), stack, true, input).await
}

/// Stop point keys of a suspended result, outermost first
pub fn stop_keys(result: &ExecuteResult) -> Vec<Option<String>> {
    result
        .call_stack
        .as_ref()
        .map(|stack| stack.frames().iter().map(|f| f.stop_at.clone()).collect())
        .unwrap_or_default()
}
