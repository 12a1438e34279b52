//! Core execution loop
//!
//! ## Function Organization
//! 1. execute() - Entry point: sets up the VM, runs it, folds yields
//! 2. run_until_done() - Calls step() until the run stops
//! 3. step() - Dispatches one command of the innermost frame
//!
//! The loop is iterative. Call and return move frames on `vm.frames`, and the
//! reverse fold of effect yields happens once, after the loop stops.

use serde_json::Value as JsonValue;

use super::commands::{
    complete_frame, execute_call, execute_content, execute_effect, execute_jump, execute_jump_cond,
    execute_prompt, execute_return, resume_prompt,
};
use super::result::ExecuteResult;
use super::vm::{ActiveFrame, Step, VM};
use crate::config::{Config, ExecutorConfig};
use crate::continuation::{assert_prompt_target, CallStack};
use crate::errors::ExecuteError;
use crate::inject::Scope;
use crate::script::{Command, Thread};

/* ===================== Public API ===================== */

/// Run a call stack with the default configuration
///
/// See [`Executor::execute`].
pub async fn execute(
    scope: &dyn Scope,
    thread: &Thread,
    call_stack: CallStack,
    is_resuming: bool,
    resume_input: Option<JsonValue>,
) -> Result<ExecuteResult, ExecuteError> {
    Executor::default()
        .execute(scope, thread, call_stack, is_resuming, resume_input)
        .await
}

#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.executor.clone())
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute a script until it finishes or stops at a prompt
    ///
    /// A fresh run (`is_resuming == false`) takes a single root frame without
    /// `stop_at` and starts at its first command. A resumed run takes the call
    /// stack of a previous suspended result: the innermost frame's prompt
    /// receives `resume_input` and execution continues after it.
    ///
    /// Contents and the yielded value cover only the commands run by this call.
    pub async fn execute(
        &self,
        scope: &dyn Scope,
        thread: &Thread,
        call_stack: CallStack,
        is_resuming: bool,
        resume_input: Option<JsonValue>,
    ) -> Result<ExecuteResult, ExecuteError> {
        let mut vm = VM::new(scope, thread, self.config.max_steps);

        if is_resuming {
            resume_vm(&mut vm, call_stack, resume_input).await?;
        } else {
            start_vm(&mut vm, call_stack)?;
        }

        let outcome = run_until_done(&mut vm).await?;
        let yielded_value = fold_yields(&mut vm).await?;

        let result = match outcome {
            Step::Done(returned_value) => {
                tracing::info!(thread = thread.uid.as_str(), steps = vm.steps, "script finished");
                ExecuteResult {
                    finished: true,
                    returned_value,
                    yielded_value,
                    contents: vm.contents,
                    call_stack: None,
                }
            }
            Step::Suspend | Step::Continue => {
                tracing::info!(
                    thread = thread.uid.as_str(),
                    steps = vm.steps,
                    depth = vm.frames.len(),
                    "script suspended"
                );
                let contents = std::mem::take(&mut vm.contents);
                ExecuteResult {
                    finished: false,
                    returned_value: None,
                    yielded_value,
                    contents,
                    call_stack: vm.into_call_stack(),
                }
            }
        };

        Ok(result)
    }
}

/* ===================== Setup ===================== */

fn start_vm(vm: &mut VM<'_>, call_stack: CallStack) -> Result<(), ExecuteError> {
    let mut frames = call_stack.into_frames();

    if frames.len() != 1 {
        return Err(ExecuteError::MalformedCallStack(format!(
            "a fresh run needs exactly one frame, got {}",
            frames.len()
        )));
    }

    let Some(root) = frames.pop() else {
        return Err(ExecuteError::MalformedCallStack("empty call stack".to_string()));
    };
    if let Some(key) = root.stop_at {
        return Err(ExecuteError::MalformedCallStack(format!(
            "a fresh run cannot start at '{}'",
            key
        )));
    }

    tracing::debug!(script = root.script.name(), "starting script");
    vm.push_frame(ActiveFrame::new(root.script, root.vars, 0));
    Ok(())
}

async fn resume_vm(
    vm: &mut VM<'_>,
    call_stack: CallStack,
    resume_input: Option<JsonValue>,
) -> Result<(), ExecuteError> {
    let depth = call_stack.len();

    for (level, frame) in call_stack.into_frames().into_iter().enumerate() {
        if frame.stop_at.is_none() {
            return Err(ExecuteError::MalformedCallStack(format!(
                "frame {} of script '{}' has no stop point",
                level,
                frame.script.name()
            )));
        }
        vm.push_frame(ActiveFrame {
            script: frame.script,
            vars: frame.vars,
            index: 0,
            stop_at: frame.stop_at,
        });
    }

    let Some(frame) = vm.frames.last() else {
        return Err(ExecuteError::MalformedCallStack("empty call stack".to_string()));
    };
    let script = frame.script.clone();
    let key = frame.stop_at.clone().unwrap_or_default();

    let idx = assert_prompt_target(&script, &key)?;
    tracing::debug!(script = script.name(), key = key.as_str(), depth, "resuming at prompt");

    let set_vars = match script.command(idx) {
        Some(Command::Prompt { set_vars, .. }) => set_vars.as_ref(),
        _ => None,
    };

    resume_prompt(vm, idx, set_vars, resume_input).await
}

/* ===================== Loop ===================== */

/// Step the VM until it finishes or suspends
pub async fn run_until_done(vm: &mut VM<'_>) -> Result<Step, ExecuteError> {
    loop {
        match step(vm).await? {
            Step::Continue => continue,
            stop => return Ok(stop),
        }
    }
}

/// Dispatch one command of the innermost frame
pub async fn step(vm: &mut VM<'_>) -> Result<Step, ExecuteError> {
    if let Some(max_steps) = vm.max_steps {
        if vm.steps >= max_steps {
            return Err(ExecuteError::StepLimitExceeded(max_steps));
        }
    }
    vm.steps += 1;

    // No frames left - nothing to run
    let Some(frame) = vm.frames.last() else {
        return Ok(Step::Done(None));
    };

    let script = frame.script.clone();
    let index = frame.index;

    // Running off the end is an implicit return without a value
    let Some(command) = script.command(index) else {
        return complete_frame(vm, None).await;
    };

    tracing::trace!(script = script.name(), index, command = command.kind(), "dispatch");

    match command {
        Command::Content { get_content } => execute_content(vm, get_content).await,

        Command::Prompt { key, .. } => execute_prompt(vm, key),

        Command::Call {
            key,
            script: callee,
            goto,
            with_params,
            ..
        } => execute_call(vm, key, callee, goto.as_deref(), with_params.as_ref()).await,

        Command::Jump { offset } => execute_jump(vm, *offset),

        Command::JumpCond {
            condition,
            is_not,
            offset,
        } => execute_jump_cond(vm, condition, *is_not, *offset).await,

        Command::Return { get_value } => execute_return(vm, get_value.as_ref()).await,

        Command::Effect {
            set_vars,
            yield_value,
        } => execute_effect(vm, set_vars.as_ref(), yield_value.as_ref()).await,
    }
}

/* ===================== Yield Fold ===================== */

/// Fold queued effect yields from the last executed to the first
///
/// The last effect sees `None` as the previous value; each earlier effect
/// receives the accumulation of every later one.
async fn fold_yields(vm: &mut VM<'_>) -> Result<Option<JsonValue>, ExecuteError> {
    let mut acc = None;

    for pending in vm.yields.drain(..).rev() {
        acc = Some((pending.yield_fn)((pending.ctx, acc)).await?);
    }

    Ok(acc)
}
