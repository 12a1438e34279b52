//! # Interpreter - Resumable Script Executor
//!
//! Runs a script's commands against an explicit frame stack until the root
//! script finishes or a prompt suspends the run.
//!
//! ## Core Principles
//!
//! 1. **Stack-driven execution**: call/return push and pop frames on `vm.frames`, no recursion
//! 2. **Serializable suspension**: a suspended run leaves only a `CallStack` behind
//! 3. **Late injection**: callbacks are resolved against the scope when their command runs
//! 4. **Per-call output**: contents and the yielded value never carry over between calls

pub mod commands;
pub mod exec_loop;
pub mod result;
pub mod vm;

#[cfg(test)]
mod tests;

pub use exec_loop::{execute, run_until_done, step, Executor};
pub use result::ExecuteResult;
pub use vm::{Step, VM};
