//! Error types
//!
//! Continuation errors signal that a persisted call stack no longer fits the
//! script it points into, usually because the script's command list changed
//! between turns. Callback errors are passed through untouched.

use thiserror::Error;

/// Failure of a single `execute()` call
///
/// Any error aborts the run: no contents, no yielded value and no new call
/// stack are produced. The previously persisted call stack stays authoritative.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// A `stop_at` or `goto` key is missing from the script's stop point index
    #[error("key '{key}' not found in script '{script}'")]
    ScriptKeyNotFound { script: String, key: String },

    /// Resuming at a key that does not point to a prompt command
    #[error("cannot resume script '{script}' at '{key}': not a prompt")]
    InvalidResumeTarget { script: String, key: String },

    /// A child frame returned but the parent's key does not point to a call command
    #[error("cannot return to script '{script}' at '{key}': not a call")]
    InvalidReturnTarget { script: String, key: String },

    /// The call stack handed in does not have the shape the run mode requires
    #[error("malformed call stack: {0}")]
    MalformedCallStack(String),

    /// A jump moved the command index before the first command
    #[error("jump of {offset} from index {index} in script '{script}' is out of range")]
    JumpOutOfRange {
        script: String,
        index: usize,
        offset: isize,
    },

    /// More commands were dispatched than the configured budget allows
    #[error("step limit of {0} exceeded")]
    StepLimitExceeded(usize),

    #[error(transparent)]
    Inject(#[from] InjectError),

    /// An error raised by a script callback
    #[error(transparent)]
    Callback(#[from] anyhow::Error),
}

/// Failure to resolve a DI-bound callback
#[derive(Debug, Error)]
pub enum InjectError {
    #[error("service '{0}' is not provided by the scope")]
    ServiceNotFound(String),

    #[error("service '{service}' is not a {expected}")]
    TypeMismatch {
        service: String,
        expected: &'static str,
    },

    #[error("dependency index {0} out of range")]
    MissingDependency(usize),

    #[error("container factory failed: {0}")]
    Factory(anyhow::Error),
}

/// Failure to build a script
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("duplicate stop point key '{key}' in script '{script}'")]
    DuplicateKey { script: String, key: String },
}

/// Failure to restore a persisted call stack
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("script '{0}' is not registered")]
    UnknownScript(String),

    #[error("script '{0}' is already registered")]
    DuplicateScript(String),

    #[error("call stack must contain at least one frame")]
    EmptyCallStack,
}
