pub mod cli;
pub mod config;
pub mod continuation;
pub mod demo;
pub mod errors;
pub mod inject;
pub mod interpreter;
pub mod registry;
pub mod script;

// Re-export main types
pub use continuation::{CallStack, Frame, FrameSnapshot};
pub use errors::{ExecuteError, InjectError, RegistryError, ScriptError};
pub use inject::{Callback, Container, Provisions, Scope, ServiceScope};
pub use interpreter::{execute, ExecuteResult, Executor};
pub use registry::ScriptRegistry;
pub use script::{Command, ExecutionContext, Script, Thread, Vars};
