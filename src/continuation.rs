//! Continuation model
//!
//! A [`CallStack`] is everything a conversation needs between turns: one
//! [`Frame`] per open script, root first. Each frame records the vars of its
//! script and, when the run is suspended, the key it stopped at:
//!
//! - innermost frame: the key of the prompt waiting for input
//! - every other frame: the key of the call waiting for its child to return
//!
//! [`FrameSnapshot`] is the plain-data form for persistence; scripts are
//! referenced by name and looked up in a [`ScriptRegistry`] on restore.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::errors::{ExecuteError, RegistryError};
use crate::registry::ScriptRegistry;
use crate::script::{Command, Script, Vars};

/* ===================== Frames ===================== */

#[derive(Debug, Clone)]
pub struct Frame {
    pub script: Arc<Script>,
    pub vars: Vars,
    pub stop_at: Option<String>,
}

impl Frame {
    pub fn new(script: Arc<Script>, vars: Vars) -> Self {
        Self {
            script,
            vars,
            stop_at: None,
        }
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            script: self.script.name().to_string(),
            vars: self.vars.clone(),
            stop_at: self.stop_at.clone(),
        }
    }
}

/// Serializable form of a [`Frame`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub script: String,
    pub vars: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_at: Option<String>,
}

/* ===================== Call Stack ===================== */

/// Non-empty list of frames, outermost first
#[derive(Debug, Clone)]
pub struct CallStack {
    frames: Vec<Frame>,
}

impl CallStack {
    pub fn new(frames: Vec<Frame>) -> Result<Self, RegistryError> {
        if frames.is_empty() {
            return Err(RegistryError::EmptyCallStack);
        }
        Ok(Self { frames })
    }

    /// Fresh single-frame stack for starting `script` from the top
    pub fn new_root(script: Arc<Script>, params: Option<JsonValue>) -> Self {
        let vars = script.init_vars(params);
        Self {
            frames: vec![Frame::new(script, vars)],
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn root(&self) -> &Frame {
        &self.frames[0]
    }

    pub fn innermost(&self) -> &Frame {
        &self.frames[self.frames.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn snapshot(&self) -> Vec<FrameSnapshot> {
        self.frames.iter().map(Frame::snapshot).collect()
    }

    /// Rebuild a call stack from persisted frames
    pub fn restore(
        snapshots: Vec<FrameSnapshot>,
        registry: &ScriptRegistry,
    ) -> Result<Self, RegistryError> {
        let frames = snapshots
            .into_iter()
            .map(|snapshot| {
                Ok(Frame {
                    script: registry.get(&snapshot.script)?,
                    vars: snapshot.vars,
                    stop_at: snapshot.stop_at,
                })
            })
            .collect::<Result<Vec<_>, RegistryError>>()?;

        Self::new(frames)
    }
}

/* ===================== Stop Point Resolution ===================== */

pub fn resolve_stop_key(script: &Script, key: &str) -> Result<usize, ExecuteError> {
    script
        .stop_point_index()
        .get(key)
        .copied()
        .ok_or_else(|| ExecuteError::ScriptKeyNotFound {
            script: script.name().to_string(),
            key: key.to_string(),
        })
}

/// Index of the prompt a suspended frame is waiting at
pub fn assert_prompt_target(script: &Script, key: &str) -> Result<usize, ExecuteError> {
    let idx = resolve_stop_key(script, key)?;
    match script.command(idx) {
        Some(Command::Prompt { .. }) => Ok(idx),
        _ => {
            tracing::warn!(script = script.name(), key, "resume target is not a prompt");
            Err(ExecuteError::InvalidResumeTarget {
                script: script.name().to_string(),
                key: key.to_string(),
            })
        }
    }
}

/// Index of the call a parent frame is waiting at
pub fn assert_call_target(script: &Script, key: &str) -> Result<usize, ExecuteError> {
    let idx = resolve_stop_key(script, key)?;
    match script.command(idx) {
        Some(Command::Call { .. }) => Ok(idx),
        _ => {
            tracing::warn!(script = script.name(), key, "return target is not a call");
            Err(ExecuteError::InvalidReturnTarget {
                script: script.name().to_string(),
                key: key.to_string(),
            })
        }
    }
}
