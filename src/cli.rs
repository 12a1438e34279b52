use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::config::Config;
use crate::continuation::{CallStack, FrameSnapshot};
use crate::demo::{self, Menu};
use crate::interpreter::Executor;
use crate::registry::ScriptRegistry;
use crate::script::Thread;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley - a resumable scripted-dialogue interpreter", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Maximum commands per turn (overrides config file and env vars)
    #[arg(long, global = true)]
    pub max_steps: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play one turn of the demo dialogue
    Run {
        /// File holding the suspended conversation between turns
        #[arg(short = 's', long = "state", default_value = "parley-state.json")]
        state: PathBuf,

        /// Answer to the pending prompt (JSON, or plain text)
        #[arg(short = 'i', long = "input")]
        input: Option<String>,

        /// Conversation id, used as the streaming key
        #[arg(short = 'u', long = "user", default_value = "cli-user")]
        user: String,

        /// Discard any saved conversation and start over
        #[arg(long)]
        reset: bool,
    },

    /// Show the saved call stack
    Inspect {
        #[arg(short = 's', long = "state", default_value = "parley-state.json")]
        state: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

/// What the `run` command keeps on disk between turns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    pub thread: Thread,
    pub call_stack: Vec<FrameSnapshot>,
}

impl StateFile {
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file {}", path.display()))?;
        let state = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse state file {}", path.display()))?;
        Ok(Some(state))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).context("Failed to serialize state")?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write state file {}", path.display()))
    }
}

/// Parse `--input` as JSON, falling back to a plain string
pub fn parse_input(raw: &str) -> JsonValue {
    serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()))
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::builder()
        .config_path(cli.config.map(PathBuf::from))
        .max_steps(cli.max_steps)
        .build()?;

    match cli.command {
        Commands::Run {
            state,
            input,
            user,
            reset,
        } => {
            let lines = run_turn(&config, &state, input.as_deref(), &user, reset).await?;
            for line in lines {
                println!("{}", line);
            }
        }

        Commands::Inspect { state } => match StateFile::load(&state)? {
            Some(saved) => {
                println!("Thread: {}/{}", saved.thread.platform, saved.thread.uid);
                for (depth, frame) in saved.call_stack.iter().enumerate() {
                    println!(
                        "  [{}] {} stopped at {} vars={}",
                        depth,
                        frame.script,
                        frame.stop_at.as_deref().unwrap_or("-"),
                        frame.vars
                    );
                }
            }
            None => println!("No saved conversation at {}", state.display()),
        },

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Run one turn of the demo dialogue against `state_path`
///
/// Returns the lines to show the user.
pub async fn run_turn(
    config: &Config,
    state_path: &Path,
    input: Option<&str>,
    user: &str,
    reset: bool,
) -> Result<Vec<String>> {
    if reset && state_path.exists() {
        std::fs::remove_file(state_path)
            .with_context(|| format!("Failed to remove {}", state_path.display()))?;
    }

    let root = demo::take_order().context("Failed to build demo script")?;
    let mut registry = ScriptRegistry::new();
    registry.register(root.clone())?;

    let scope = demo::demo_scope(Menu::default());
    let executor = Executor::from_config(config);

    let (thread, stack, is_resuming) = match StateFile::load(state_path)? {
        Some(saved) => {
            let stack = CallStack::restore(saved.call_stack, &registry)?;
            (saved.thread, stack, true)
        }
        None => {
            if input.is_some() {
                tracing::warn!("no conversation in progress, ignoring input");
            }
            (Thread::new("cli", user), CallStack::new_root(root, None), false)
        }
    };

    let input = if is_resuming { input.map(parse_input) } else { None };
    let result = executor
        .execute(&scope, &thread, stack, is_resuming, input)
        .await?;

    let mut lines: Vec<String> = result
        .contents
        .iter()
        .map(|c| c.as_str().map(str::to_string).unwrap_or_else(|| c.to_string()))
        .collect();

    if let Some(yielded) = &result.yielded_value {
        tracing::info!(%yielded, "turn yielded");
    }

    match result.snapshot() {
        Some(call_stack) => {
            StateFile { thread, call_stack }.save(state_path)?;
        }
        None => {
            if state_path.exists() {
                std::fs::remove_file(state_path)
                    .with_context(|| format!("Failed to remove {}", state_path.display()))?;
            }
            if let Some(returned) = &result.returned_value {
                lines.push(format!("(finished: {})", returned));
            }
        }
    }

    Ok(lines)
}
