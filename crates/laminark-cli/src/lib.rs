//! The `laminark` binary: the hook IPC entrypoint every `PostToolUse`,
//! `SessionStart`, `SessionEnd`, and `Stop` event is piped through, plus
//! the `serve`/`doctor`/`config` operator subcommands.

mod args;
mod commands;
pub mod handlers;

pub use args::{Cli, Commands, ConfigCommand};
pub use commands::run;
