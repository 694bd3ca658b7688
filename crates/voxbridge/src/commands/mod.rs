//! Command dispatch: bridges CLI args -> registry / actuator -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod pulse;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a node-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(args, global),
        Command::Pulse(args) => pulse::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
        // Completions are handled before dispatch
        Command::Completions(_) => unreachable!(),
    }
}
