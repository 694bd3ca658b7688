//! Clap derive structures for the `voxbridge` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// voxbridge -- operate a voice-assistant bridge node
#[derive(Debug, Parser)]
#[command(
    name = "voxbridge",
    version,
    about = "Manage voice-controlled devices on a voxbridge node",
    long_about = "Operator tool for a voxbridge node.\n\n\
        Edits the node's persisted device registry, pulses actuators the same\n\
        way a voice command would, and manages the node configuration file.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file to use instead of the platform default
    #[arg(long, env = "VOXBRIDGE_CONFIG", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Key-value store file holding the device registry
    #[arg(long, env = "VOXBRIDGE_STORE", global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', env = "VOXBRIDGE_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation for destructive operations
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the devices announced to the voice assistant
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Trigger a device exactly as a voice command would
    Pulse(PulseArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List configured devices
    #[command(alias = "ls")]
    List,

    /// Show one device
    Get {
        /// Device name (case-insensitive)
        name: String,
    },

    /// Add a device that pulses a pin or calls a URL
    Add(AddDeviceArgs),

    /// Remove a device by name
    #[command(alias = "rm")]
    Remove {
        /// Device name (case-insensitive)
        name: String,
    },

    /// Remove every device (requires --yes)
    Clear,
}

#[derive(Debug, Args)]
#[command(group(clap::ArgGroup::new("target").required(true).multiple(false)))]
pub struct AddDeviceArgs {
    /// Name the voice assistant will use
    pub name: String,

    /// Actuator pin to pulse
    #[arg(long, group = "target")]
    pub pin: Option<u8>,

    /// Custom HTTP endpoint to GET instead of the actuator
    #[arg(long, group = "target")]
    pub url: Option<String>,
}

// ── Pulse ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PulseArgs {
    /// Device name (case-insensitive)
    pub name: String,

    /// Send an "off" command (dispatches the same call as "on")
    #[arg(long)]
    pub off: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file with default values
    Init {
        /// Actuator host pin devices are pulsed on
        #[arg(long)]
        actuator_host: Option<String>,

        /// Node MAC address used in device identifiers
        #[arg(long)]
        mac: Option<String>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
