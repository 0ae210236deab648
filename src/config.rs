use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntellihideMode {
    /// Check every window on the active workspace
    Workspace,
    /// Check only windows of the active window's application
    App,
    /// Currently behaves like `app`
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Top,
    Bottom,
    Left,
    Right,
}

impl Orientation {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Orientation::Top | Orientation::Bottom)
    }
}

/// Policy option keys accepted by `set` (CLI) and `configure` (IPC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyOption {
    ShowAllWorkspaces,
    OnlyShowLaunchers,
    DragAndDrop,
    Grouping,
    MatchStrength,
    Intellihide,
    IntellihideMode,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run as daemon (default if no command specified)
    Daemon,
    /// Update a dock item's decoration (overlay icon, progress, message)
    Update {
        /// Window specifier: a numeric window id or a display name
        window: String,
        /// Path to an overlay image, empty string clears it
        #[arg(long)]
        icon_file: Option<String>,
        /// Progress percentage, -1 clears it
        #[arg(long)]
        progress: Option<i32>,
        /// Message text shown on the icon
        #[arg(long)]
        message: Option<String>,
    },
    /// List the decoration keys the daemon understands
    Capabilities,
    /// Append a launcher by its desktop file path
    AddLauncher { path: PathBuf },
    /// Replace the configured launcher list, reconciling against the dock
    SetLaunchers { paths: Vec<PathBuf> },
    /// Change a policy flag at runtime
    Set {
        #[arg(value_enum)]
        option: PolicyOption,
        value: String,
    },
    /// Query daemon status
    Status,
    /// Shutdown the daemon
    Shutdown,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "sway-taskdock")]
#[command(about = "Dock task-list engine for Sway", long_about = None)]
pub struct Config {
    /// Track windows from all workspaces, not just the active one
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub show_all_workspaces: bool,

    /// Hide icons that have no launcher attached
    #[arg(long)]
    pub only_show_launchers: bool,

    /// Allow reordering icons by dragging
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub drag_and_drop: bool,

    /// Group windows of the same application under one icon
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub grouping: bool,

    /// How loosely windows are matched for grouping (0 = strict, 99 = loose)
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(i32).range(0..=99))]
    pub match_strength: i32,

    /// Only auto-hide the panel when a window overlaps it
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub intellihide: bool,

    /// Which windows intellihide checks for overlap
    #[arg(long, value_enum, default_value = "app")]
    pub intellihide_mode: IntellihideMode,

    /// Screen edge the panel sits on
    #[arg(long, value_enum, default_value = "bottom")]
    pub orientation: Orientation,

    /// Panel thickness in pixels
    #[arg(long, default_value_t = 48)]
    pub panel_size: u32,

    /// Desktop file to place on the dock at startup (repeatable, ordered)
    #[arg(long = "launcher")]
    pub launchers: Vec<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Config {
    pub fn parse() -> Self {
        <Config as Parser>::parse()
    }

    /// Get the command, defaulting to Daemon if none specified
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Daemon)
    }
}
