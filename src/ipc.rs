//! Control-surface protocol.
//!
//! Line-delimited JSON over a Unix socket in the runtime directory. Each
//! connection carries one command and receives one response.

use crate::config::{IntellihideMode, PolicyOption};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Decoration keys the daemon understands
pub const CAPABILITY_KEYS: [&str; 4] = ["icon-file", "progress", "message", "visible"];

/// How a control-surface caller identifies a window. Anything that is
/// neither a name nor a numeric identity is preserved and rejected by the
/// engine as unsupported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WindowSpec {
    Id(i64),
    Name(String),
    Unsupported(serde_json::Value),
}

/// Decoration hints; absent keys are left untouched. An empty icon-file
/// clears the overlay, progress -1 clears the progress indicator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DecorationHints {
    #[serde(rename = "icon-file", skip_serializing_if = "Option::is_none")]
    pub icon_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

/// A runtime policy change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PolicySetting {
    ShowAllWorkspaces(bool),
    OnlyShowLaunchers(bool),
    DragAndDrop(bool),
    Grouping(bool),
    MatchStrength(i32),
    Intellihide(bool),
    IntellihideMode(IntellihideMode),
}

impl PolicySetting {
    /// Build a setting from an option key and its string value (CLI side)
    pub fn parse(option: PolicyOption, value: &str) -> Result<Self> {
        let parse_bool = |v: &str| -> Result<bool> {
            v.parse::<bool>()
                .with_context(|| format!("expected true or false, got '{}'", v))
        };
        Ok(match option {
            PolicyOption::ShowAllWorkspaces => {
                PolicySetting::ShowAllWorkspaces(parse_bool(value)?)
            }
            PolicyOption::OnlyShowLaunchers => {
                PolicySetting::OnlyShowLaunchers(parse_bool(value)?)
            }
            PolicyOption::DragAndDrop => PolicySetting::DragAndDrop(parse_bool(value)?),
            PolicyOption::Grouping => PolicySetting::Grouping(parse_bool(value)?),
            PolicyOption::MatchStrength => {
                let strength: i32 = value
                    .parse()
                    .with_context(|| format!("expected 0-99, got '{}'", value))?;
                if !(0..=99).contains(&strength) {
                    anyhow::bail!("match strength must be within 0-99, got {}", strength);
                }
                PolicySetting::MatchStrength(strength)
            }
            PolicyOption::Intellihide => PolicySetting::Intellihide(parse_bool(value)?),
            PolicyOption::IntellihideMode => {
                let mode = match value.to_lowercase().as_str() {
                    "workspace" => IntellihideMode::Workspace,
                    "app" => IntellihideMode::App,
                    "group" => IntellihideMode::Group,
                    other => anyhow::bail!(
                        "expected workspace, app or group, got '{}'",
                        other
                    ),
                };
                PolicySetting::IntellihideMode(mode)
            }
        })
    }
}

/// Commands sent from CLI client (or any other local caller) to the daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum IpcCommand {
    /// Update the decoration of the item backing the specified window
    Update {
        window: WindowSpec,
        #[serde(default)]
        hints: DecorationHints,
    },
    /// List the decoration keys the daemon understands
    Capabilities,
    /// Append a launcher by descriptor path
    AddLauncher { path: PathBuf },
    /// Replace the configured launcher list
    SetLaunchers { paths: Vec<PathBuf> },
    /// Change a policy flag
    Configure { setting: PolicySetting },
    /// Query daemon status
    Status,
    /// Shutdown the daemon gracefully
    Shutdown,
}

/// Response from daemon to a caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum IpcResponse {
    Ok,
    Error { message: String },
    Capabilities { keys: Vec<String> },
    Status {
        icon_count: usize,
        window_count: usize,
        launcher_count: usize,
        grouping: bool,
        only_show_launchers: bool,
        intellihide: bool,
    },
}

impl fmt::Display for IpcResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpcResponse::Ok => write!(f, "ok"),
            IpcResponse::Error { message } => write!(f, "error: {}", message),
            IpcResponse::Capabilities { keys } => write!(f, "capabilities: {}", keys.join(", ")),
            IpcResponse::Status {
                icon_count,
                window_count,
                launcher_count,
                grouping,
                only_show_launchers,
                intellihide,
            } => write!(
                f,
                "icons: {}, windows: {}, launchers: {}, grouping: {}, only-show-launchers: {}, intellihide: {}",
                icon_count, window_count, launcher_count, grouping, only_show_launchers, intellihide
            ),
        }
    }
}

/// Get the path to the Unix socket
pub fn get_socket_path() -> Result<PathBuf> {
    let runtime_dir = dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .context("Could not determine runtime directory")?;

    Ok(runtime_dir.join("sway-taskdock.sock"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_spec_from_json() {
        let spec: WindowSpec = serde_json::from_str("42").unwrap();
        assert_eq!(spec, WindowSpec::Id(42));

        let spec: WindowSpec = serde_json::from_str("\"Firefox\"").unwrap();
        assert_eq!(spec, WindowSpec::Name("Firefox".to_string()));

        let spec: WindowSpec = serde_json::from_str("true").unwrap();
        assert!(matches!(spec, WindowSpec::Unsupported(_)));

        let spec: WindowSpec = serde_json::from_str("1.5").unwrap();
        assert!(matches!(spec, WindowSpec::Unsupported(_)));
    }

    #[test]
    fn test_update_command_roundtrip() {
        let command = IpcCommand::Update {
            window: WindowSpec::Name("Firefox".to_string()),
            hints: DecorationHints {
                progress: Some(75),
                ..Default::default()
            },
        };
        let json = serde_json::to_string(&command).unwrap();
        let parsed: IpcCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, command);
    }

    #[test]
    fn test_update_command_accepts_raw_json() {
        let json = r#"{"cmd":"update","window":12345,"hints":{"icon-file":"/tmp/badge.png"}}"#;
        let parsed: IpcCommand = serde_json::from_str(json).unwrap();
        match parsed {
            IpcCommand::Update { window, hints } => {
                assert_eq!(window, WindowSpec::Id(12345));
                assert_eq!(hints.icon_file.as_deref(), Some("/tmp/badge.png"));
                assert!(hints.progress.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_hints_default_when_absent() {
        let json = r#"{"cmd":"update","window":"xterm"}"#;
        let parsed: IpcCommand = serde_json::from_str(json).unwrap();
        match parsed {
            IpcCommand::Update { hints, .. } => assert_eq!(hints, DecorationHints::default()),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_policy_setting_parse() {
        assert_eq!(
            PolicySetting::parse(PolicyOption::Grouping, "false").unwrap(),
            PolicySetting::Grouping(false)
        );
        assert_eq!(
            PolicySetting::parse(PolicyOption::MatchStrength, "75").unwrap(),
            PolicySetting::MatchStrength(75)
        );
        assert_eq!(
            PolicySetting::parse(PolicyOption::IntellihideMode, "workspace").unwrap(),
            PolicySetting::IntellihideMode(IntellihideMode::Workspace)
        );
        assert!(PolicySetting::parse(PolicyOption::MatchStrength, "150").is_err());
        assert!(PolicySetting::parse(PolicyOption::Grouping, "maybe").is_err());
    }

    #[test]
    fn test_response_serialization() {
        let json = serde_json::to_string(&IpcResponse::Ok).unwrap();
        assert!(json.contains("ok"));

        let json = serde_json::to_string(&IpcResponse::Error {
            message: "No matching window found to update".to_string(),
        })
        .unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("No matching window"));
    }

    #[test]
    fn test_capability_keys_exposed() {
        let response = IpcResponse::Capabilities {
            keys: CAPABILITY_KEYS.iter().map(|k| k.to_string()).collect(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("icon-file"));
        assert!(json.contains("progress"));
        assert!(json.contains("message"));
        assert!(json.contains("visible"));
    }

    #[test]
    fn test_get_socket_path() {
        let path = get_socket_path().unwrap();
        assert!(path.ends_with("sway-taskdock.sock"));
    }
}
