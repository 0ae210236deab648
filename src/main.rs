mod config;
mod daemon;
mod dock_manager;
mod drag;
mod icon_host;
mod icon_slot;
mod intellihide;
mod ipc;
mod launcher_resolver;
mod panel;
mod proc_info;
mod shell_client;
mod socket_client;
mod socket_server;
mod window_tracker;

use anyhow::{Context, Result};
use config::{Command, Config};
use daemon::Daemon;
use ipc::{IpcCommand, PolicySetting, WindowSpec};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

/// Get the path to the pidfile
fn get_pidfile_path() -> Result<PathBuf> {
    // Try to use XDG_RUNTIME_DIR, fall back to ~/.cache
    let runtime_dir = dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .context("Could not determine runtime directory")?;

    Ok(runtime_dir.join("sway-taskdock.pid"))
}

/// Check if another instance is already running
fn check_pidfile() -> Result<()> {
    let pidfile = get_pidfile_path()?;

    if pidfile.exists() {
        // Read the PID from the file
        let pid_str = fs::read_to_string(&pidfile).context("Failed to read pidfile")?;
        let pid: u32 = pid_str.trim().parse().context("Invalid PID in pidfile")?;

        // Check if the process is still running
        if process_exists(pid) {
            anyhow::bail!(
                "Another instance of sway-taskdock is already running (PID: {}). \
                 If this is incorrect, remove the pidfile at: {}",
                pid,
                pidfile.display()
            );
        } else {
            // Stale pidfile, remove it
            info!("Removing stale pidfile (PID {} not found)", pid);
            if let Err(e) = fs::remove_file(&pidfile) {
                tracing::warn!("Failed to remove stale pidfile: {}", e);
            }
        }
    }

    Ok(())
}

/// Check if a process with the given PID exists
fn process_exists(pid: u32) -> bool {
    // Check if /proc/<pid> exists (Linux-specific, but this is for Sway which is Linux-only)
    PathBuf::from(format!("/proc/{}", pid)).exists()
}

/// Create the pidfile
fn create_pidfile() -> Result<PidfileGuard> {
    let pidfile = get_pidfile_path()?;
    let pid = std::process::id();

    fs::write(&pidfile, pid.to_string()).context("Failed to write pidfile")?;

    info!("Created pidfile at {} with PID {}", pidfile.display(), pid);

    Ok(PidfileGuard { path: pidfile })
}

/// Guard that removes the pidfile when dropped
struct PidfileGuard {
    path: PathBuf,
}

impl Drop for PidfileGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            error!("Failed to remove pidfile: {}", e);
        } else {
            info!("Removed pidfile at {}", self.path.display());
        }
    }
}

/// Parse a CLI window specifier: numeric id, otherwise a display name
fn parse_window_spec(window: &str) -> WindowSpec {
    match window.parse::<i64>() {
        Ok(id) => WindowSpec::Id(id),
        Err(_) => WindowSpec::Name(window.to_string()),
    }
}

/// Turn a client subcommand into the IPC command it maps to
fn client_command(command: Command) -> Result<IpcCommand> {
    Ok(match command {
        Command::Daemon => unreachable!("daemon handled separately"),
        Command::Update {
            window,
            icon_file,
            progress,
            message,
        } => IpcCommand::Update {
            window: parse_window_spec(&window),
            hints: ipc::DecorationHints {
                icon_file,
                progress,
                message,
                visible: None,
            },
        },
        Command::Capabilities => IpcCommand::Capabilities,
        Command::AddLauncher { path } => IpcCommand::AddLauncher { path },
        Command::SetLaunchers { paths } => IpcCommand::SetLaunchers { paths },
        Command::Set { option, value } => IpcCommand::Configure {
            setting: PolicySetting::parse(option, &value)?,
        },
        Command::Status => IpcCommand::Status,
        Command::Shutdown => IpcCommand::Shutdown,
    })
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let config = Config::parse();

    // Initialize logging
    let log_level = if config.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match config.command() {
        Command::Daemon => run_daemon(config),
        command => {
            let ipc_command = client_command(command)?;
            socket_client::send_command_and_exit(&ipc_command);
        }
    }
}

fn run_daemon(config: Config) -> Result<()> {
    // Ignore SIGUSR1 signal to prevent crashes
    #[cfg(unix)]
    unsafe {
        use libc::{SIG_IGN, SIGUSR1, signal};
        signal(SIGUSR1, SIG_IGN);
    }

    info!("Starting sway-taskdock daemon");

    // Check if another instance is already running
    check_pidfile()?;

    // Create pidfile (will be automatically removed when the guard is dropped)
    let _pidfile_guard = create_pidfile()?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    runtime.block_on(async move {
        let (ipc_rx, _socket_guard) = socket_server::start_server().await?;
        let daemon = Daemon::new(&config)?;
        daemon.run(ipc_rx).await
    })
}
