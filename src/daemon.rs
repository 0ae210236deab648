use crate::config::Config;
use crate::dock_manager::DockManager;
use crate::icon_host::LogIconHost;
use crate::ipc::{CAPABILITY_KEYS, IpcCommand, IpcResponse};
use crate::launcher_resolver::LauncherResolver;
use crate::panel::StaticPanel;
use crate::proc_info::ProcFs;
use crate::shell_client::{RealShellClient, Rect, ShellEvent, WindowSnapshot};
use crate::socket_server::IpcRequest;
use anyhow::{Context as _, Result};
use futures_lite::stream::StreamExt;
use swayipc::{Node, NodeType};
use swayipc_async::{Connection, Event, EventType, WindowChange, WorkspaceChange};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

pub struct Daemon {
    manager: DockManager<RealShellClient, StaticPanel, LogIconHost, ProcFs>,
}

impl Daemon {
    pub fn new(config: &Config) -> Result<Self> {
        let shell = RealShellClient::new()?;
        let screen = query_screen_rect()?;
        let panel = StaticPanel::new(config.orientation, config.panel_size, screen);
        let manager = DockManager::new(
            shell,
            panel,
            LogIconHost,
            ProcFs,
            LauncherResolver::new(),
            std::process::id() as i32,
            config,
        );
        Ok(Daemon { manager })
    }

    /// Main event loop: shell events and control-surface requests are
    /// dispatched one at a time, never concurrently.
    pub async fn run(mut self, mut ipc_rx: mpsc::UnboundedReceiver<IpcRequest>) -> Result<()> {
        info!("Starting daemon event loop");

        let (shell_tx, mut shell_rx) = mpsc::unbounded_channel();
        let monitor = tokio::spawn(async move {
            if let Err(e) = monitor_shell_events(shell_tx).await {
                error!("Shell event monitoring error: {}", e);
            }
        });

        loop {
            tokio::select! {
                Some(event) = shell_rx.recv() => {
                    self.manager.handle_event(event);
                }
                Some(request) = ipc_rx.recv() => {
                    if self.handle_request(request) {
                        break;
                    }
                }
                else => {
                    info!("All channels closed, shutting down");
                    break;
                }
            }
        }

        monitor.abort();
        Ok(())
    }

    /// Returns true when the daemon should shut down
    fn handle_request(&mut self, request: IpcRequest) -> bool {
        let IpcRequest { command, reply } = request;
        let mut shutdown = false;

        let response = match command {
            IpcCommand::Update { window, hints } => {
                match self.manager.update_window(&window, &hints) {
                    Ok(()) => IpcResponse::Ok,
                    Err(e) => IpcResponse::Error {
                        message: e.to_string(),
                    },
                }
            }
            IpcCommand::Capabilities => IpcResponse::Capabilities {
                keys: CAPABILITY_KEYS.iter().map(|key| key.to_string()).collect(),
            },
            IpcCommand::AddLauncher { path } => {
                self.manager.add_launcher(path);
                IpcResponse::Ok
            }
            IpcCommand::SetLaunchers { paths } => {
                self.manager.set_launcher_paths(paths);
                IpcResponse::Ok
            }
            IpcCommand::Configure { setting } => {
                self.manager.configure(setting);
                IpcResponse::Ok
            }
            IpcCommand::Status => IpcResponse::Status {
                icon_count: self.manager.slots().len(),
                window_count: self.manager.window_count(),
                launcher_count: self.manager.launcher_count(),
                grouping: self.manager.grouping(),
                only_show_launchers: self.manager.only_show_launchers(),
                intellihide: self.manager.intellihide_enabled(),
            },
            IpcCommand::Shutdown => {
                info!("Shutdown requested");
                shutdown = true;
                IpcResponse::Ok
            }
        };

        if reply.send(response).is_err() {
            debug!("IPC client went away before the response");
        }
        shutdown
    }
}

/// Subscribe to shell events and translate them into engine events.
/// A second connection serves the tree queries needed to snapshot windows.
async fn monitor_shell_events(tx: mpsc::UnboundedSender<ShellEvent>) -> Result<()> {
    let mut query = Connection::new().await?;

    let subs = [EventType::Window, EventType::Workspace];
    let mut events = Connection::new().await?.subscribe(&subs).await?;
    info!("Subscribed to shell window and workspace events");

    seed_initial_state(&mut query, &tx).await?;

    while let Some(event) = events.next().await {
        match event? {
            Event::Window(e) => {
                debug!(
                    "Shell window event: {:?} for container {}",
                    e.change, e.container.id
                );
                match e.change {
                    WindowChange::New => {
                        if let Some(snapshot) = snapshot_window(&mut query, e.container.id).await {
                            let _ = tx.send(ShellEvent::WindowOpened(snapshot));
                        }
                    }
                    WindowChange::Close => {
                        let _ = tx.send(ShellEvent::WindowClosed(e.container.id));
                    }
                    WindowChange::Focus => {
                        let _ = tx.send(ShellEvent::ActiveWindowChanged(Some(e.container.id)));
                    }
                    WindowChange::Title | WindowChange::Move => {
                        if let Some(snapshot) = snapshot_window(&mut query, e.container.id).await {
                            let _ = tx.send(ShellEvent::WindowStateChanged(snapshot));
                        }
                    }
                    WindowChange::Floating | WindowChange::FullscreenMode => {
                        let _ = tx.send(ShellEvent::WindowGeometryChanged(e.container.id));
                    }
                    _ => {}
                }
            }
            Event::Workspace(e) => {
                if e.change == WorkspaceChange::Focus
                    && let Some(current) = e.current
                    && let Some(name) = current.name
                {
                    let _ = tx.send(ShellEvent::ActiveWorkspaceChanged(name));
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// Replay the windows that already exist at startup as opened events, then
/// the active workspace and focused window.
async fn seed_initial_state(
    query: &mut Connection,
    tx: &mpsc::UnboundedSender<ShellEvent>,
) -> Result<()> {
    let tree = query.get_tree().await?;

    let mut snapshots = Vec::new();
    collect_snapshots(&tree, None, &mut snapshots);
    debug!("Seeding {} existing windows", snapshots.len());
    for snapshot in snapshots {
        let _ = tx.send(ShellEvent::WindowOpened(snapshot));
    }

    if let Ok(workspaces) = query.get_workspaces().await
        && let Some(focused) = workspaces.iter().find(|w| w.focused)
    {
        let _ = tx.send(ShellEvent::ActiveWorkspaceChanged(focused.name.clone()));
    }
    if let Some(focused) = find_focused_window(&tree) {
        let _ = tx.send(ShellEvent::ActiveWindowChanged(Some(focused)));
    }

    Ok(())
}

async fn snapshot_window(query: &mut Connection, id: i64) -> Option<WindowSnapshot> {
    let tree = query.get_tree().await.ok()?;
    find_snapshot(&tree, id, None)
}

fn find_snapshot(node: &Node, id: i64, current_workspace: Option<&str>) -> Option<WindowSnapshot> {
    let workspace = if node.node_type == NodeType::Workspace {
        node.name.as_deref().or(current_workspace)
    } else {
        current_workspace
    };

    if node.id == id {
        return WindowSnapshot::from_node(node, workspace.map(str::to_string));
    }
    node.nodes
        .iter()
        .chain(node.floating_nodes.iter())
        .find_map(|child| find_snapshot(child, id, workspace))
}

fn collect_snapshots(node: &Node, current_workspace: Option<&str>, out: &mut Vec<WindowSnapshot>) {
    let workspace = if node.node_type == NodeType::Workspace {
        node.name.as_deref().or(current_workspace)
    } else {
        current_workspace
    };

    if let Some(snapshot) = WindowSnapshot::from_node(node, workspace.map(str::to_string)) {
        out.push(snapshot);
    }
    for child in node.nodes.iter().chain(node.floating_nodes.iter()) {
        collect_snapshots(child, workspace, out);
    }
}

fn find_focused_window(node: &Node) -> Option<i64> {
    if node.focused && node.pid.is_some() {
        return Some(node.id);
    }
    node.nodes
        .iter()
        .chain(node.floating_nodes.iter())
        .find_map(find_focused_window)
}

fn query_screen_rect() -> Result<Rect> {
    let mut connection = swayipc::Connection::new()?;
    let outputs = connection.get_outputs()?;
    let output = outputs
        .iter()
        .find(|output| output.active)
        .or_else(|| outputs.first())
        .context("No outputs reported by the shell")?;
    Ok(output.rect.clone().into())
}
