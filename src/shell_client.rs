//! Windowing-shell abstraction.
//!
//! This module provides a trait that abstracts the shell queries the dock
//! needs (window geometry, the full window list), plus the typed events the
//! daemon feeds into the engine. Mock implementations live in the tests of
//! the modules that consume them.

use anyhow::{Result, anyhow};
use swayipc::{Connection, Node, NodeType};

pub type WindowId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    Normal,
    Dialog,
    Utility,
    Desktop,
    Dock,
    Toolbar,
    Menu,
    Splash,
}

/// Screen-space rectangle, pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

impl From<swayipc::Rect> for Rect {
    fn from(r: swayipc::Rect) -> Self {
        Rect::new(r.x, r.y, r.width, r.height)
    }
}

/// Everything the classifier needs to know about a window at admission time.
#[derive(Debug, Clone)]
pub struct WindowSnapshot {
    pub id: WindowId,
    pub pid: i32,
    pub window_type: WindowType,
    pub skip_tasklist: bool,
    pub title: String,
    /// WM_CLASS instance for X11 windows, app_id for native Wayland ones
    pub res_name: Option<String>,
    pub class_name: Option<String>,
    pub workspace: Option<String>,
}

impl WindowSnapshot {
    /// Build a snapshot from a shell tree node. Only actual windows (views)
    /// qualify; containers have no pid.
    pub fn from_node(node: &Node, workspace: Option<String>) -> Option<Self> {
        if node.node_type != NodeType::Con && node.node_type != NodeType::FloatingCon {
            return None;
        }
        let pid = node.pid?;

        let res_name = node
            .window_properties
            .as_ref()
            .and_then(|props| props.instance.clone())
            .or_else(|| node.app_id.clone());
        let class_name = node
            .window_properties
            .as_ref()
            .and_then(|props| props.class.clone())
            .or_else(|| node.app_id.clone());

        Some(WindowSnapshot {
            id: node.id,
            pid,
            // Sway only places task-list-worthy views in its tree; docks,
            // menus and splash surfaces never show up as Con nodes. The
            // full type set is still part of the contract for other shells.
            window_type: WindowType::Normal,
            skip_tasklist: false,
            title: node.name.clone().unwrap_or_default(),
            res_name,
            class_name,
            workspace,
        })
    }
}

/// A window as seen by the intellihide scan: identity plus whatever
/// geometry the shell could report. `rect` is None when the geometry query
/// failed; the scan skips those windows.
#[derive(Debug, Clone)]
pub struct WindowOverview {
    pub id: WindowId,
    pub pid: i32,
    pub skip_tasklist: bool,
    pub workspace: Option<String>,
    pub rect: Option<Rect>,
}

/// Typed shell events, delivered to the engine one at a time.
#[derive(Debug, Clone)]
pub enum ShellEvent {
    WindowOpened(WindowSnapshot),
    WindowClosed(WindowId),
    /// State or attribute change (skip flag, title, workspace move)
    WindowStateChanged(WindowSnapshot),
    WindowGeometryChanged(WindowId),
    ActiveWindowChanged(Option<WindowId>),
    ActiveWorkspaceChanged(String),
}

/// Trait for on-demand shell queries.
///
/// This abstraction allows for mock implementations in tests.
pub trait ShellClient {
    /// Geometry of a single window, screen coordinates
    fn window_geometry(&mut self, id: WindowId) -> Result<Rect>;

    /// Every window the shell knows about, for the intellihide scan
    fn windows(&mut self) -> Result<Vec<WindowOverview>>;
}

/// Real implementation using swayipc
pub struct RealShellClient {
    connection: Connection,
}

impl RealShellClient {
    pub fn new() -> Result<Self> {
        let connection = Connection::new()?;
        Ok(RealShellClient { connection })
    }
}

impl ShellClient for RealShellClient {
    fn window_geometry(&mut self, id: WindowId) -> Result<Rect> {
        let tree = self.connection.get_tree()?;
        find_node(&tree, id)
            .map(|node| node.rect.clone().into())
            .ok_or_else(|| anyhow!("window {} not in tree", id))
    }

    fn windows(&mut self) -> Result<Vec<WindowOverview>> {
        let tree = self.connection.get_tree()?;
        Ok(collect_overviews(&tree, None))
    }
}

fn find_node<'a>(node: &'a Node, id: WindowId) -> Option<&'a Node> {
    if node.id == id {
        return Some(node);
    }
    node.nodes
        .iter()
        .chain(node.floating_nodes.iter())
        .find_map(|child| find_node(child, id))
}

fn collect_overviews(node: &Node, current_workspace: Option<&str>) -> Vec<WindowOverview> {
    let workspace = if node.node_type == NodeType::Workspace {
        node.name.as_deref().or(current_workspace)
    } else {
        current_workspace
    };

    let mut windows = Vec::new();
    if (node.node_type == NodeType::Con || node.node_type == NodeType::FloatingCon)
        && let Some(pid) = node.pid
    {
        windows.push(WindowOverview {
            id: node.id,
            pid,
            skip_tasklist: false,
            workspace: workspace.map(str::to_string),
            rect: Some(node.rect.clone().into()),
        });
    }

    for child in node.nodes.iter().chain(node.floating_nodes.iter()) {
        windows.extend(collect_overviews(child, workspace));
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersects_overlapping() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 50, 100, 100);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn test_rect_intersects_disjoint() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(200, 0, 50, 50);
        assert!(!a.intersects(&b));
        assert!(!b.intersects(&a));
    }

    #[test]
    fn test_rect_touching_edges_do_not_intersect() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(100, 0, 50, 100);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_rect_containment_intersects() {
        let outer = Rect::new(0, 0, 1920, 1080);
        let inner = Rect::new(500, 500, 10, 10);
        assert!(outer.intersects(&inner));
        assert!(inner.intersects(&outer));
    }
}
