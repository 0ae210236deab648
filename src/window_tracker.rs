//! Window classification and lifecycle tracking.
//!
//! Every window-opened event passes through `admit`, which filters out
//! surfaces that never belong on a task list and defers skip-tasklist
//! windows until their flag clears. Admitted windows get exactly one
//! `WindowRecord`, owned here and looked up by shell window id.

use crate::launcher_resolver::WindowIdentity;
use crate::proc_info::CommandInfo;
use crate::shell_client::{WindowId, WindowSnapshot, WindowType};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct WindowRecord {
    pub id: WindowId,
    pub pid: i32,
    pub window_type: WindowType,
    pub title: String,
    pub res_name: Option<String>,
    pub class_name: Option<String>,
    /// the workspace the window itself sits on
    pub workspace: Option<String>,
    /// active workspace captured while workspace scoping is on; None means
    /// the record is visible everywhere
    pub workspace_scope: Option<String>,
    pub is_active: bool,
    pub cmd: Option<String>,
    pub full_cmd: Option<String>,
}

impl WindowRecord {
    /// Visibility under the current workspace scoping
    pub fn visible_in_scope(&self) -> bool {
        match &self.workspace_scope {
            None => true,
            Some(scope) => self.workspace.as_deref() == Some(scope.as_str()),
        }
    }

    pub fn identity(&self) -> WindowIdentity {
        WindowIdentity {
            res_name: self.res_name.clone(),
            class_name: self.class_name.clone(),
            title: self.title.clone(),
            cmd: self.cmd.clone(),
            full_cmd: self.full_cmd.clone(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Admission {
    /// Never tracked: wrong type, or one of the dock's own surfaces
    Rejected(RejectReason),
    /// Skip-tasklist is set; watching for the flag to clear
    Watch,
    /// A record was created and inserted
    Admitted,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RejectReason {
    WindowType(WindowType),
    OwnProcess,
    AppletArtifact,
}

pub struct WindowTracker {
    own_pid: i32,
    applet_name: String,
    records: HashMap<WindowId, WindowRecord>,
    /// skip-tasklist windows awaiting a state change
    watched: HashSet<WindowId>,
    show_all_workspaces: bool,
    active_workspace: Option<String>,
}

impl WindowTracker {
    pub fn new(own_pid: i32, applet_name: &str, show_all_workspaces: bool) -> Self {
        WindowTracker {
            own_pid,
            applet_name: applet_name.to_string(),
            records: HashMap::new(),
            watched: HashSet::new(),
            show_all_workspaces,
            active_workspace: None,
        }
    }

    /// Decide whether a freshly opened window deserves tracking, and create
    /// its record if so. `cmd` is the owning process's command identity,
    /// captured once here for matching and descriptor resolution.
    pub fn admit(&mut self, snapshot: &WindowSnapshot, cmd: &CommandInfo) -> Admission {
        match snapshot.window_type {
            WindowType::Desktop
            | WindowType::Dock
            | WindowType::Toolbar
            | WindowType::Menu
            | WindowType::Splash => {
                return Admission::Rejected(RejectReason::WindowType(snapshot.window_type));
            }
            _ => {}
        }

        // The skip-tasklist flag on our own surfaces can flap briefly;
        // never track anything we own.
        if snapshot.pid == self.own_pid {
            return Admission::Rejected(RejectReason::OwnProcess);
        }
        if snapshot.title == self.applet_name {
            return Admission::Rejected(RejectReason::AppletArtifact);
        }

        if snapshot.skip_tasklist {
            self.watched.insert(snapshot.id);
            return Admission::Watch;
        }
        self.watched.remove(&snapshot.id);

        let record = WindowRecord {
            id: snapshot.id,
            pid: snapshot.pid,
            window_type: snapshot.window_type,
            title: snapshot.title.clone(),
            res_name: snapshot.res_name.clone(),
            class_name: snapshot.class_name.clone(),
            workspace: snapshot.workspace.clone(),
            workspace_scope: if self.show_all_workspaces {
                None
            } else {
                self.active_workspace.clone()
            },
            is_active: false,
            cmd: cmd.short.clone(),
            full_cmd: cmd.full.clone(),
        };
        debug!(
            "Tracking window {} ({:?}, pid {})",
            record.id, record.res_name, record.pid
        );
        self.records.insert(snapshot.id, record);
        Admission::Admitted
    }

    /// Remove a destroyed window's record. The caller detaches the record's
    /// item from its slot; this is the only removal path.
    pub fn remove(&mut self, id: WindowId) -> Option<WindowRecord> {
        self.watched.remove(&id);
        self.records.remove(&id)
    }

    /// React to a state change. Returns true when a watched window's
    /// skip-tasklist flag cleared and it should be re-admitted as if newly
    /// opened. Tracked windows get their mutable attributes refreshed.
    pub fn state_changed(&mut self, snapshot: &WindowSnapshot) -> bool {
        if self.watched.contains(&snapshot.id) {
            if !snapshot.skip_tasklist {
                self.watched.remove(&snapshot.id);
                return true;
            }
            return false;
        }
        if let Some(record) = self.records.get_mut(&snapshot.id) {
            record.title = snapshot.title.clone();
            if snapshot.workspace.is_some() {
                record.workspace = snapshot.workspace.clone();
            }
        }
        false
    }

    pub fn set_active_window(&mut self, id: Option<WindowId>) {
        for record in self.records.values_mut() {
            record.is_active = Some(record.id) == id;
        }
    }

    /// Workspace switches re-scope every record while scoping is on
    pub fn set_active_workspace(&mut self, workspace: &str) {
        self.active_workspace = Some(workspace.to_string());
        if !self.show_all_workspaces {
            for record in self.records.values_mut() {
                record.workspace_scope = Some(workspace.to_string());
            }
        }
    }

    /// Toggling the policy clears or repopulates the scope on all records
    pub fn set_show_all_workspaces(&mut self, show_all: bool) {
        if self.show_all_workspaces == show_all {
            return;
        }
        self.show_all_workspaces = show_all;
        let scope = if show_all {
            None
        } else {
            self.active_workspace.clone()
        };
        for record in self.records.values_mut() {
            record.workspace_scope = scope.clone();
        }
        debug!(
            "{}",
            if show_all {
                "showing all workspaces"
            } else {
                "scoping to the active workspace"
            }
        );
    }

    pub fn active_workspace(&self) -> Option<&str> {
        self.active_workspace.as_deref()
    }

    pub fn get(&self, id: WindowId) -> Option<&WindowRecord> {
        self.records.get(&id)
    }

    pub fn records(&self) -> impl Iterator<Item = &WindowRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_watched(&self, id: WindowId) -> bool {
        self.watched.contains(&id)
    }
}
