//! The dock's task-list engine.
//!
//! Owns every icon slot and window record, reacts to shell events one at a
//! time, and drives the visual layer. Placement of a new window either
//! merges it into the best-matching existing slot or creates a fresh slot
//! and consults the launcher resolver for a descriptor.

use crate::config::Config;
use crate::drag::DragController;
use crate::icon_host::{IconEffect, IconHost};
use crate::icon_slot::{IconSlot, Item, ItemIdentity, SlotId, pair_score};
use crate::intellihide::IntellihideController;
use crate::ipc::{DecorationHints, PolicySetting, WindowSpec};
use crate::launcher_resolver::{LauncherDescriptor, LauncherResolver};
use crate::panel::PanelHost;
use crate::proc_info::{CommandInfo, ProcInspector};
use crate::shell_client::{ShellClient, ShellEvent, WindowId, WindowSnapshot};
use crate::window_tracker::{Admission, WindowTracker};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Name our own surfaces report; such windows are never tracked
pub const APPLET_NAME: &str = "sway-taskdock";

/// Control-surface failures reported back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    UnsupportedSpecifier,
    NoWindowMatch,
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateError::UnsupportedSpecifier => {
                write!(f, "Window can be specified only by its name or numeric id")
            }
            UpdateError::NoWindowMatch => write!(f, "No matching window found to update"),
        }
    }
}

impl std::error::Error for UpdateError {}

pub struct DockManager<S, P, V, I>
where
    S: ShellClient,
    P: PanelHost,
    V: IconHost,
    I: ProcInspector,
{
    shell: S,
    host: V,
    proc: I,
    resolver: LauncherResolver,
    tracker: WindowTracker,
    slots: Vec<IconSlot>,
    next_slot_id: SlotId,
    drag: DragController,
    intellihide: IntellihideController<P>,
    only_show_launchers: bool,
    drag_and_drop: bool,
    grouping: bool,
    match_strength: i32,
    launcher_paths: Vec<PathBuf>,
    active_window: Option<WindowId>,
}

impl<S, P, V, I> DockManager<S, P, V, I>
where
    S: ShellClient,
    P: PanelHost,
    V: IconHost,
    I: ProcInspector,
{
    pub fn new(
        shell: S,
        panel: P,
        host: V,
        proc: I,
        resolver: LauncherResolver,
        own_pid: i32,
        config: &Config,
    ) -> Self {
        let mut manager = DockManager {
            shell,
            host,
            proc,
            resolver,
            tracker: WindowTracker::new(own_pid, APPLET_NAME, config.show_all_workspaces),
            slots: Vec::new(),
            next_slot_id: 1,
            drag: DragController::new(),
            intellihide: IntellihideController::new(
                panel,
                config.intellihide,
                config.intellihide_mode,
            ),
            only_show_launchers: config.only_show_launchers,
            drag_and_drop: config.drag_and_drop,
            grouping: config.grouping,
            match_strength: config.match_strength,
            launcher_paths: Vec::new(),
            active_window: None,
        };
        manager.set_launcher_paths(config.launchers.clone());
        manager
    }

    /// Single entry point for shell events, dispatched one at a time
    pub fn handle_event(&mut self, event: ShellEvent) {
        match event {
            ShellEvent::WindowOpened(snapshot) => self.on_window_opened(&snapshot),
            ShellEvent::WindowClosed(id) => self.on_window_closed(id),
            ShellEvent::WindowStateChanged(snapshot) => self.on_window_state_changed(&snapshot),
            ShellEvent::WindowGeometryChanged(_) => self.check_intersection(),
            ShellEvent::ActiveWindowChanged(id) => self.on_active_window_changed(id),
            ShellEvent::ActiveWorkspaceChanged(workspace) => {
                self.on_active_workspace_changed(&workspace)
            }
        }
    }

    /*
     * Window lifecycle
     */

    fn on_window_opened(&mut self, snapshot: &WindowSnapshot) {
        let cmd = CommandInfo::for_pid(&self.proc, snapshot.pid);
        match self.tracker.admit(snapshot, &cmd) {
            Admission::Rejected(reason) => {
                debug!("Ignoring window {}: {:?}", snapshot.id, reason);
            }
            Admission::Watch => {
                debug!("Watching skip-tasklist window {}", snapshot.id);
            }
            Admission::Admitted => self.place_window(snapshot.id),
        }
    }

    fn on_window_closed(&mut self, id: WindowId) {
        if self.tracker.remove(id).is_none() {
            return;
        }
        if self.active_window == Some(id) {
            self.active_window = None;
        }
        let Some(index) = self.slot_index_of_window(id) else {
            return;
        };
        self.slots[index].remove_window(id);
        if self.slots[index].is_empty() || self.slots[index].only_ephemeral() {
            self.destroy_slot(index);
        } else {
            self.update_icon_visible(index);
        }
    }

    fn on_window_state_changed(&mut self, snapshot: &WindowSnapshot) {
        if self.tracker.state_changed(snapshot) {
            // skip-tasklist cleared: treat it as a fresh open
            self.on_window_opened(snapshot);
            return;
        }
        if let Some(index) = self.slot_index_of_window(snapshot.id) {
            self.update_icon_visible(index);
        }
        self.check_intersection();
    }

    fn on_active_window_changed(&mut self, id: Option<WindowId>) {
        self.active_window = id;
        self.tracker.set_active_window(id);
        self.check_intersection();
    }

    fn on_active_workspace_changed(&mut self, workspace: &str) {
        self.tracker.set_active_workspace(workspace);
        self.refresh_all_visibility();
        self.check_intersection();
    }

    /*
     * Placement
     */

    /// Merge the admitted window into the best-matching slot, or create a
    /// new one and hunt for a launcher descriptor.
    fn place_window(&mut self, id: WindowId) {
        let (best, best_score) = self.best_matching_slot(id);
        if let Some(index) = best
            && (self.grouping || self.slots[index].len() == 1)
            && i32::from(best_score) > 99 - self.match_strength
        {
            debug!(
                "Window {} joins slot {} with score {}",
                id, self.slots[index].id, best_score
            );
            self.slots[index].push_item(Item::window(id));
            self.update_icon_visible(index);
            return;
        }

        let descriptor = self
            .tracker
            .get(id)
            .and_then(|record| self.resolver.resolve(&record.identity()));

        let mut slot = IconSlot::new(self.alloc_slot_id());
        if let Some(descriptor) = descriptor {
            debug!("Window {} gets descriptor {:?}", id, descriptor.path);
            slot.push_item(Item::ephemeral_launcher(descriptor));
        }
        slot.push_item(Item::window(id));

        let slot_id = slot.id;
        let index = self.slots.len();
        self.slots.push(slot);
        self.host.icon_added(slot_id, index);
        self.update_icon_visible(index);
    }

    fn best_matching_slot(&self, id: WindowId) -> (Option<usize>, u8) {
        let Some(record) = self.tracker.get(id) else {
            return (None, 0);
        };
        let incoming = ItemIdentity::Window {
            res_name: record.res_name.as_deref(),
            class_name: record.class_name.as_deref(),
            cmd: record.cmd.as_deref(),
            full_cmd: record.full_cmd.as_deref(),
        };

        let mut best = None;
        let mut best_score = 0u8;
        for (index, slot) in self.slots.iter().enumerate() {
            let score = self.slot_score(slot, &incoming, id);
            if score > best_score {
                best_score = score;
                best = Some(index);
            }
        }
        (best, best_score)
    }

    /// A slot matches as strongly as its best item does
    fn slot_score(&self, slot: &IconSlot, incoming: &ItemIdentity, exclude: WindowId) -> u8 {
        slot.items()
            .iter()
            .filter_map(|item| {
                let identity = match item {
                    Item::Window { id, .. } => {
                        if *id == exclude {
                            return None;
                        }
                        let record = self.tracker.get(*id)?;
                        ItemIdentity::Window {
                            res_name: record.res_name.as_deref(),
                            class_name: record.class_name.as_deref(),
                            cmd: record.cmd.as_deref(),
                            full_cmd: record.full_cmd.as_deref(),
                        }
                    }
                    Item::Launcher { descriptor, .. } => ItemIdentity::Launcher {
                        path: &descriptor.path,
                        stem: descriptor.stem(),
                        exec: &descriptor.exec,
                    },
                };
                Some(pair_score(&identity, incoming))
            })
            .max()
            .unwrap_or(0)
    }

    /*
     * Launchers
     */

    /// Append a launcher path and reconcile
    pub fn add_launcher(&mut self, path: PathBuf) {
        info!("Appending launcher {:?}", path);
        self.launcher_paths.push(path);
        self.refresh_launcher_paths();
    }

    /// Replace the configured launcher list and reconcile
    pub fn set_launcher_paths(&mut self, paths: Vec<PathBuf>) {
        self.launcher_paths = paths;
        self.refresh_launcher_paths();
    }

    /// Add slots for configured launchers that are not on the dock yet, at
    /// the index their position in the list implies. Never removes slots.
    fn refresh_launcher_paths(&mut self) {
        let paths = self.launcher_paths.clone();
        for (index, path) in paths.iter().enumerate() {
            if let Some(existing) = self
                .slots
                .iter()
                .position(|slot| slot.contains_launcher_path(path))
            {
                // a placeholder discovered for the same descriptor becomes
                // a real launcher item
                let has_placeholder = self.slots[existing]
                    .items()
                    .iter()
                    .any(|item| item.is_ephemeral() && item.descriptor().is_some_and(|d| d.path == *path));
                if has_placeholder
                    && let Some(descriptor) = LauncherDescriptor::from_desktop_file(path)
                {
                    self.slots[existing].push_item(Item::launcher(descriptor));
                    self.update_icon_visible(existing);
                }
                continue;
            }

            let Some(descriptor) = LauncherDescriptor::from_desktop_file(path) else {
                debug!("Bad desktop file {:?}", path);
                continue;
            };
            let mut slot = IconSlot::new(self.alloc_slot_id());
            slot.push_item(Item::launcher(descriptor));
            let slot_id = slot.id;
            let insert_at = index.min(self.slots.len());
            self.slots.insert(insert_at, slot);
            self.host.icon_added(slot_id, insert_at);
            self.update_icon_visible(insert_at);
        }
    }

    /*
     * Control surface
     */

    /// Update the decoration of the item backing the specified window
    pub fn update_window(
        &mut self,
        spec: &WindowSpec,
        hints: &DecorationHints,
    ) -> Result<(), UpdateError> {
        let id = match spec {
            WindowSpec::Id(id) => self.match_id(*id),
            WindowSpec::Name(name) => self.match_name(name),
            WindowSpec::Unsupported(_) => return Err(UpdateError::UnsupportedSpecifier),
        }
        .ok_or(UpdateError::NoWindowMatch)?;

        let index = self
            .slot_index_of_window(id)
            .ok_or(UpdateError::NoWindowMatch)?;
        let slot_id = self.slots[index].id;
        let decoration = self.slots[index]
            .decoration_mut(id)
            .ok_or(UpdateError::NoWindowMatch)?;

        if let Some(icon_file) = &hints.icon_file {
            decoration.icon_file = if icon_file.is_empty() {
                None
            } else {
                Some(icon_file.clone())
            };
        }
        if let Some(progress) = hints.progress {
            decoration.progress = if progress == -1 { None } else { Some(progress) };
        }
        if let Some(message) = &hints.message {
            decoration.message = Some(message.clone());
        }
        if hints.visible.is_some() {
            debug!("Request to change visibility...");
        }

        self.host.refresh_icon(slot_id);
        Ok(())
    }

    /// Application name first, then the window title, both case-insensitive
    fn match_name(&self, name: &str) -> Option<WindowId> {
        self.tracker
            .records()
            .find(|record| {
                record
                    .class_name
                    .as_deref()
                    .is_some_and(|class| class.eq_ignore_ascii_case(name))
            })
            .or_else(|| {
                self.tracker
                    .records()
                    .find(|record| record.title.eq_ignore_ascii_case(name))
            })
            .map(|record| record.id)
    }

    fn match_id(&self, id: WindowId) -> Option<WindowId> {
        self.tracker.get(id).map(|record| record.id)
    }

    /// Apply a runtime policy change
    pub fn configure(&mut self, setting: PolicySetting) {
        match setting {
            PolicySetting::ShowAllWorkspaces(value) => {
                self.tracker.set_show_all_workspaces(value);
                self.refresh_all_visibility();
            }
            PolicySetting::OnlyShowLaunchers(value) => {
                self.only_show_launchers = value;
                debug!(
                    "{}",
                    if value {
                        "only show launchers"
                    } else {
                        "show everything"
                    }
                );
                self.refresh_all_visibility();
            }
            PolicySetting::DragAndDrop(value) => {
                self.drag_and_drop = value;
                if !value && self.drag.is_dragging() {
                    self.fail_drag();
                }
            }
            PolicySetting::Grouping(value) => self.grouping = value,
            PolicySetting::MatchStrength(value) => self.match_strength = value,
            PolicySetting::Intellihide(value) => {
                self.intellihide.set_enabled(value);
                if value {
                    self.check_intersection();
                }
            }
            PolicySetting::IntellihideMode(mode) => {
                self.intellihide.set_mode(mode);
                self.check_intersection();
            }
        }
    }

    /*
     * Dragging
     */

    pub fn begin_drag(&mut self, slot_id: SlotId) {
        if !self.drag_and_drop {
            return;
        }
        let Some(index) = self.slot_index(slot_id) else {
            return;
        };
        self.drag.begin(slot_id, index);
        self.host.show_placeholder(index);
    }

    pub fn drag_motion(&mut self, x: f64, y: f64, over_slot: SlotId) {
        let Some(over_index) = self.slot_index(over_slot) else {
            return;
        };
        let orientation = self.intellihide.panel().orientation();
        let size = self.intellihide.panel().size();
        self.drag.motion(x, y, over_index, orientation, size);
        if let Some(state) = self.drag.state() {
            self.host.move_placeholder(state.placeholder);
        }
    }

    pub fn on_drag_leave(&mut self) {
        self.drag.leave();
    }

    pub fn on_drag_leave_timeout(&mut self) {
        self.drag.leave_timeout();
        if self.drag.state().is_some_and(|state| !state.placeholder_visible) {
            self.host.hide_placeholder();
        }
    }

    /// Commit the drop: the dragged slot moves to the placeholder's index
    pub fn end_drag(&mut self) {
        let Some((slot_id, target)) = self.drag.end() else {
            return;
        };
        self.host.hide_placeholder();
        let Some(from) = self.slot_index(slot_id) else {
            return;
        };
        let slot = self.slots.remove(from);
        let target = target.min(self.slots.len());
        self.slots.insert(target, slot);
        self.host.reorder_icon(slot_id, target);
    }

    /// A failed drag is handled like a drop
    pub fn fail_drag(&mut self) {
        self.end_drag();
    }

    /*
     * Visibility
     */

    /// An icon is visible iff it holds a visible item, and under the
    /// only-show-launchers policy also a launcher item.
    fn slot_should_show(&self, slot: &IconSlot) -> bool {
        let any_visible = slot.items().iter().any(|item| match item {
            Item::Window { id, .. } => self
                .tracker
                .get(*id)
                .is_some_and(|record| record.visible_in_scope()),
            Item::Launcher { .. } => true,
        });
        any_visible && (!self.only_show_launchers || slot.contains_launcher())
    }

    fn update_icon_visible(&mut self, index: usize) {
        let should_show = self.slot_should_show(&self.slots[index]);
        let slot = &mut self.slots[index];
        if should_show && !slot.shown {
            slot.shown = true;
            slot.closing = false;
            self.host.show_icon(slot.id);
        } else if !should_show && slot.shown && !slot.closing {
            if self.host.hide_icon(slot.id) {
                // physically hidden once the closing transition finishes
                slot.closing = true;
            } else {
                slot.shown = false;
            }
        }
    }

    fn refresh_all_visibility(&mut self) {
        for index in 0..self.slots.len() {
            self.update_icon_visible(index);
        }
    }

    /// The visual layer finished a transition
    pub fn on_icon_animation_finished(&mut self, slot_id: SlotId, effect: IconEffect) {
        if effect != IconEffect::Closing {
            return;
        }
        if let Some(index) = self.slot_index(slot_id) {
            if self.slots[index].closing {
                self.slots[index].closing = false;
                self.slots[index].shown = false;
                // visibility may have flipped back while the transition ran
                self.update_icon_visible(index);
            }
        }
    }

    /*
     * Intellihide
     */

    fn check_intersection(&mut self) {
        let active_pid = self
            .active_window
            .and_then(|id| self.tracker.get(id))
            .map(|record| record.pid);
        let workspace = self.tracker.active_workspace().map(str::to_string);
        self.intellihide
            .check(&mut self.shell, workspace.as_deref(), active_pid);
    }

    /*
     * Bookkeeping
     */

    fn destroy_slot(&mut self, index: usize) {
        let slot = self.slots.remove(index);
        debug!("Destroying slot {}", slot.id);
        if self.drag.state().is_some_and(|state| state.slot == slot.id) {
            self.drag.fail();
            self.host.hide_placeholder();
        }
        self.host.icon_removed(slot.id);
    }

    fn alloc_slot_id(&mut self) -> SlotId {
        let id = self.next_slot_id;
        self.next_slot_id += 1;
        id
    }

    fn slot_index(&self, slot_id: SlotId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.id == slot_id)
    }

    fn slot_index_of_window(&self, id: WindowId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.window_ids().any(|window| window == id))
    }

    pub fn slots(&self) -> &[IconSlot] {
        &self.slots
    }

    pub fn window_count(&self) -> usize {
        self.tracker.len()
    }

    pub fn launcher_count(&self) -> usize {
        self.slots
            .iter()
            .flat_map(|slot| slot.items())
            .filter(|item| item.is_launcher())
            .count()
    }

    pub fn grouping(&self) -> bool {
        self.grouping
    }

    pub fn only_show_launchers(&self) -> bool {
        self.only_show_launchers
    }

    pub fn intellihide_enabled(&self) -> bool {
        self.intellihide.enabled()
    }

    #[cfg(test)]
    fn intellihide(&self) -> &IntellihideController<P> {
        &self.intellihide
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Orientation};
    use crate::panel::{InhibitCookie, Region};
    use crate::shell_client::{Rect, WindowOverview, WindowType};
    use anyhow::{Result, anyhow};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct FakeShell {
        windows: Vec<WindowOverview>,
    }

    impl ShellClient for FakeShell {
        fn window_geometry(&mut self, id: WindowId) -> Result<Rect> {
            self.windows
                .iter()
                .find(|w| w.id == id)
                .and_then(|w| w.rect)
                .ok_or_else(|| anyhow!("no geometry"))
        }

        fn windows(&mut self) -> Result<Vec<WindowOverview>> {
            Ok(self.windows.clone())
        }
    }

    struct FakePanel {
        region: Region,
    }

    impl PanelHost for FakePanel {
        fn orientation(&self) -> Orientation {
            Orientation::Bottom
        }

        fn size(&self) -> u32 {
            48
        }

        fn origin(&mut self) -> Result<(i32, i32)> {
            Ok((0, 1032))
        }

        fn input_region(&mut self) -> Result<Region> {
            Ok(self.region.clone())
        }

        fn inhibit_autohide(&mut self, _reason: &str) -> InhibitCookie {
            1
        }

        fn uninhibit_autohide(&mut self, _cookie: InhibitCookie) {}
    }

    /// Records every visual-layer call; `animate` controls whether hiding
    /// pretends to run a closing transition.
    #[derive(Default)]
    struct RecordingHost {
        calls: Vec<String>,
        animate: bool,
    }

    impl IconHost for RecordingHost {
        fn icon_added(&mut self, slot: SlotId, index: usize) {
            self.calls.push(format!("added {} at {}", slot, index));
        }

        fn icon_removed(&mut self, slot: SlotId) {
            self.calls.push(format!("removed {}", slot));
        }

        fn show_icon(&mut self, slot: SlotId) {
            self.calls.push(format!("show {}", slot));
        }

        fn hide_icon(&mut self, slot: SlotId) -> bool {
            self.calls.push(format!("hide {}", slot));
            self.animate
        }

        fn reorder_icon(&mut self, slot: SlotId, index: usize) {
            self.calls.push(format!("reorder {} to {}", slot, index));
        }

        fn refresh_icon(&mut self, slot: SlotId) {
            self.calls.push(format!("refresh {}", slot));
        }

        fn show_placeholder(&mut self, index: usize) {
            self.calls.push(format!("placeholder at {}", index));
        }

        fn move_placeholder(&mut self, index: usize) {
            self.calls.push(format!("placeholder to {}", index));
        }

        fn hide_placeholder(&mut self) {
            self.calls.push("placeholder hidden".to_string());
        }
    }

    struct FakeProc;

    impl ProcInspector for FakeProc {
        fn args(&self, pid: i32) -> Result<Vec<String>> {
            // deterministic command derived from the pid used by make_snapshot
            Ok(vec![format!("/usr/bin/app-{}", pid)])
        }
    }

    const OWN_PID: i32 = 4242;

    type TestManager = DockManager<FakeShell, FakePanel, RecordingHost, FakeProc>;

    fn make_config(args: &[&str]) -> Config {
        let mut argv = vec!["sway-taskdock"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    fn make_manager_with(resolver: LauncherResolver, args: &[&str]) -> TestManager {
        DockManager::new(
            FakeShell { windows: vec![] },
            FakePanel {
                region: Region::from_rect(Rect::new(0, 0, 1920, 48)),
            },
            RecordingHost::default(),
            FakeProc,
            resolver,
            OWN_PID,
            &make_config(args),
        )
    }

    fn make_manager(args: &[&str]) -> TestManager {
        make_manager_with(LauncherResolver::with_dirs(vec![], None), args)
    }

    fn make_snapshot(id: WindowId, res_name: &str) -> WindowSnapshot {
        WindowSnapshot {
            id,
            // same res_name -> same fake command
            pid: 1000 + res_name.len() as i32 * 7,
            window_type: WindowType::Normal,
            skip_tasklist: false,
            title: format!("{} window", res_name),
            res_name: Some(res_name.to_string()),
            class_name: Some(res_name.to_string()),
            workspace: Some("1".to_string()),
        }
    }

    fn open_window(manager: &mut TestManager, id: WindowId, res_name: &str) {
        manager.handle_event(ShellEvent::WindowOpened(make_snapshot(id, res_name)));
    }

    fn write_desktop(dir: &Path, name: &str, exec: &str) -> std::path::PathBuf {
        let path = dir.join(format!("{}.desktop", name));
        fs::write(
            &path,
            format!("[Desktop Entry]\nType=Application\nName={}\nExec={}\n", name, exec),
        )
        .unwrap();
        path
    }

    // ==================== placement ====================

    #[test]
    fn test_new_window_creates_slot_with_descriptor() {
        // Scenario: a window resolving to firefox.desktop opens with no
        // matching slot around
        let system = TempDir::new().unwrap();
        write_desktop(system.path(), "firefox", "firefox %u");
        let resolver = LauncherResolver::with_dirs(vec![system.path().to_path_buf()], None);
        let mut manager = make_manager_with(resolver, &[]);

        open_window(&mut manager, 1, "Firefox");

        assert_eq!(manager.slots().len(), 1);
        let slot = &manager.slots()[0];
        assert_eq!(slot.len(), 2);
        assert!(slot.contains_launcher());
        assert!(slot.items()[0].is_ephemeral());
        assert_eq!(slot.items()[1].window_id(), Some(1));
        assert!(slot.shown);
    }

    #[test]
    fn test_same_application_groups_into_one_slot() {
        let mut manager = make_manager(&["--match-strength", "50"]);

        open_window(&mut manager, 1, "xterm");
        open_window(&mut manager, 2, "xterm");

        assert_eq!(manager.slots().len(), 1);
        assert_eq!(manager.slots()[0].window_ids().count(), 2);
    }

    #[test]
    fn test_strict_match_strength_never_groups() {
        let mut manager = make_manager(&["--match-strength", "0"]);

        open_window(&mut manager, 1, "xterm");
        open_window(&mut manager, 2, "xterm");

        // identical identity scores 99, which does not exceed 99 - 0
        assert_eq!(manager.slots().len(), 2);
    }

    #[test]
    fn test_loose_match_strength_groups_nonzero_scores() {
        // two windows of one process with unrelated res/class names score
        // 90 on command-line equality
        let mut manager = make_manager(&["--match-strength", "99"]);
        let mut first = make_snapshot(1, "editor");
        first.pid = 1300;
        let mut second = make_snapshot(2, "scratchpad");
        second.pid = 1300;

        manager.handle_event(ShellEvent::WindowOpened(first.clone()));
        manager.handle_event(ShellEvent::WindowOpened(second.clone()));
        assert_eq!(manager.slots().len(), 1);

        // the same pair stays apart under a strict threshold
        let mut strict = make_manager(&["--match-strength", "0"]);
        strict.handle_event(ShellEvent::WindowOpened(first));
        strict.handle_event(ShellEvent::WindowOpened(second));
        assert_eq!(strict.slots().len(), 2);
    }

    #[test]
    fn test_unrelated_windows_get_separate_slots() {
        let mut manager = make_manager(&["--match-strength", "50"]);

        open_window(&mut manager, 1, "xterm");
        open_window(&mut manager, 2, "gimp");

        assert_eq!(manager.slots().len(), 2);
    }

    #[test]
    fn test_grouping_disabled_only_joins_single_item_slots() {
        let mut manager = make_manager(&["--grouping", "false", "--match-strength", "50"]);

        open_window(&mut manager, 1, "xterm");
        // the first slot holds exactly one item, so joining is still allowed
        open_window(&mut manager, 2, "xterm");
        assert_eq!(manager.slots().len(), 1);

        // now the slot holds two items and grouping is off
        open_window(&mut manager, 3, "xterm");
        assert_eq!(manager.slots().len(), 2);
    }

    #[test]
    fn test_window_joins_matching_launcher_slot() {
        let system = TempDir::new().unwrap();
        let path = write_desktop(system.path(), "xterm", "xterm");
        let mut manager = make_manager(&["--match-strength", "50"]);
        manager.add_launcher(path);
        assert_eq!(manager.slots().len(), 1);

        open_window(&mut manager, 1, "xterm");

        // stem matches the class name, so the window lands on its launcher
        assert_eq!(manager.slots().len(), 1);
        assert_eq!(manager.slots()[0].len(), 2);
    }

    // ==================== lifecycle ====================

    #[test]
    fn test_closing_last_window_destroys_slot() {
        let mut manager = make_manager(&[]);
        open_window(&mut manager, 1, "xterm");
        assert_eq!(manager.slots().len(), 1);

        manager.handle_event(ShellEvent::WindowClosed(1));
        assert_eq!(manager.slots().len(), 0);
        assert_eq!(manager.window_count(), 0);
    }

    #[test]
    fn test_closing_one_of_two_windows_keeps_slot() {
        let mut manager = make_manager(&["--match-strength", "50"]);
        open_window(&mut manager, 1, "xterm");
        open_window(&mut manager, 2, "xterm");

        manager.handle_event(ShellEvent::WindowClosed(1));
        assert_eq!(manager.slots().len(), 1);
        assert_eq!(manager.slots()[0].window_ids().count(), 1);
    }

    #[test]
    fn test_slot_with_only_placeholder_left_is_destroyed() {
        let system = TempDir::new().unwrap();
        write_desktop(system.path(), "firefox", "firefox %u");
        let resolver = LauncherResolver::with_dirs(vec![system.path().to_path_buf()], None);
        let mut manager = make_manager_with(resolver, &[]);

        open_window(&mut manager, 1, "Firefox");
        manager.handle_event(ShellEvent::WindowClosed(1));

        // the ephemeral launcher cannot keep the slot alive
        assert_eq!(manager.slots().len(), 0);
    }

    #[test]
    fn test_configured_launcher_slot_survives_window_close() {
        let system = TempDir::new().unwrap();
        let path = write_desktop(system.path(), "xterm", "xterm");
        let mut manager = make_manager(&["--match-strength", "50"]);
        manager.add_launcher(path);

        open_window(&mut manager, 1, "xterm");
        manager.handle_event(ShellEvent::WindowClosed(1));

        assert_eq!(manager.slots().len(), 1);
        assert!(manager.slots()[0].contains_launcher());
    }

    #[test]
    fn test_skip_tasklist_window_admitted_after_flag_clears() {
        let mut manager = make_manager(&[]);
        let mut snapshot = make_snapshot(1, "xterm");
        snapshot.skip_tasklist = true;

        manager.handle_event(ShellEvent::WindowOpened(snapshot.clone()));
        assert_eq!(manager.slots().len(), 0);

        snapshot.skip_tasklist = false;
        manager.handle_event(ShellEvent::WindowStateChanged(snapshot));
        assert_eq!(manager.slots().len(), 1);
        assert_eq!(manager.window_count(), 1);
    }

    // ==================== launchers ====================

    #[test]
    fn test_refresh_launchers_is_idempotent() {
        let system = TempDir::new().unwrap();
        let a = write_desktop(system.path(), "firefox", "firefox %u");
        let b = write_desktop(system.path(), "xterm", "xterm");
        let mut manager = make_manager(&[]);

        manager.set_launcher_paths(vec![a.clone(), b.clone()]);
        assert_eq!(manager.slots().len(), 2);

        manager.set_launcher_paths(vec![a, b]);
        assert_eq!(manager.slots().len(), 2);
    }

    #[test]
    fn test_launchers_inserted_at_configured_index() {
        let system = TempDir::new().unwrap();
        let a = write_desktop(system.path(), "firefox", "firefox %u");
        let b = write_desktop(system.path(), "xterm", "xterm");
        let mut manager = make_manager(&[]);

        open_window(&mut manager, 1, "gimp");
        manager.set_launcher_paths(vec![a.clone(), b.clone()]);

        assert_eq!(manager.slots().len(), 3);
        assert!(manager.slots()[0].contains_launcher_path(&a));
        assert!(manager.slots()[1].contains_launcher_path(&b));
        assert_eq!(manager.slots()[2].window_ids().count(), 1);
    }

    #[test]
    fn test_refresh_does_not_remove_missing_paths() {
        let system = TempDir::new().unwrap();
        let a = write_desktop(system.path(), "firefox", "firefox %u");
        let b = write_desktop(system.path(), "xterm", "xterm");
        let mut manager = make_manager(&[]);

        manager.set_launcher_paths(vec![a.clone(), b]);
        assert_eq!(manager.slots().len(), 2);

        manager.set_launcher_paths(vec![a]);
        assert_eq!(manager.slots().len(), 2);
    }

    #[test]
    fn test_unreadable_descriptor_is_skipped() {
        let mut manager = make_manager(&[]);
        manager.add_launcher(PathBuf::from("/nonexistent/launcher.desktop"));
        assert_eq!(manager.slots().len(), 0);
    }

    #[test]
    fn test_configured_launcher_promotes_placeholder() {
        let system = TempDir::new().unwrap();
        let path = write_desktop(system.path(), "firefox", "firefox %u");
        let resolver = LauncherResolver::with_dirs(vec![system.path().to_path_buf()], None);
        let mut manager = make_manager_with(resolver, &[]);

        open_window(&mut manager, 1, "Firefox");
        assert!(manager.slots()[0].items()[0].is_ephemeral());

        manager.add_launcher(path);
        assert_eq!(manager.slots().len(), 1);
        assert!(manager.slots()[0].items().iter().all(|i| !i.is_ephemeral()));

        // the slot now survives its window closing
        manager.handle_event(ShellEvent::WindowClosed(1));
        assert_eq!(manager.slots().len(), 1);
    }

    // ==================== visibility ====================

    #[test]
    fn test_only_show_launchers_hides_windowless_slots() {
        let mut manager = make_manager(&["--only-show-launchers"]);
        open_window(&mut manager, 1, "xterm");

        // resolver found nothing, so the slot has no launcher item
        assert_eq!(manager.slots().len(), 1);
        assert!(!manager.slots()[0].shown);
    }

    #[test]
    fn test_only_show_launchers_toggle_updates_icons() {
        let mut manager = make_manager(&[]);
        open_window(&mut manager, 1, "xterm");
        assert!(manager.slots()[0].shown);

        manager.configure(PolicySetting::OnlyShowLaunchers(true));
        assert!(!manager.slots()[0].shown);

        manager.configure(PolicySetting::OnlyShowLaunchers(false));
        assert!(manager.slots()[0].shown);
    }

    #[test]
    fn test_workspace_scoping_hides_other_workspace_windows() {
        let mut manager = make_manager(&["--show-all-workspaces", "false"]);
        manager.handle_event(ShellEvent::ActiveWorkspaceChanged("1".to_string()));
        open_window(&mut manager, 1, "xterm");
        assert!(manager.slots()[0].shown);

        manager.handle_event(ShellEvent::ActiveWorkspaceChanged("2".to_string()));
        assert!(!manager.slots()[0].shown);

        manager.handle_event(ShellEvent::ActiveWorkspaceChanged("1".to_string()));
        assert!(manager.slots()[0].shown);
    }

    #[test]
    fn test_closing_transition_defers_physical_hide() {
        let mut manager = make_manager(&[]);
        manager.host.animate = true;
        open_window(&mut manager, 1, "xterm");

        manager.configure(PolicySetting::OnlyShowLaunchers(true));
        // still shown while the transition runs
        assert!(manager.slots()[0].shown);
        assert!(manager.slots()[0].closing);

        let slot_id = manager.slots()[0].id;
        manager.on_icon_animation_finished(slot_id, IconEffect::Closing);
        assert!(!manager.slots()[0].shown);
        assert!(!manager.slots()[0].closing);
    }

    // ==================== control surface ====================

    #[test]
    fn test_update_by_numeric_id() {
        let mut manager = make_manager(&[]);
        open_window(&mut manager, 1, "xterm");

        let hints = DecorationHints {
            progress: Some(40),
            ..Default::default()
        };
        manager.update_window(&WindowSpec::Id(1), &hints).unwrap();

        let index = manager.slot_index_of_window(1).unwrap();
        let decoration = manager.slots[index].decoration_mut(1).unwrap();
        assert_eq!(decoration.progress, Some(40));
    }

    #[test]
    fn test_update_by_name_prefers_application_name() {
        let mut manager = make_manager(&["--match-strength", "0"]);
        open_window(&mut manager, 1, "xterm");
        // a window whose *title* collides with the other's class name
        let mut snapshot = make_snapshot(2, "gimp");
        snapshot.title = "xterm".to_string();
        manager.handle_event(ShellEvent::WindowOpened(snapshot));

        let hints = DecorationHints {
            message: Some("2 jobs".to_string()),
            ..Default::default()
        };
        manager
            .update_window(&WindowSpec::Name("XTERM".to_string()), &hints)
            .unwrap();

        // the class-name match (window 1) won over the title match
        let index = manager.slot_index_of_window(1).unwrap();
        let slot = &mut manager.slots[index];
        assert_eq!(
            slot.decoration_mut(1).unwrap().message.as_deref(),
            Some("2 jobs")
        );
    }

    #[test]
    fn test_update_no_match_and_unsupported() {
        let mut manager = make_manager(&[]);
        open_window(&mut manager, 1, "xterm");

        assert_eq!(
            manager.update_window(&WindowSpec::Id(999), &DecorationHints::default()),
            Err(UpdateError::NoWindowMatch)
        );
        assert_eq!(
            manager.update_window(
                &WindowSpec::Name("nothing".to_string()),
                &DecorationHints::default()
            ),
            Err(UpdateError::NoWindowMatch)
        );
        assert_eq!(
            manager.update_window(
                &WindowSpec::Unsupported(serde_json::json!(true)),
                &DecorationHints::default()
            ),
            Err(UpdateError::UnsupportedSpecifier)
        );
    }

    #[test]
    fn test_update_clears_decoration_with_sentinels() {
        let mut manager = make_manager(&[]);
        open_window(&mut manager, 1, "xterm");

        let hints = DecorationHints {
            icon_file: Some("/tmp/badge.png".to_string()),
            progress: Some(80),
            ..Default::default()
        };
        manager.update_window(&WindowSpec::Id(1), &hints).unwrap();

        let hints = DecorationHints {
            icon_file: Some(String::new()),
            progress: Some(-1),
            ..Default::default()
        };
        manager.update_window(&WindowSpec::Id(1), &hints).unwrap();

        let index = manager.slot_index_of_window(1).unwrap();
        let decoration = manager.slots[index].decoration_mut(1).unwrap().clone();
        assert!(decoration.icon_file.is_none());
        assert!(decoration.progress.is_none());
    }

    // ==================== dragging ====================

    #[test]
    fn test_drag_reorders_slots() {
        let mut manager = make_manager(&["--match-strength", "0"]);
        for (id, name) in [(1, "a"), (2, "bb"), (3, "ccc"), (4, "dddd"), (5, "eeeee")] {
            open_window(&mut manager, id, name);
        }
        assert_eq!(manager.slots().len(), 5);
        let dragged = manager.slots()[2].id;
        let hovered = manager.slots()[4].id;

        manager.begin_drag(dragged);
        // past the midpoint of the slot at index 4 on a horizontal panel
        manager.drag_motion(40.0, 0.0, hovered);
        manager.end_drag();

        assert_eq!(manager.slots()[4].id, dragged);
        // everyone else kept their relative order
        let order: Vec<SlotId> = manager.slots().iter().map(|s| s.id).collect();
        assert_eq!(order, vec![1, 2, 4, 5, 3]);
    }

    #[test]
    fn test_drag_disabled_ignores_begin() {
        let mut manager = make_manager(&["--drag-and-drop", "false", "--match-strength", "0"]);
        open_window(&mut manager, 1, "a");
        manager.begin_drag(manager.slots()[0].id);
        assert!(!manager.drag.is_dragging());
    }

    #[test]
    fn test_disabling_drag_mid_flight_ends_it() {
        let mut manager = make_manager(&["--match-strength", "0"]);
        open_window(&mut manager, 1, "a");
        open_window(&mut manager, 2, "bb");

        manager.begin_drag(manager.slots()[0].id);
        manager.configure(PolicySetting::DragAndDrop(false));
        assert!(!manager.drag.is_dragging());
    }

    // ==================== intellihide wiring ====================

    #[test]
    fn test_geometry_event_triggers_intersection_scan() {
        let mut manager = make_manager(&["--intellihide-mode", "workspace"]);
        manager.handle_event(ShellEvent::ActiveWorkspaceChanged("1".to_string()));
        assert!(manager.intellihide().holds_inhibition());

        // a window now overlaps the panel region (y 1032..1080)
        manager.shell.windows = vec![WindowOverview {
            id: 1,
            pid: 100,
            skip_tasklist: false,
            workspace: Some("1".to_string()),
            rect: Some(Rect::new(0, 900, 800, 600)),
        }];
        manager.handle_event(ShellEvent::WindowGeometryChanged(1));
        assert!(!manager.intellihide().holds_inhibition());

        // it moves clear of the panel
        manager.shell.windows[0].rect = Some(Rect::new(0, 0, 800, 600));
        manager.handle_event(ShellEvent::WindowGeometryChanged(1));
        assert!(manager.intellihide().holds_inhibition());
    }
}
