//! Intersection-based auto-hide control.
//!
//! While intellihide is on, the panel may only auto-hide when some visible
//! window overlaps its occupied screen region. Every relevant shell event
//! triggers a scan: find the comparison window set for the configured mode,
//! test each window's rectangle against the panel region, and acquire or
//! release a single auto-hide inhibition token accordingly.

use crate::config::IntellihideMode;
use crate::panel::{InhibitCookie, PanelHost, Region};
use crate::shell_client::{ShellClient, WindowOverview};
use tracing::debug;

const INHIBIT_REASON: &str = "Intellihide";

pub struct IntellihideController<P: PanelHost> {
    panel: P,
    enabled: bool,
    mode: IntellihideMode,
    /// last non-empty panel region, panel-relative; reused while the panel
    /// is hidden and its live input region reads empty
    cached_region: Option<Region>,
    cookie: Option<InhibitCookie>,
}

impl<P: PanelHost> IntellihideController<P> {
    pub fn new(panel: P, enabled: bool, mode: IntellihideMode) -> Self {
        let mut controller = IntellihideController {
            panel,
            enabled,
            mode,
            cached_region: None,
            cookie: None,
        };
        if enabled {
            // hold the panel in place until a scan proves a window overlaps
            controller.inhibit();
        }
        controller
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut P {
        &mut self.panel
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn mode(&self) -> IntellihideMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: IntellihideMode) {
        self.mode = mode;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            self.inhibit();
        } else {
            self.uninhibit();
        }
    }

    /// Scan the comparison window set and flip the inhibition token.
    ///
    /// `active_workspace` scopes the set; `active_pid` identifies the
    /// active window's application for the app/group modes. In those modes
    /// a missing active window leaves the previous decision in place.
    pub fn check<S: ShellClient>(
        &mut self,
        shell: &mut S,
        active_workspace: Option<&str>,
        active_pid: Option<i32>,
    ) {
        if !self.enabled {
            return;
        }

        let Some(region) = self.panel_region() else {
            return;
        };

        let active_pid = match self.mode {
            IntellihideMode::Workspace => None,
            IntellihideMode::App | IntellihideMode::Group => match active_pid {
                Some(pid) => Some(pid),
                None => return,
            },
        };

        // a failed window-list query keeps the previous decision
        let windows = match shell.windows() {
            Ok(windows) => windows,
            Err(e) => {
                debug!("Window list query failed: {}", e);
                return;
            }
        };

        let intersect = windows
            .iter()
            .filter(|w| comparable(w, active_workspace, active_pid))
            .any(|w| match w.rect {
                Some(rect) => region.intersects(&rect),
                // geometry query failed for this window: skip it
                None => false,
            });

        if intersect {
            self.uninhibit();
        } else {
            self.inhibit();
        }
    }

    /// The panel's occupied region in screen coordinates. An empty live
    /// region means the panel is hidden; fall back to the cached one.
    fn panel_region(&mut self) -> Option<Region> {
        match self.panel.input_region() {
            Ok(region) if !region.is_empty() => {
                self.cached_region = Some(region);
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Panel region query failed: {}", e);
            }
        }

        let region = self.cached_region.as_ref()?;
        match self.panel.origin() {
            Ok((x, y)) => Some(region.offset(x, y)),
            Err(e) => {
                debug!("Panel origin query failed: {}", e);
                None
            }
        }
    }

    /// Acquire the inhibition token; no-op when already held
    fn inhibit(&mut self) {
        if self.cookie.is_none() {
            self.cookie = Some(self.panel.inhibit_autohide(INHIBIT_REASON));
        }
    }

    /// Release the inhibition token; no-op when not held
    fn uninhibit(&mut self) {
        if let Some(cookie) = self.cookie.take() {
            self.panel.uninhibit_autohide(cookie);
        }
    }

    #[cfg(test)]
    pub fn holds_inhibition(&self) -> bool {
        self.cookie.is_some()
    }
}

fn comparable(
    window: &WindowOverview,
    active_workspace: Option<&str>,
    active_pid: Option<i32>,
) -> bool {
    if window.skip_tasklist {
        return false;
    }
    if let Some(pid) = active_pid
        && window.pid != pid
    {
        return false;
    }
    if let Some(workspace) = active_workspace
        && window.workspace.as_deref() != Some(workspace)
    {
        return false;
    }
    true
}
