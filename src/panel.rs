//! Panel host abstraction.
//!
//! The dock engine does not own the panel; it asks the host for the panel's
//! orientation, size and occupied input region, and holds at most one
//! auto-hide inhibition token acquired through it.

use crate::config::Orientation;
use crate::shell_client::Rect;
use anyhow::Result;
use tracing::info;

pub type InhibitCookie = u32;

/// Union of rectangles, panel-relative until offset to screen coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    pub fn new() -> Self {
        Region::default()
    }

    pub fn from_rect(rect: Rect) -> Self {
        Region { rects: vec![rect] }
    }

    pub fn add(&mut self, rect: Rect) {
        self.rects.push(rect);
    }

    pub fn is_empty(&self) -> bool {
        self.rects.iter().all(|r| r.width <= 0 || r.height <= 0)
    }

    pub fn intersects(&self, rect: &Rect) -> bool {
        self.rects.iter().any(|r| r.intersects(rect))
    }

    /// The same region shifted by (dx, dy)
    pub fn offset(&self, dx: i32, dy: i32) -> Region {
        Region {
            rects: self
                .rects
                .iter()
                .map(|r| Rect::new(r.x + dx, r.y + dy, r.width, r.height))
                .collect(),
        }
    }
}

pub trait PanelHost {
    fn orientation(&self) -> Orientation;

    /// Panel thickness in pixels; icons are square at this size
    fn size(&self) -> u32;

    /// Root-relative origin of the panel window
    fn origin(&mut self) -> Result<(i32, i32)>;

    /// The panel's currently occupied input region, panel-relative.
    /// Empty while the panel is hidden.
    fn input_region(&mut self) -> Result<Region>;

    /// Keep the panel from auto-hiding. Returns a token for release.
    fn inhibit_autohide(&mut self, reason: &str) -> InhibitCookie;

    fn uninhibit_autohide(&mut self, cookie: InhibitCookie);
}

/// Stand-in host for a panel fixed to one screen edge. A real panel
/// process would implement `PanelHost` over its own IPC; this one derives
/// the region from the configured geometry and logs inhibition changes.
pub struct StaticPanel {
    orientation: Orientation,
    size: u32,
    screen: Rect,
    next_cookie: InhibitCookie,
}

impl StaticPanel {
    pub fn new(orientation: Orientation, size: u32, screen: Rect) -> Self {
        StaticPanel {
            orientation,
            size,
            screen,
            next_cookie: 1,
        }
    }
}

impl PanelHost for StaticPanel {
    fn orientation(&self) -> Orientation {
        self.orientation
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn origin(&mut self) -> Result<(i32, i32)> {
        let size = self.size as i32;
        Ok(match self.orientation {
            Orientation::Top => (self.screen.x, self.screen.y),
            Orientation::Bottom => (self.screen.x, self.screen.y + self.screen.height - size),
            Orientation::Left => (self.screen.x, self.screen.y),
            Orientation::Right => (self.screen.x + self.screen.width - size, self.screen.y),
        })
    }

    fn input_region(&mut self) -> Result<Region> {
        let size = self.size as i32;
        let rect = if self.orientation.is_horizontal() {
            Rect::new(0, 0, self.screen.width, size)
        } else {
            Rect::new(0, 0, size, self.screen.height)
        };
        Ok(Region::from_rect(rect))
    }

    fn inhibit_autohide(&mut self, reason: &str) -> InhibitCookie {
        let cookie = self.next_cookie;
        self.next_cookie += 1;
        info!("Auto-hide inhibited ({}), cookie {}", reason, cookie);
        cookie
    }

    fn uninhibit_autohide(&mut self, cookie: InhibitCookie) {
        info!("Auto-hide uninhibited, cookie {}", cookie);
    }
}
