//! Visual layer seam.
//!
//! The engine never paints anything; it tells an `IconHost` which icons
//! exist, which are visible, and where the drag placeholder sits. Hiding is
//! two-phase: `hide_icon` may start a closing transition, and the engine
//! only marks the slot physically hidden once the host reports the
//! transition finished.

use crate::icon_slot::SlotId;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconEffect {
    Opening,
    Closing,
}

pub trait IconHost {
    fn icon_added(&mut self, slot: SlotId, index: usize);

    fn icon_removed(&mut self, slot: SlotId);

    /// Show the icon with an opening transition
    fn show_icon(&mut self, slot: SlotId);

    /// Begin hiding the icon. Returns true when a closing transition was
    /// started; the host must then deliver an animation-finished
    /// notification. Returning false hides immediately.
    fn hide_icon(&mut self, slot: SlotId) -> bool;

    fn reorder_icon(&mut self, slot: SlotId, index: usize);

    /// Decoration changed; repaint
    fn refresh_icon(&mut self, slot: SlotId);

    fn show_placeholder(&mut self, index: usize);

    fn move_placeholder(&mut self, index: usize);

    fn hide_placeholder(&mut self);
}

/// Headless host: logs every transition and hides without animating.
/// Stands in until a renderer attaches to the engine.
#[derive(Debug, Default)]
pub struct LogIconHost;

impl IconHost for LogIconHost {
    fn icon_added(&mut self, slot: SlotId, index: usize) {
        debug!("Icon {} added at index {}", slot, index);
    }

    fn icon_removed(&mut self, slot: SlotId) {
        debug!("Icon {} removed", slot);
    }

    fn show_icon(&mut self, slot: SlotId) {
        debug!("Icon {} shown", slot);
    }

    fn hide_icon(&mut self, slot: SlotId) -> bool {
        debug!("Icon {} hidden", slot);
        false
    }

    fn reorder_icon(&mut self, slot: SlotId, index: usize) {
        debug!("Icon {} moved to index {}", slot, index);
    }

    fn refresh_icon(&mut self, slot: SlotId) {
        debug!("Icon {} decoration refreshed", slot);
    }

    fn show_placeholder(&mut self, index: usize) {
        debug!("Drag placeholder shown at index {}", index);
    }

    fn move_placeholder(&mut self, index: usize) {
        debug!("Drag placeholder moved to index {}", index);
    }

    fn hide_placeholder(&mut self) {
        debug!("Drag placeholder hidden");
    }
}
