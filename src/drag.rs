//! Interactive icon reordering.
//!
//! One drag at a time: the dragged slot is hidden, a placeholder marks the
//! drop position, and pointer motion moves the placeholder across the
//! midpoint of whichever slot is hovered. Ending (or failing) the drag
//! commits the placeholder position.

use crate::config::Orientation;
use crate::icon_slot::SlotId;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragState {
    pub slot: SlotId,
    pub placeholder: usize,
    pub placeholder_visible: bool,
    /// set by a pointer-leave, cleared by motion or drop
    pub leave_pending: bool,
}

#[derive(Debug, Default)]
pub struct DragController {
    active: Option<DragState>,
}

impl DragController {
    pub fn new() -> Self {
        DragController::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    pub fn state(&self) -> Option<&DragState> {
        self.active.as_ref()
    }

    /// Start dragging the slot currently at `index`. The engine guarantees
    /// single-flight dragging; a second concurrent drag is a programming
    /// error.
    pub fn begin(&mut self, slot: SlotId, index: usize) {
        assert!(
            self.active.is_none(),
            "drag began while a previous drag was still in progress"
        );
        debug!("Drag begins: slot {} at index {}", slot, index);
        self.active = Some(DragState {
            slot,
            placeholder: index,
            placeholder_visible: true,
            leave_pending: false,
        });
    }

    /// Pointer moved to (x, y) within the slot at `over_index`. Coordinates
    /// are relative to the hovered slot; `size` is the slot extent along
    /// the panel's primary axis. Crossing the midpoint moves the
    /// placeholder before or after the hovered slot.
    pub fn motion(
        &mut self,
        x: f64,
        y: f64,
        over_index: usize,
        orientation: Orientation,
        size: u32,
    ) {
        let Some(state) = self.active.as_mut() else {
            return;
        };
        state.leave_pending = false;
        state.placeholder_visible = true;

        let position = if orientation.is_horizontal() { x } else { y };
        let fraction = if size > 0 {
            position / size as f64
        } else {
            0.0
        };

        if fraction < 0.5 {
            if state.placeholder > over_index {
                state.placeholder = over_index;
            }
        } else if state.placeholder < over_index {
            state.placeholder = over_index;
        }
    }

    /// Pointer left the dock area; a timeout may fire later
    pub fn leave(&mut self) {
        if let Some(state) = self.active.as_mut() {
            state.leave_pending = true;
        }
    }

    /// The leave timeout fired: hide the placeholder, drag continues
    pub fn leave_timeout(&mut self) {
        if let Some(state) = self.active.as_mut()
            && state.leave_pending
        {
            state.placeholder_visible = false;
            state.leave_pending = false;
        }
    }

    /// Drop: returns the dragged slot and its destination index
    pub fn end(&mut self) -> Option<(SlotId, usize)> {
        let state = self.active.take()?;
        debug!(
            "Drag ends: slot {} dropped at index {}",
            state.slot, state.placeholder
        );
        Some((state.slot, state.placeholder))
    }

    /// A failed drag is handled like a drop
    pub fn fail(&mut self) -> Option<(SlotId, usize)> {
        self.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: u32 = 48;

    #[test]
    fn test_begin_and_end() {
        let mut drag = DragController::new();
        assert!(!drag.is_dragging());

        drag.begin(7, 2);
        assert!(drag.is_dragging());
        assert_eq!(drag.state().unwrap().placeholder, 2);

        assert_eq!(drag.end(), Some((7, 2)));
        assert!(!drag.is_dragging());
    }

    #[test]
    #[should_panic(expected = "previous drag")]
    fn test_concurrent_drag_is_fatal() {
        let mut drag = DragController::new();
        drag.begin(1, 0);
        drag.begin(2, 1);
    }

    #[test]
    fn test_motion_past_midpoint_moves_placeholder_forward() {
        let mut drag = DragController::new();
        drag.begin(7, 2);

        // past the midpoint of the slot at index 4 on a horizontal panel
        drag.motion(40.0, 0.0, 4, Orientation::Bottom, SIZE);
        assert_eq!(drag.state().unwrap().placeholder, 4);
        assert_eq!(drag.end(), Some((7, 4)));
    }

    #[test]
    fn test_motion_before_midpoint_moves_placeholder_back() {
        let mut drag = DragController::new();
        drag.begin(7, 4);

        drag.motion(10.0, 0.0, 1, Orientation::Bottom, SIZE);
        assert_eq!(drag.state().unwrap().placeholder, 1);
    }

    #[test]
    fn test_motion_does_not_move_without_crossing() {
        let mut drag = DragController::new();
        drag.begin(7, 2);

        // before the midpoint of a later slot: placeholder stays
        drag.motion(10.0, 0.0, 4, Orientation::Bottom, SIZE);
        assert_eq!(drag.state().unwrap().placeholder, 2);

        // past the midpoint of an earlier slot: placeholder stays
        drag.motion(40.0, 0.0, 1, Orientation::Bottom, SIZE);
        assert_eq!(drag.state().unwrap().placeholder, 2);
    }

    #[test]
    fn test_vertical_panel_uses_y_axis() {
        let mut drag = DragController::new();
        drag.begin(7, 0);

        // x far past the midpoint but y before it: no move on a vertical panel
        drag.motion(47.0, 3.0, 2, Orientation::Left, SIZE);
        assert_eq!(drag.state().unwrap().placeholder, 0);

        drag.motion(0.0, 40.0, 2, Orientation::Left, SIZE);
        assert_eq!(drag.state().unwrap().placeholder, 2);
    }

    #[test]
    fn test_leave_timeout_hides_placeholder_and_motion_restores() {
        let mut drag = DragController::new();
        drag.begin(7, 2);

        drag.leave();
        drag.leave_timeout();
        assert!(!drag.state().unwrap().placeholder_visible);

        drag.motion(10.0, 0.0, 2, Orientation::Bottom, SIZE);
        assert!(drag.state().unwrap().placeholder_visible);
    }

    #[test]
    fn test_motion_cancels_pending_leave() {
        let mut drag = DragController::new();
        drag.begin(7, 2);

        drag.leave();
        drag.motion(10.0, 0.0, 2, Orientation::Bottom, SIZE);
        // the timeout fires after being cancelled: nothing happens
        drag.leave_timeout();
        assert!(drag.state().unwrap().placeholder_visible);
    }

    #[test]
    fn test_fail_is_handled_like_end() {
        let mut drag = DragController::new();
        drag.begin(7, 2);
        drag.motion(40.0, 0.0, 4, Orientation::Bottom, SIZE);
        assert_eq!(drag.fail(), Some((7, 4)));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_motion_without_drag_is_ignored() {
        let mut drag = DragController::new();
        drag.motion(40.0, 0.0, 4, Orientation::Bottom, SIZE);
        assert!(!drag.is_dragging());
        assert_eq!(drag.end(), None);
    }
}
