//! Dock icon slots and the items inside them.
//!
//! An `IconSlot` is an ordered group of items rendered as a single dock
//! icon. Items are either window-backed or launcher-backed; a launcher item
//! can be "ephemeral", meaning it was discovered as a placeholder during
//! descriptor resolution and cannot keep the slot alive on its own.

use crate::launcher_resolver::{LauncherDescriptor, commands_overlap};
use crate::shell_client::WindowId;
use std::path::Path;

pub type SlotId = u64;

/// Decoration applied through the control surface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoration {
    pub icon_file: Option<String>,
    pub progress: Option<i32>,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Item {
    Window {
        id: WindowId,
        decoration: Decoration,
    },
    Launcher {
        descriptor: LauncherDescriptor,
        ephemeral: bool,
    },
}

impl Item {
    pub fn window(id: WindowId) -> Self {
        Item::Window {
            id,
            decoration: Decoration::default(),
        }
    }

    pub fn launcher(descriptor: LauncherDescriptor) -> Self {
        Item::Launcher {
            descriptor,
            ephemeral: false,
        }
    }

    pub fn ephemeral_launcher(descriptor: LauncherDescriptor) -> Self {
        Item::Launcher {
            descriptor,
            ephemeral: true,
        }
    }

    pub fn window_id(&self) -> Option<WindowId> {
        match self {
            Item::Window { id, .. } => Some(*id),
            Item::Launcher { .. } => None,
        }
    }

    pub fn descriptor(&self) -> Option<&LauncherDescriptor> {
        match self {
            Item::Launcher { descriptor, .. } => Some(descriptor),
            Item::Window { .. } => None,
        }
    }

    pub fn is_launcher(&self) -> bool {
        matches!(self, Item::Launcher { .. })
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Item::Launcher { ephemeral: true, .. })
    }
}

/// One dock icon: an insertion-stable collection of items.
#[derive(Debug, Clone)]
pub struct IconSlot {
    pub id: SlotId,
    items: Vec<Item>,
    /// physically shown by the visual layer
    pub shown: bool,
    /// a closing transition is in flight; hidden once it finishes
    pub closing: bool,
}

impl IconSlot {
    pub fn new(id: SlotId) -> Self {
        IconSlot {
            id,
            items: Vec::new(),
            shown: false,
            closing: false,
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append an item. A non-ephemeral launcher replaces any ephemeral
    /// placeholder; a launcher whose descriptor path is already present is
    /// suppressed. Returns whether the item was actually added.
    pub fn push_item(&mut self, item: Item) -> bool {
        if let Some(descriptor) = item.descriptor() {
            if self.contains_launcher_path(&descriptor.path) && !item.is_ephemeral() {
                // promote an ephemeral placeholder for the same descriptor
                for existing in &mut self.items {
                    if let Item::Launcher {
                        descriptor: d,
                        ephemeral,
                    } = existing
                        && d.path == descriptor.path
                    {
                        *ephemeral = false;
                    }
                }
                return false;
            }
            if self.contains_launcher_path(&descriptor.path) {
                return false;
            }
            if !item.is_ephemeral() {
                // the placeholder's job is done
                self.items.retain(|i| !i.is_ephemeral());
            }
        }
        self.items.push(item);
        true
    }

    pub fn remove_window(&mut self, id: WindowId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.window_id() != Some(id));
        self.items.len() != before
    }

    pub fn contains_launcher(&self) -> bool {
        self.items.iter().any(Item::is_launcher)
    }

    pub fn contains_launcher_path(&self, path: &Path) -> bool {
        self.items
            .iter()
            .any(|item| item.descriptor().is_some_and(|d| d.path == path))
    }

    /// True when nothing but placeholders is left; such a slot is dead
    pub fn only_ephemeral(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(Item::is_ephemeral)
    }

    pub fn window_ids(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.items.iter().filter_map(Item::window_id)
    }

    pub fn decoration_mut(&mut self, id: WindowId) -> Option<&mut Decoration> {
        self.items.iter_mut().find_map(|item| match item {
            Item::Window {
                id: wid,
                decoration,
            } if *wid == id => Some(decoration),
            _ => None,
        })
    }
}

/// Flattened identity of an item, used for match scoring. The grouping
/// engine assembles these from window records and descriptors.
#[derive(Debug, Clone, Copy)]
pub enum ItemIdentity<'a> {
    Window {
        res_name: Option<&'a str>,
        class_name: Option<&'a str>,
        cmd: Option<&'a str>,
        full_cmd: Option<&'a str>,
    },
    Launcher {
        path: &'a Path,
        stem: Option<&'a str>,
        exec: &'a str,
    },
}

/// Match score between two items, 0-99. Identical application identity
/// outranks command equality, which outranks partial command overlap.
pub fn pair_score(a: &ItemIdentity, b: &ItemIdentity) -> u8 {
    match (a, b) {
        (
            ItemIdentity::Window {
                res_name: res_a,
                class_name: class_a,
                cmd: cmd_a,
                full_cmd: full_a,
            },
            ItemIdentity::Window {
                res_name: res_b,
                class_name: class_b,
                cmd: cmd_b,
                full_cmd: full_b,
            },
        ) => {
            if eq_nonempty(*res_a, *res_b) {
                99
            } else if eq_nonempty(*class_a, *class_b) {
                95
            } else if eq_nonempty(*full_a, *full_b) || eq_nonempty(*cmd_a, *cmd_b) {
                90
            } else if overlap(*cmd_a, *cmd_b) || overlap(*full_a, *full_b) {
                70
            } else {
                0
            }
        }
        (ItemIdentity::Window { .. }, ItemIdentity::Launcher { .. }) => pair_score(b, a),
        (
            ItemIdentity::Launcher { stem, exec, .. },
            ItemIdentity::Window {
                res_name,
                class_name,
                cmd,
                full_cmd,
            },
        ) => {
            if eq_nonempty(*stem, *res_name) || eq_nonempty(*stem, *class_name) {
                95
            } else if eq_nonempty(Some(*exec), *cmd) {
                90
            } else if overlap(Some(*exec), *cmd) || overlap(Some(*exec), *full_cmd) {
                70
            } else {
                0
            }
        }
        (
            ItemIdentity::Launcher { path: path_a, .. },
            ItemIdentity::Launcher { path: path_b, .. },
        ) => {
            if path_a == path_b {
                99
            } else {
                0
            }
        }
    }
}

fn eq_nonempty(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => !a.is_empty() && a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

fn overlap(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => commands_overlap(a, b),
        _ => false,
    }
}
