//! Mode-scoped keyboard shortcuts.
//!
//! Bindings are looked up by `(mode, shortcut)`, so a binding registered for
//! one mode never fires in another. Global bindings are registered once per mode.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::editor::mode::EditMode;

/// A physical key, normalized (letters are lowercase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Space,
    Escape,
    Backspace,
    Delete,
}

/// A key plus modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shortcut {
    pub key: Key,
    pub ctrl: bool,
    pub shift: bool,
}

impl Shortcut {
    /// A key without modifiers.
    pub fn key(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
        }
    }

    /// A character key without modifiers.
    pub fn char(c: char) -> Self {
        Self::key(Key::Char(c.to_ascii_lowercase()))
    }

    /// A character key with Ctrl held.
    pub fn ctrl(c: char) -> Self {
        Self {
            ctrl: true,
            ..Self::char(c)
        }
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.shift {
            write!(f, "Shift+")?;
        }
        match self.key {
            Key::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            Key::Enter => write!(f, "Enter"),
            Key::Space => write!(f, "Space"),
            Key::Escape => write!(f, "Escape"),
            Key::Backspace => write!(f, "Backspace"),
            Key::Delete => write!(f, "Delete"),
        }
    }
}

impl FromStr for Shortcut {
    type Err = String;

    /// Parse forms like `"R"`, `"Ctrl+Z"`, `"Space"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ctrl = false;
        let mut shift = false;
        let mut key = None;
        for part in s.split('+').map(str::trim) {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" | "cmd" => ctrl = true,
                "shift" => shift = true,
                "enter" | "return" => key = Some(Key::Enter),
                "space" | " " => key = Some(Key::Space),
                "escape" | "esc" => key = Some(Key::Escape),
                "backspace" => key = Some(Key::Backspace),
                "delete" | "del" => key = Some(Key::Delete),
                other => {
                    let mut chars = other.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => key = Some(Key::Char(c)),
                        _ => return Err(format!("unknown key '{}' in shortcut '{}'", part, s)),
                    }
                }
            }
        }
        key.map(|key| Shortcut { key, ctrl, shift })
            .ok_or_else(|| format!("shortcut '{}' has no key", s))
    }
}

impl Serialize for Shortcut {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Shortcut {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Action a shortcut triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditorAction {
    /// Remove the selected masks
    RemoveSelection,
    /// Delete the selected masks (delete mode's confirm)
    CommitDelete,
    /// Undo the last prompt
    Undo,
    /// Discard all prompts
    Reset,
    /// Commit the candidate mask
    Confirm,
    /// Go to the next image
    NextImage,
    /// Go to the previous image
    PrevImage,
    /// Fit the image to the canvas
    ResetViewpoint,
    /// Show or hide the mask layer
    ToggleMasks,
}

impl EditorAction {
    /// Get the display name for this action.
    pub fn name(&self) -> &'static str {
        match self {
            EditorAction::RemoveSelection => "Remove selection",
            EditorAction::CommitDelete => "Delete selected",
            EditorAction::Undo => "Undo",
            EditorAction::Reset => "Reset",
            EditorAction::Confirm => "Confirm",
            EditorAction::NextImage => "Next image",
            EditorAction::PrevImage => "Previous image",
            EditorAction::ResetViewpoint => "Reset viewpoint",
            EditorAction::ToggleMasks => "Toggle masks",
        }
    }
}

/// Table of shortcuts keyed by `(mode, shortcut)`.
#[derive(Debug, Clone, Default)]
pub struct ShortcutRegistry {
    bindings: HashMap<(EditMode, Shortcut), EditorAction>,
}

impl ShortcutRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The default bindings.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for &mode in EditMode::all() {
            registry.register(mode, Shortcut::char('d'), EditorAction::NextImage);
            registry.register(mode, Shortcut::char('a'), EditorAction::PrevImage);
            registry.register(mode, Shortcut::char('w'), EditorAction::ResetViewpoint);
            registry.register(mode, Shortcut::char('s'), EditorAction::ToggleMasks);
        }
        registry.register(EditMode::Select, Shortcut::char('r'), EditorAction::RemoveSelection);
        registry.register(EditMode::Delete, Shortcut::key(Key::Enter), EditorAction::CommitDelete);
        registry.register(EditMode::CreateMask, Shortcut::ctrl('z'), EditorAction::Undo);
        registry.register(EditMode::CreateMask, Shortcut::char('r'), EditorAction::Reset);
        registry.register(EditMode::CreateMask, Shortcut::key(Key::Space), EditorAction::Confirm);
        registry
    }

    /// Bind a shortcut in one mode, returning the action it replaced.
    pub fn register(
        &mut self,
        mode: EditMode,
        shortcut: Shortcut,
        action: EditorAction,
    ) -> Option<EditorAction> {
        self.bindings.insert((mode, shortcut), action)
    }

    /// Remove a binding.
    pub fn unregister(&mut self, mode: EditMode, shortcut: Shortcut) -> Option<EditorAction> {
        self.bindings.remove(&(mode, shortcut))
    }

    /// Action bound to a shortcut in a mode, if any.
    pub fn lookup(&self, mode: EditMode, shortcut: Shortcut) -> Option<EditorAction> {
        self.bindings.get(&(mode, shortcut)).copied()
    }

    /// All bindings of one mode, sorted by display text.
    pub fn bindings_for(&self, mode: EditMode) -> Vec<(Shortcut, EditorAction)> {
        let mut list: Vec<(Shortcut, EditorAction)> = self
            .bindings
            .iter()
            .filter(|((m, _), _)| *m == mode)
            .map(|((_, shortcut), action)| (*shortcut, *action))
            .collect();
        list.sort_by_key(|(shortcut, _)| shortcut.to_string());
        list
    }

    /// Every binding as `(mode, shortcut, action)`.
    pub fn iter(&self) -> impl Iterator<Item = (EditMode, Shortcut, EditorAction)> + '_ {
        self.bindings
            .iter()
            .map(|((mode, shortcut), action)| (*mode, *shortcut, *action))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
