//! Input - Pressed/released state of the driving controls
//!
//! Key handlers write through `press`/`release`; the tick loop reads a
//! copy via `snapshot` once per tick so it never sees a half-applied update.

use serde::{Deserialize, Serialize};

/// Logical driving controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Control {
    Accelerate,
    Brake,
    SteerLeft,
    SteerRight,
}

impl Control {
    /// Map a raw keyboard key name onto a control (case-insensitive)
    pub fn from_key(key: &str) -> Option<Control> {
        match key.to_ascii_lowercase().as_str() {
            "w" | "arrowup" => Some(Control::Accelerate),
            "s" | "arrowdown" => Some(Control::Brake),
            "a" | "arrowleft" => Some(Control::SteerLeft),
            "d" | "arrowright" => Some(Control::SteerRight),
            _ => None,
        }
    }
}

/// Copy of the control state taken at a tick boundary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub accelerate: bool,
    pub brake: bool,
    pub steer_left: bool,
    pub steer_right: bool,
}

impl InputSnapshot {
    pub fn is_active(&self, control: Control) -> bool {
        match control {
            Control::Accelerate => self.accelerate,
            Control::Brake => self.brake,
            Control::SteerLeft => self.steer_left,
            Control::SteerRight => self.steer_right,
        }
    }

    fn slot(&mut self, control: Control) -> &mut bool {
        match control {
            Control::Accelerate => &mut self.accelerate,
            Control::Brake => &mut self.brake,
            Control::SteerLeft => &mut self.steer_left,
            Control::SteerRight => &mut self.steer_right,
        }
    }
}

/// Mirrors physical key state for the lifetime of the process.
///
/// Races never reset it; a held key simply keeps acting on the next race.
#[derive(Debug, Clone, Default)]
pub struct InputTracker {
    state: InputSnapshot,
}

impl InputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, control: Control) {
        *self.state.slot(control) = true;
    }

    pub fn release(&mut self, control: Control) {
        *self.state.slot(control) = false;
    }

    pub fn is_active(&self, control: Control) -> bool {
        self.state.is_active(control)
    }

    /// Apply a raw key event. Returns false for keys with no binding.
    pub fn handle_key(&mut self, key: &str, pressed: bool) -> bool {
        match Control::from_key(key) {
            Some(control) if pressed => {
                self.press(control);
                true
            }
            Some(control) => {
                self.release(control);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> InputSnapshot {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release_toggle_single_control() {
        let mut tracker = InputTracker::new();
        tracker.press(Control::SteerLeft);
        assert!(tracker.is_active(Control::SteerLeft));
        assert!(!tracker.is_active(Control::SteerRight));

        tracker.release(Control::SteerLeft);
        assert!(!tracker.is_active(Control::SteerLeft));
    }

    #[test]
    fn key_bindings_cover_wasd_and_arrows() {
        let mut tracker = InputTracker::new();
        assert!(tracker.handle_key("ArrowUp", true));
        assert!(tracker.is_active(Control::Accelerate));
        assert!(tracker.handle_key("W", false));
        assert!(!tracker.is_active(Control::Accelerate));

        assert_eq!(Control::from_key("s"), Some(Control::Brake));
        assert_eq!(Control::from_key("arrowright"), Some(Control::SteerRight));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut tracker = InputTracker::new();
        assert!(!tracker.handle_key("Escape", true));
        assert_eq!(tracker.snapshot(), InputSnapshot::default());
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let mut tracker = InputTracker::new();
        tracker.press(Control::Brake);
        let snap = tracker.snapshot();
        tracker.release(Control::Brake);
        assert!(snap.is_active(Control::Brake));
        assert!(!tracker.snapshot().brake);
    }
}
