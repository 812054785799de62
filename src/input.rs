use glam::Vec2;
use parking_lot::RwLock;

/// Navigation key recognized by the camera controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavKey {
    Forward,
    Backward,
    StrafeLeft,
    StrafeRight,
    Down,
    Up,
}

impl NavKey {
    pub const ALL: [NavKey; 6] = [
        NavKey::Forward,
        NavKey::Backward,
        NavKey::StrafeLeft,
        NavKey::StrafeRight,
        NavKey::Down,
        NavKey::Up,
    ];
}

/// Immutable view of the input devices, taken once per frame.
///
/// `last_mouse_position` is the cursor position the previous frame consumed;
/// the difference against `mouse_position` is the look delta for this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    keys: [bool; 6],
    pub look_active: bool,
    pub mouse_position: Vec2,
    pub last_mouse_position: Vec2,
}

impl InputSnapshot {
    pub fn is_down(&self, key: NavKey) -> bool {
        self.keys[key as usize]
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_position - self.last_mouse_position
    }

    /// True when the snapshot can influence the camera this frame.
    pub fn any_active(&self) -> bool {
        self.look_active || self.keys.iter().any(|held| *held)
    }
}

/// Single-writer publisher translating window events into frame snapshots.
///
/// The event loop is the only writer. The frame driver takes one snapshot
/// per tick and, after integrating it, commits the cursor position it
/// consumed so the next snapshot reports deltas relative to it.
#[derive(Debug, Default)]
pub struct InputPublisher {
    state: RwLock<InputSnapshot>,
}

impl InputPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key(&self, key: NavKey, down: bool) {
        self.state.write().keys[key as usize] = down;
    }

    pub fn set_look_active(&self, active: bool) {
        self.state.write().look_active = active;
    }

    pub fn set_mouse_position(&self, position: Vec2) {
        self.state.write().mouse_position = position;
    }

    /// Copies the current device state for one frame of integration.
    pub fn snapshot(&self) -> InputSnapshot {
        *self.state.read()
    }

    /// Records the cursor position a frame consumed.
    pub fn commit_mouse_position(&self, position: Vec2) {
        self.state.write().last_mouse_position = position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publisher_tracks_keys() {
        let input = InputPublisher::new();
        input.set_key(NavKey::Forward, true);
        assert!(input.snapshot().is_down(NavKey::Forward));
        input.set_key(NavKey::Forward, false);
        assert!(!input.snapshot().is_down(NavKey::Forward));
    }

    #[test]
    fn snapshots_are_stable_copies() {
        let input = InputPublisher::new();
        input.set_mouse_position(Vec2::new(4.0, 8.0));
        let snapshot = input.snapshot();
        input.set_mouse_position(Vec2::new(100.0, 100.0));
        assert_eq!(snapshot.mouse_position, Vec2::new(4.0, 8.0));
    }

    #[test]
    fn any_active_covers_keys_and_look() {
        let input = InputPublisher::new();
        assert!(!input.snapshot().any_active());

        input.set_look_active(true);
        assert!(input.snapshot().any_active());
        input.set_look_active(false);

        for key in NavKey::ALL {
            input.set_key(key, true);
            assert!(input.snapshot().any_active());
            input.set_key(key, false);
        }
        assert!(!input.snapshot().any_active());
    }

    #[test]
    fn committed_position_feeds_next_delta() {
        let input = InputPublisher::new();
        input.set_mouse_position(Vec2::new(10.0, 0.0));
        let first = input.snapshot();
        assert_eq!(first.mouse_delta(), Vec2::new(10.0, 0.0));

        input.commit_mouse_position(first.mouse_position);
        let second = input.snapshot();
        assert_eq!(second.mouse_delta(), Vec2::ZERO);
    }
}
