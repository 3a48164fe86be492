//! Interaction mode machine.
//!
//! Exactly one of `Idle`, `Place`, `Drag` or `Rotate` is active. Every
//! transition method checks its source state and returns `false` without
//! changing anything when the transition is not legal from the current mode,
//! so a stray pointer-down mid-gesture is simply ignored.

#[cfg(test)]
#[path = "mode_test.rs"]
mod mode_test;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a pointer gesture currently means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Waiting for the next press. Selection may or may not be set.
    #[default]
    Idle,
    /// The next ground click is consumed as a placement pick.
    Place,
    /// The selected entity follows the pointer.
    Drag,
    /// The selected entity turns to face the pointer.
    Rotate,
}

impl Mode {
    /// Whether a pointer gesture (drag or rotate) is in progress.
    #[must_use]
    pub fn is_gesture(self) -> bool {
        matches!(self, Self::Drag | Self::Rotate)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModeMachine {
    mode: Mode,
}

impl ModeMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.mode == Mode::Idle
    }

    /// `Idle → Place`.
    pub fn begin_place(&mut self) -> bool {
        self.transition(Mode::Idle, Mode::Place)
    }

    /// `Place → Idle` after the pick has been consumed.
    pub fn finish_place(&mut self) -> bool {
        self.transition(Mode::Place, Mode::Idle)
    }

    /// `Place → Idle` without a pick.
    pub fn cancel_place(&mut self) -> bool {
        self.transition(Mode::Place, Mode::Idle)
    }

    /// `Idle → Drag`.
    pub fn begin_drag(&mut self) -> bool {
        self.transition(Mode::Idle, Mode::Drag)
    }

    /// `Idle → Rotate`. Requires an existing selection.
    pub fn begin_rotate(&mut self, has_selection: bool) -> bool {
        if !has_selection {
            return false;
        }
        self.transition(Mode::Idle, Mode::Rotate)
    }

    /// `Drag → Idle` or `Rotate → Idle`. Selection is not touched here.
    pub fn end_gesture(&mut self) -> bool {
        if !self.mode.is_gesture() {
            return false;
        }
        let from = self.mode;
        self.mode = Mode::Idle;
        debug!(?from, to = ?Mode::Idle, "mode changed");
        true
    }

    fn transition(&mut self, from: Mode, to: Mode) -> bool {
        if self.mode != from {
            return false;
        }
        self.mode = to;
        debug!(?from, ?to, "mode changed");
        true
    }
}
