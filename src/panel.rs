//! Cart panel visibility state machine.
//!
//! ```text
//! Closed --open--> Opening --finish--> Open
//!   ^                 |  ^               |
//!   |               close open         close
//!   |                 v  |               v
//!   +----finish---- Closing <------------+
//! ```
//!
//! Same-direction requests are no-ops, so repeated clicks or an escape key
//! pressed twice never produce extra transitions.

/// Visibility of the cart panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelState {
    /// Hidden
    #[default]
    Closed,

    /// Sliding in
    Opening,

    /// Fully shown
    Open,

    /// Sliding out
    Closing,
}

/// Outcome of a panel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The panel moved between states.
    Moved {
        /// State before the request
        from: PanelState,

        /// State after the request
        to: PanelState,
    },

    /// The request did not apply in this state.
    Unchanged(PanelState),
}

impl Transition {
    fn between(from: PanelState, to: PanelState) -> Self {
        if from == to {
            Self::Unchanged(from)
        } else {
            Self::Moved { from, to }
        }
    }

    /// Whether the state changed.
    pub fn changed(self) -> bool {
        matches!(self, Self::Moved { .. })
    }

    /// State after the request.
    pub fn state(self) -> PanelState {
        match self {
            Self::Moved { to, .. } => to,
            Self::Unchanged(state) => state,
        }
    }
}

/// UI gestures that dismiss the panel. All of them close it the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissTrigger {
    /// Click on the dimmed overlay
    Overlay,

    /// Escape key
    EscapeKey,

    /// The panel's close button
    CloseButton,
}

impl PanelState {
    /// Whether the panel is shown or on its way to being shown.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Opening | Self::Open)
    }

    /// Request the panel to open.
    pub fn open(self) -> Transition {
        let to = match self {
            Self::Closed | Self::Closing => Self::Opening,
            Self::Opening | Self::Open => self,
        };

        Transition::between(self, to)
    }

    /// Request the panel to close.
    pub fn close(self) -> Transition {
        let to = match self {
            Self::Open | Self::Opening => Self::Closing,
            Self::Closed | Self::Closing => self,
        };

        Transition::between(self, to)
    }

    /// Open when closed, close when open.
    pub fn toggle(self) -> Transition {
        if self.is_open() {
            self.close()
        } else {
            self.open()
        }
    }

    /// The slide animation finished.
    pub fn finish(self) -> Transition {
        let to = match self {
            Self::Opening => Self::Open,
            Self::Closing => Self::Closed,
            Self::Open | Self::Closed => self,
        };

        Transition::between(self, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_open_close_cycle() {
        let mut state = PanelState::default();

        for (step, expected) in [
            (PanelState::open as fn(PanelState) -> Transition, PanelState::Opening),
            (PanelState::finish, PanelState::Open),
            (PanelState::close, PanelState::Closing),
            (PanelState::finish, PanelState::Closed),
        ] {
            let transition = step(state);

            assert!(transition.changed(), "expected a move to {expected:?}");

            state = transition.state();

            assert_eq!(state, expected);
        }
    }

    #[test]
    fn repeated_requests_are_no_ops() {
        assert_eq!(
            PanelState::Closed.close(),
            Transition::Unchanged(PanelState::Closed)
        );
        assert_eq!(
            PanelState::Closing.close(),
            Transition::Unchanged(PanelState::Closing)
        );
        assert_eq!(
            PanelState::Open.open(),
            Transition::Unchanged(PanelState::Open)
        );
        assert_eq!(
            PanelState::Opening.open(),
            Transition::Unchanged(PanelState::Opening)
        );
        assert!(!PanelState::Closed.finish().changed());
    }

    #[test]
    fn requests_reverse_an_animation_in_progress() {
        assert_eq!(PanelState::Opening.close().state(), PanelState::Closing);
        assert_eq!(PanelState::Closing.open().state(), PanelState::Opening);
    }

    #[test]
    fn toggle_dispatches_on_visibility() {
        assert_eq!(PanelState::Closed.toggle().state(), PanelState::Opening);
        assert_eq!(PanelState::Open.toggle().state(), PanelState::Closing);
        assert_eq!(PanelState::Opening.toggle().state(), PanelState::Closing);
        assert_eq!(PanelState::Closing.toggle().state(), PanelState::Opening);
    }
}
