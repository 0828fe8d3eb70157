//! The session state machine.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::TransitionError;

/// Lifecycle state of a session.
///
/// Transitions only move forward:
///
/// ```text
/// Connecting ──→ Authenticating ──→ Authenticated ──→ Closed
///     │                 │                               ↑
///     └─────────────────┴───────────────────────────────┘
/// ```
///
/// - **Connecting**: the transport is upgraded, nothing read yet.
/// - **Authenticating**: the handshake is running.
/// - **Authenticated**: the identity is verified and the session is in
///   the registry. Only this state is ever registered.
/// - **Closed**: torn down. Terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessionState {
    Connecting = 0,
    Authenticating = 1,
    Authenticated = 2,
    Closed = 3,
}

impl SessionState {
    /// Returns `true` if moving from `self` to `target` is legal.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Connecting, Self::Authenticating)
                | (Self::Authenticating, Self::Authenticated)
                | (
                    Self::Connecting | Self::Authenticating | Self::Authenticated,
                    Self::Closed
                )
        )
    }

    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Connecting,
            1 => Self::Authenticating,
            2 => Self::Authenticated,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Authenticating => write!(f, "Authenticating"),
            Self::Authenticated => write!(f, "Authenticated"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// A [`SessionState`] shared between the tasks of one session.
///
/// Transitions are compare-and-swap, so two tasks racing to move the
/// state cannot both succeed with conflicting targets.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(SessionState::Connecting as u8))
    }

    pub(crate) fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves to `target`, returning the state it replaced.
    pub(crate) fn transition(
        &self,
        target: SessionState,
    ) -> Result<SessionState, TransitionError> {
        let mut current = self.get();
        loop {
            if !current.can_transition_to(target) {
                return Err(TransitionError {
                    from: current,
                    to: target,
                });
            }
            match self.0.compare_exchange(
                current as u8,
                target as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(current),
                Err(actual) => current = SessionState::from_u8(actual),
            }
        }
    }
}
