//! Per-connection lifecycle state machine.
//!
//! ```text
//! Pending ──Admit──▶ Authenticated ──BeginDispatch──▶ Active
//!    │                     │                             │
//!    └──────Terminate──────┴──────────Terminate──────────┴──▶ Terminated
//! ```
//!
//! `Pending` covers gate evaluation and the transport upgrade. A rejected
//! attempt never leaves `Pending`; the transport simply drops it. Every
//! transition not in the table is refused, which is what makes a second
//! termination a no-op.

/// Where a connection is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Accepted by the transport, not yet admitted.
    Pending,
    /// Identity bound and registered; commands not yet dispatched.
    Authenticated,
    /// Inbound commands are being dispatched.
    Active,
    /// Deregistered. Terminal.
    Terminated,
}

/// Inputs that move a connection between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The gate admitted the connection.
    Admit,
    /// Registration finished; start dispatching commands.
    BeginDispatch,
    /// The transport reported termination.
    Terminate,
}

impl LifecycleState {
    /// The transition table. `None` means the event is not valid here.
    pub fn next(self, event: LifecycleEvent) -> Option<Self> {
        use LifecycleEvent::*;
        use LifecycleState::*;

        match (self, event) {
            (Pending, Admit) => Some(Authenticated),
            (Authenticated, BeginDispatch) => Some(Active),
            (Pending | Authenticated | Active, Terminate) => Some(Terminated),
            _ => None,
        }
    }

    /// Whether the connection is in the registry in this state.
    pub fn is_registered(self) -> bool {
        matches!(self, Self::Authenticated | Self::Active)
    }
}

/// Tracks one connection's state.
#[derive(Debug)]
pub struct ConnectionLifecycle {
    state: LifecycleState,
}

impl Default for ConnectionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionLifecycle {
    /// A fresh connection, in `Pending`.
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Pending,
        }
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Applies `event`. On success returns the state that was left; on an
    /// invalid transition returns `None` and leaves the state unchanged.
    pub fn apply(&mut self, event: LifecycleEvent) -> Option<LifecycleState> {
        let next = self.state.next(event)?;
        let previous = self.state;
        self.state = next;
        Some(previous)
    }
}
