//! # Error Types
//!
//! All fallible operations in the crate return [`GraphError`]. The variants
//! fall into two families the host should treat differently: *user refusals*
//! (the operation made no change and the editor simply reports "illegal") and
//! *invariant violations* (a bug or corrupt state; no recovery is attempted).

use thiserror::Error;

/// An error raised by the wiring graph or the editor state machine.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// A handle does not refer to a live element of its store.
    ///
    /// Invariant violation: handles are stable, so a dead handle means the
    /// caller kept one past an erase.
    #[error("handle does not refer to a live element")]
    InvalidHandle,

    /// The targeted port slot already hosts a connection. User refusal.
    #[error("port already hosts a connection")]
    PortOccupied,

    /// The two endpoints of a proposed connection do not face each other.
    /// User refusal.
    #[error("connection endpoints must face opposite directions")]
    NonOpposingPorts,

    /// A connection endpoint cannot be built at the targeted cell (it holds a
    /// crossing, a gate body, or a block body). User refusal.
    #[error("cannot build a connection endpoint at this location")]
    IllegalTarget,

    /// The operation would leave a net with two driving endpoints.
    #[error("net would end up with more than one driving endpoint")]
    InputConflict,

    /// The wiring graph reached a state the grid model rules out, e.g. three
    /// connections meeting at a cell without a node. Fatal.
    #[error("wiring graph invariant violated")]
    GraphInvariantViolation,

    /// The port or connection is not part of the net it was looked up in.
    #[error("port or connection is not part of this net")]
    NotInNet,
}

impl GraphError {
    /// True for errors that are plain user refusals: the graph is unchanged
    /// and the editor may keep running.
    pub fn is_user_refusal(self) -> bool {
        matches!(
            self,
            GraphError::PortOccupied | GraphError::NonOpposingPorts | GraphError::IllegalTarget
        )
    }
}
