//! Connection abstraction used by the pool.

use crate::error::DispatchResult;

/// A live request/response connection to the remote service.
pub trait Connection: Send {
    /// Send one command and wait for its reply.
    fn command(&mut self, command: &str) -> DispatchResult<String>;

    /// Whether an earlier failure left the connection unusable. The pool
    /// replaces broken connections when they are checked back in.
    fn is_broken(&self) -> bool {
        false
    }

    /// Shut the connection down.
    fn close(self) -> DispatchResult<()>
    where
        Self: Sized;
}

/// Establishes new connections for a pool.
pub trait Connector: Sync {
    type Connection: Connection;

    /// Open and authenticate one connection.
    fn connect(&self) -> DispatchResult<Self::Connection>;
}
