//! Bounded connection pool and worker dispatch for remote console commands.
//!
//! A [`ConnectionPool`] opens a fixed number of connections up front and hands
//! them out one worker at a time. [`dispatch`] runs exactly as many OS threads
//! as there are connections, so the number of commands in flight never exceeds
//! the pool size no matter how long the command list is.
//!
//! The pool is generic over [`Connector`]; [`rcon`] provides the TCP remote
//! console implementation used in production.
//!
//! # Example
//!
//! ```no_run
//! use blockcast_dispatch::{FailurePolicy, rcon::RconConnector, send_commands};
//!
//! let connector = RconConnector::new("localhost", 25575, "secret");
//! let commands = ["setblock 0 64 0 minecraft:stone"];
//! let report = send_commands(&connector, 16, &commands, FailurePolicy::Abort)?;
//! assert_eq!(report.sent(), 1);
//! # Ok::<(), blockcast_dispatch::DispatchError>(())
//! ```

mod connection;
mod dispatcher;
mod error;
mod pool;
#[cfg(test)]
mod testing;

pub mod rcon;

pub use connection::{Connection, Connector};
pub use dispatcher::{DispatchReport, FailurePolicy, dispatch, send_commands};
pub use error::{DispatchError, DispatchResult};
pub use pool::{ConnectionPool, PooledConnection};
