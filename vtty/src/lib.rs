//! Virtual TTY host I/O: background threads that turn a TCP socket or the
//! local terminal into a [`devices::uart::HostChannel`].

pub mod backend;
pub mod ring;
pub mod telnet;
pub mod unit;

pub use backend::{spawn, Backend};
pub use unit::{ConnState, VttyUnit};
