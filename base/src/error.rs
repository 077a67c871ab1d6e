use std::io;

/// Errors recoverable enough to propagate rather than abort the process.
///
/// Truly fatal conditions (unknown I/O address, bad access width, a machine
/// check from the CPU) do not go through this type: they go through
/// [`crate::fatal`], which logs and terminates immediately per the
/// simulator's fail-fast policy.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("short transfer: wanted {wanted} bytes, got {got}")]
    ShortTransfer { wanted: usize, got: usize },
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
