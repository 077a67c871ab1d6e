//! Ambient plumbing shared by every crate in the simulator: error types,
//! logging setup and the fatal/diagnosed/silent severity policy described
//! for the peripheral core.

mod error;
mod fatal;
mod logging;

pub use error::{Error, Result};
pub use fatal::fatal;
pub use logging::init_logging;
pub use log::*;
