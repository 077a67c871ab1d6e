//! Assembles the peripheral/interrupt subsystem into the `Soc` an embedding
//! MIPS interpreter drives: board configuration, the CPU-adapter seam, and
//! reset orchestration across the device models the `devices`/`disk`/`vtty`
//! crates provide.

pub mod config;
pub mod cpu;
pub mod soc;

pub use config::BoardConfig;
pub use cpu::CpuAdapter;
pub use soc::{Soc, Variant};
