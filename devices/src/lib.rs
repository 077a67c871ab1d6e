//! Peripheral and interrupt subsystem for the PIC32 MX7/MZ simulator.
//!
//! This crate owns everything a CPU adapter touches through the
//! memory-mapped I/O window: the [`io_fabric`] decode/dispatch layer, the
//! [`register`] table format shared by both chip variants, the
//! [`irq`] controller, and the [`uart`], [`spi`], and [`gpio`] device
//! models. SD-card and host-TTY behavior live in the sibling `disk` and
//! `vtty` crates; this crate only defines the traits they implement
//! ([`spi::SpiPeripheral`], [`uart::HostChannel`]).

pub mod gpio;
pub mod io_fabric;
pub mod irq;
pub mod register;
pub mod spi;
pub mod uart;
pub mod variant;

pub use io_fabric::IoFabric;
pub use irq::IrqController;

/// Byte offset of a peripheral register within the 1 MiB I/O window.
pub const IO_MEM_SIZE: usize = 1024 * 1024;
