//! Data-driven register classification shared by the MX7 and MZ decoder
//! tables.
//!
//! Each SFR is declared once as a [`RegSpec`]; [`build_table`] expands it
//! into the one-to-four [`RegEntry`] slots a real PIC32 exposes at that
//! 16-byte-aligned block (base / `+4` CLR / `+8` SET / `+12` INV). Lookups
//! against the resulting [`RegTable`] are by exact byte offset, so an access
//! to an alias a register never declared is reported the same way as an
//! access to a genuinely unmapped address: unknown, fail fast.

use std::collections::BTreeMap;

/// Which of the four 16-byte-aligned slots a decoded offset fell on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alias {
    Base,
    Clr,
    Set,
    Inv,
}

impl Alias {
    fn from_low_bits(offset: u32) -> Alias {
        match offset & 0xC {
            0x0 => Alias::Base,
            0x4 => Alias::Clr,
            0x8 => Alias::Set,
            0xC => Alias::Inv,
            _ => unreachable!(),
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Alias::Base => "",
            Alias::Clr => "CLR",
            Alias::Set => "SET",
            Alias::Inv => "INV",
        }
    }
}

/// The declared behavior of a register, independent of chip variant.
#[derive(Clone, Copy, Debug)]
pub enum RegKind {
    /// Plain read/write of the backing word.
    Storage,
    /// Writes are rejected (logged, storage preserved); reads pass through.
    ReadOnly,
    /// Assign/clear/set/invert quartet at `base`, `base+4`, `base+8`, `base+12`.
    /// `ro_mask` bits are preserved across writes (hardware-status-only
    /// bits); pass `0` for an unmasked quartet.
    WriteOp { ro_mask: u32 },
}

/// Side effect to run after a register's storage has been read or written.
/// The decoder only classifies *which* hook fires; the simulator core
/// (which owns the UART/SPI/GPIO/IRQ models) is responsible for running it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hook {
    SysKeyWrite,
    RswrstWrite,
    RswrstRead,
    IrqRecompute,
    UartRxRegRead(u8),
    UartTxRegWrite(u8),
    UartModeWrite(u8),
    UartStaWrite(u8),
    UartStaRead(u8),
    SpiBufRead(u8),
    SpiBufWrite(u8),
    SpiConWrite(u8),
    SpiStatWrite(u8),
    GpioLatWrite(u8),
    CnpuCnpdRead,
}

/// A single declared register, before alias expansion.
#[derive(Clone, Copy, Debug)]
pub struct RegSpec {
    pub offset: u32,
    pub name: &'static str,
    pub kind: RegKind,
    pub read_hook: Option<Hook>,
    pub write_hook: Option<Hook>,
}

impl RegSpec {
    pub const fn new(offset: u32, name: &'static str, kind: RegKind) -> Self {
        RegSpec { offset, name, kind, read_hook: None, write_hook: None }
    }

    pub const fn with_write_hook(mut self, hook: Hook) -> Self {
        self.write_hook = Some(hook);
        self
    }

    pub const fn with_read_hook(mut self, hook: Hook) -> Self {
        self.read_hook = Some(hook);
        self
    }
}

/// The expanded, lookup-ready form of a [`RegSpec`] at one concrete offset.
#[derive(Clone, Copy, Debug)]
pub struct RegEntry {
    /// Word-storage offset (always the un-aliased base for WriteOp regs).
    pub base: u32,
    pub name: &'static str,
    pub alias: Alias,
    pub kind: RegKind,
    pub read_hook: Option<Hook>,
    pub write_hook: Option<Hook>,
}

impl RegEntry {
    pub fn trace_name(&self) -> String {
        format!("{}{}", self.name, self.alias.suffix())
    }
}

pub type RegTable = BTreeMap<u32, RegEntry>;

/// Expand a flat list of register specs into a byte-offset-indexed table.
pub fn build_table(specs: &[RegSpec]) -> RegTable {
    let mut table = RegTable::new();
    for spec in specs {
        match spec.kind {
            RegKind::Storage | RegKind::ReadOnly => {
                table.insert(
                    spec.offset,
                    RegEntry {
                        base: spec.offset,
                        name: spec.name,
                        alias: Alias::Base,
                        kind: spec.kind,
                        read_hook: spec.read_hook,
                        write_hook: spec.write_hook,
                    },
                );
            }
            RegKind::WriteOp { .. } => {
                for delta in [0u32, 4, 8, 12] {
                    let offset = spec.offset + delta;
                    table.insert(
                        offset,
                        RegEntry {
                            base: spec.offset,
                            name: spec.name,
                            alias: Alias::from_low_bits(offset),
                            kind: spec.kind,
                            read_hook: spec.read_hook,
                            write_hook: spec.write_hook,
                        },
                    );
                }
            }
        }
    }
    table
}

/// Apply the assign/clear/set/invert quartet operation implied by `alias`.
pub fn apply_op(current: u32, operand: u32, alias: Alias) -> u32 {
    match alias {
        Alias::Base => operand,
        Alias::Clr => current & !operand,
        Alias::Set => current | operand,
        Alias::Inv => current ^ operand,
    }
}

/// Apply a masked quartet write: `ro_mask` bits of `current` survive
/// unconditionally, the rest come from the ordinary quartet result.
pub fn apply_op_masked(current: u32, operand: u32, alias: Alias, ro_mask: u32) -> u32 {
    (current & ro_mask) | (apply_op(current, operand, alias) & !ro_mask)
}
