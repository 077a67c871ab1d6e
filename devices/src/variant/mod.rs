//! Per-chip-variant register layout. MX7 and MZ share the register-decoder
//! mechanism in [`crate::register`] but declare independent tables: they
//! differ in bank count (3 vs 6 IFS/IEC banks), IRQ-to-vector mapping, and
//! which GPIO registers exist (MZ adds ANSEL/CNxx).

pub mod mx7;
pub mod mz;

/// Offsets shared verbatim by both variants' register blocks (system
/// control, UART, SPI, GPIO all live at the same byte offsets on both
/// chips in the source this crate is grounded on).
pub mod offsets {
    pub const CFGCON: u32 = 0x0000;
    pub const DEVID: u32 = 0x0020;
    pub const SYSKEY: u32 = 0x0030;
    pub const RCON: u32 = 0x0040;
    pub const RSWRST: u32 = 0x0050;
    pub const OSCCON: u32 = 0x0060;
    pub const OSCTUN: u32 = 0x0070;
    pub const DEVCFG0: u32 = 0x0080;
    pub const DEVCFG1: u32 = 0x0090;
    pub const DEVCFG2: u32 = 0x00A0;
    pub const DEVCFG3: u32 = 0x00B0;

    pub const INTCON: u32 = 0x1000;
    pub const INTSTAT: u32 = 0x1010;
    pub const IPTMR: u32 = 0x1020;
    pub const IFS_BASE: u32 = 0x1030;
    pub const IEC_BASE: u32 = 0x10B0;
    pub const IPC_BASE: u32 = 0x1200;

    pub const UART_BASE: u32 = 0x6000;
    pub const UART_STRIDE: u32 = 0x200;
    // per-unit sub-offsets
    pub const U_MODE: u32 = 0x00;
    pub const U_STA: u32 = 0x10;
    pub const U_TXREG: u32 = 0x20;
    pub const U_RXREG: u32 = 0x30;
    pub const U_BRG: u32 = 0x40;

    pub const SPI_BASE: u32 = 0x5800;
    pub const SPI_STRIDE: u32 = 0x100;
    pub const SPI_CON: u32 = 0x00;
    pub const SPI_CON2: u32 = 0x10;
    pub const SPI_STAT: u32 = 0x20;
    pub const SPI_BUF: u32 = 0x30;
    pub const SPI_BRG: u32 = 0x40;

    pub const GPIO_BASE: u32 = 0x8600;
    pub const GPIO_STRIDE: u32 = 0x100;
    pub const G_ANSEL: u32 = 0x00;
    pub const G_TRIS: u32 = 0x10;
    pub const G_PORT: u32 = 0x20;
    pub const G_LAT: u32 = 0x30;
    pub const G_ODC: u32 = 0x40;
    pub const G_CNPU: u32 = 0x50;
    pub const G_CNPD: u32 = 0x60;
    pub const G_CNCON: u32 = 0x70;
    pub const G_CNEN: u32 = 0x80;
    pub const G_CNSTAT: u32 = 0x90;

    // A representative Peripheral Pin Select sample block. Real PIC32
    // variants expose dozens of these; this crate carries a representative
    // set (see DESIGN.md) since PPS routing itself is out of scope and
    // these registers are inert storage.
    pub const PPS_BASE: u32 = 0x1D00;
    pub const PPS_STRIDE: u32 = 0x04;
    pub const PPS_COUNT: u32 = 32;
}

/// UxSTA's hardware-status-only bits, preserved across masked quartet
/// writes (URXDA, FERR, PERR, RIDLE, TRMT, UTXBF).
pub const USTA_RO_MASK: u32 = crate::uart::USTA_URXDA
    | crate::uart::USTA_FERR
    | crate::uart::USTA_PERR
    | crate::uart::USTA_RIDLE
    | crate::uart::USTA_TRMT
    | crate::uart::USTA_UTXBF;

/// SPIxSTAT's only firmware-writable bit is SPIROV (to clear it); every
/// other bit is hardware-status.
pub const SPISTAT_RO_MASK: u32 = !crate::spi::SPISTAT_SPIROV;
