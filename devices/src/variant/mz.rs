//! MZ register table: 6 IFS/IEC banks, 6 SPI units, direct IRQ-number-as-
//! vector mapping, plus the MZ-only ANSEL/CNxx GPIO registers.

use crate::register::{build_table, Hook, RegKind, RegSpec, RegTable};
use crate::uart::NUM_UART;
use crate::variant::offsets::*;
use crate::variant::{SPISTAT_RO_MASK, USTA_RO_MASK};

pub const NUM_BANKS: usize = 6;
pub const NUM_SPI: usize = 6;
pub const NUM_GPIO_PORTS: usize = 7;
pub const IRQ_LAST: u32 = 191;

// Base (error/fault) IRQ number for each unit; +1 is the RX/transfer-done
// IRQ, +2 is the TX/receive-done IRQ, matching the fixed 3-IRQ group every
// UART and SPI unit occupies on this family. The PIC32MZ datasheet's exact
// IRQ numbering was not part of the retrieved source, so these use a
// contiguous block assignment in unit order (see DESIGN.md); what matters
// functionally is that each unit's 3 IRQs are distinct and bank-addressable.
pub const SPI_IRQ_BASE: [u32; NUM_SPI] = [130, 133, 136, 139, 142, 145];
pub const UART_IRQ_BASE: [u32; NUM_UART] = [112, 115, 118, 121, 124, 127];

pub fn build() -> RegTable {
    let mut specs: Vec<RegSpec> = Vec::new();

    specs.push(RegSpec::new(CFGCON, "CFGCON", RegKind::Storage));
    specs.push(RegSpec::new(DEVID, "DEVID", RegKind::ReadOnly));
    specs.push(
        RegSpec::new(SYSKEY, "SYSKEY", RegKind::Storage).with_write_hook(Hook::SysKeyWrite),
    );
    specs.push(RegSpec::new(RCON, "RCON", RegKind::Storage));
    specs.push(
        RegSpec::new(RSWRST, "RSWRST", RegKind::WriteOp { ro_mask: 0 })
            .with_write_hook(Hook::RswrstWrite)
            .with_read_hook(Hook::RswrstRead),
    );
    specs.push(RegSpec::new(OSCCON, "OSCCON", RegKind::Storage));
    specs.push(RegSpec::new(OSCTUN, "OSCTUN", RegKind::Storage));
    specs.push(RegSpec::new(DEVCFG0, "DEVCFG0", RegKind::Storage));
    specs.push(RegSpec::new(DEVCFG1, "DEVCFG1", RegKind::Storage));
    specs.push(RegSpec::new(DEVCFG2, "DEVCFG2", RegKind::Storage));
    specs.push(RegSpec::new(DEVCFG3, "DEVCFG3", RegKind::Storage));

    specs.push(RegSpec::new(INTCON, "INTCON", RegKind::WriteOp { ro_mask: 0 }));
    specs.push(RegSpec::new(INTSTAT, "INTSTAT", RegKind::ReadOnly));
    specs.push(RegSpec::new(IPTMR, "IPTMR", RegKind::WriteOp { ro_mask: 0 }));
    for n in 0..NUM_BANKS as u32 {
        specs.push(
            RegSpec::new(IFS_BASE + 0x10 * n, "IFS", RegKind::WriteOp { ro_mask: 0 })
                .with_write_hook(Hook::IrqRecompute),
        );
        specs.push(
            RegSpec::new(IEC_BASE + 0x10 * n, "IEC", RegKind::WriteOp { ro_mask: 0 })
                .with_write_hook(Hook::IrqRecompute),
        );
    }
    // IRQ_LAST=191 -> 192 IRQs -> 48 IPC words (4 priorities per word).
    for n in 0..48u32 {
        specs.push(
            RegSpec::new(IPC_BASE + 0x10 * n, "IPC", RegKind::WriteOp { ro_mask: 0 })
                .with_write_hook(Hook::IrqRecompute),
        );
    }

    for unit in 0..NUM_UART as u32 {
        let base = UART_BASE + UART_STRIDE * unit;
        specs.push(
            RegSpec::new(base + U_MODE, "UMODE", RegKind::WriteOp { ro_mask: 0 })
                .with_write_hook(Hook::UartModeWrite(unit as u8)),
        );
        specs.push(
            RegSpec::new(base + U_STA, "USTA", RegKind::WriteOp { ro_mask: USTA_RO_MASK })
                .with_write_hook(Hook::UartStaWrite(unit as u8))
                .with_read_hook(Hook::UartStaRead(unit as u8)),
        );
        specs.push(
            RegSpec::new(base + U_TXREG, "UTXREG", RegKind::Storage)
                .with_write_hook(Hook::UartTxRegWrite(unit as u8)),
        );
        specs.push(
            RegSpec::new(base + U_RXREG, "URXREG", RegKind::ReadOnly)
                .with_read_hook(Hook::UartRxRegRead(unit as u8)),
        );
        specs.push(RegSpec::new(base + U_BRG, "UBRG", RegKind::WriteOp { ro_mask: 0 }));
    }

    for unit in 0..NUM_SPI as u32 {
        let base = SPI_BASE + SPI_STRIDE * unit;
        specs.push(
            RegSpec::new(base + SPI_CON, "SPICON", RegKind::WriteOp { ro_mask: 0 })
                .with_write_hook(Hook::SpiConWrite(unit as u8)),
        );
        specs.push(RegSpec::new(base + SPI_CON2, "SPICON2", RegKind::WriteOp { ro_mask: 0 }));
        specs.push(
            RegSpec::new(base + SPI_STAT, "SPISTAT", RegKind::WriteOp { ro_mask: SPISTAT_RO_MASK })
                .with_write_hook(Hook::SpiStatWrite(unit as u8)),
        );
        specs.push(
            RegSpec::new(base + SPI_BUF, "SPIBUF", RegKind::Storage)
                .with_read_hook(Hook::SpiBufRead(unit as u8))
                .with_write_hook(Hook::SpiBufWrite(unit as u8)),
        );
        specs.push(RegSpec::new(base + SPI_BRG, "SPIBRG", RegKind::WriteOp { ro_mask: 0 }));
    }

    for port in 0..NUM_GPIO_PORTS as u32 {
        let base = GPIO_BASE + GPIO_STRIDE * port;
        specs.push(RegSpec::new(base + G_ANSEL, "ANSEL", RegKind::WriteOp { ro_mask: 0 }));
        specs.push(RegSpec::new(base + G_TRIS, "TRIS", RegKind::WriteOp { ro_mask: 0 }));
        specs.push(RegSpec::new(base + G_PORT, "PORT", RegKind::WriteOp { ro_mask: 0 })
            .with_write_hook(Hook::GpioLatWrite(port as u8)));
        specs.push(
            RegSpec::new(base + G_LAT, "LAT", RegKind::WriteOp { ro_mask: 0 })
                .with_write_hook(Hook::GpioLatWrite(port as u8)),
        );
        specs.push(RegSpec::new(base + G_ODC, "ODC", RegKind::WriteOp { ro_mask: 0 }));
        specs.push(
            RegSpec::new(base + G_CNPU, "CNPU", RegKind::WriteOp { ro_mask: 0 })
                .with_read_hook(Hook::CnpuCnpdRead),
        );
        specs.push(
            RegSpec::new(base + G_CNPD, "CNPD", RegKind::WriteOp { ro_mask: 0 })
                .with_read_hook(Hook::CnpuCnpdRead),
        );
        specs.push(RegSpec::new(base + G_CNCON, "CNCON", RegKind::WriteOp { ro_mask: 0 }));
        specs.push(RegSpec::new(base + G_CNEN, "CNEN", RegKind::WriteOp { ro_mask: 0 }));
        specs.push(RegSpec::new(base + G_CNSTAT, "CNSTAT", RegKind::WriteOp { ro_mask: 0 }));
    }

    for n in 0..PPS_COUNT {
        specs.push(RegSpec::new(PPS_BASE + PPS_STRIDE * n, "PPSR", RegKind::Storage));
    }

    build_table(&specs)
}
