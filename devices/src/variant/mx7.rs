//! MX7 register table: 3 IFS/IEC banks, 4 SPI units, IRQ-to-vector lookup
//! table (several IRQs collapse onto one vector).

use crate::register::{build_table, Hook, RegKind, RegSpec, RegTable};
use crate::uart::NUM_UART;
use crate::variant::offsets::*;
use crate::variant::{SPISTAT_RO_MASK, USTA_RO_MASK};

pub const NUM_BANKS: usize = 3;
pub const NUM_SPI: usize = 4;
pub const NUM_GPIO_PORTS: usize = 7;
pub const IRQ_LAST: u32 = 75;

/// IRQ -> vector map. Grounded on `original_source/mx7.c`'s `irq_to_vector`
/// table: several IRQ groups (UART-error/SPI-fault/I2C-collision triples,
/// and the trailing IC-error quartet) collapse onto one shared vector.
/// The table preserves every collision exactly as declared there; the
/// numeric vector values themselves are renumbered sequentially in
/// declaration order since the PIC32MX7 vector-number header was not part
/// of the retrieved source (see DESIGN.md).
pub static IRQ_TO_VECTOR: [u32; (IRQ_LAST + 1) as usize] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, // 0-9: CT,CS0,CS1,INT0,T1,IC1,OC1,INT1,T2,IC2
    10, 11, 12, 13, 14, 15, 16, 17, 18, 19, // 10-19: OC2,INT2,T3,IC3,OC3,INT3,T4,IC4,OC4,INT4
    20, 21, 22, 23, 23, 23, // 20-25: T5,IC5,OC5,SPI1 fault/tx/rx share vector 23
    24, 24, 24, // 26-28: UART1 err/rx/tx + SPI3 + I2C3 share vector 24
    25, 25, 25, // 29-31: I2C1 bus/slave/master share vector 25
    26, 27, 28, 29, 30, // 32-36: CN,AD1,PMP,CMP1,CMP2
    31, 31, 31, // 37-39: UART3 + SPI2 + I2C4 share vector 31
    32, 32, 32, // 40-42: UART2 + SPI4 + I2C5 share vector 32
    33, 33, 33, // 43-45: I2C2 bus/slave/master share vector 33
    34, 35, // 46-47: FSCM, RTCC
    36, 37, 38, 39, 40, 41, 42, 43, // 48-55: DMA0-7
    44, 45, 46, 47, 48, // 56-60: FCE,USB,CAN1,CAN2,ETH
    5, 9, 13, 17, 21, // 61-65: IC1-5 error share vectors with their IC unit
    28, // 66: PMP error
    49, 49, 49, // 67-69: UART4 err/rx/tx
    50, 50, 50, // 70-72: UART6 err/rx/tx
    51, 51, 51, // 73-75: UART5 err/rx/tx
];

pub const SPI_IRQ_BASE: [u32; NUM_SPI] = [23, 37, 26, 40]; // SPI1,SPI2,SPI3,SPI4 error IRQ
pub const UART_IRQ_BASE: [u32; NUM_UART] = [26, 40, 37, 67, 73, 70]; // U1..U6 error IRQ

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
    // One IPC word packs priorities for 4 vectors; 66 vectors -> 17 words.
    for n in 0..17u32 {
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
        specs.push(RegSpec::new(base + G_TRIS, "TRIS", RegKind::WriteOp { ro_mask: 0 }));
        specs.push(RegSpec::new(base + G_PORT, "PORT", RegKind::WriteOp { ro_mask: 0 })
            .with_write_hook(Hook::GpioLatWrite(port as u8)));
        specs.push(
            RegSpec::new(base + G_LAT, "LAT", RegKind::WriteOp { ro_mask: 0 })
                .with_write_hook(Hook::GpioLatWrite(port as u8)),
        );
        specs.push(RegSpec::new(base + G_ODC, "ODC", RegKind::WriteOp { ro_mask: 0 }));
    }

    for n in 0..PPS_COUNT {
        specs.push(RegSpec::new(PPS_BASE + PPS_STRIDE * n, "PPSR", RegKind::Storage));
    }

    build_table(&specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_all_uart_units() {
        let table = build();
        for unit in 0..NUM_UART as u32 {
            let base = UART_BASE + UART_STRIDE * unit;
            assert!(table.contains_key(&(base + U_TXREG)));
        }
    }

    #[test]
    fn irq_to_vector_has_expected_length() {
        assert_eq!(IRQ_TO_VECTOR.len(), (IRQ_LAST + 1) as usize);
    }
}
