//! Four (MX7) or six (MZ) SPI units: 4-entry enhanced-buffer FIFOs and
//! byte/halfword/word-wide transfers, with SD-card routing on whichever
//! unit the board wires to the card.

pub const MAX_SPI: usize = 6;

pub const SPICON_ON: u32 = 1 << 15;
pub const SPICON_ENHBUF: u32 = 1 << 16;
pub const SPICON_MODE16: u32 = 1 << 10;
pub const SPICON_MODE32: u32 = 1 << 11;

pub const SPISTAT_SPIRBF: u32 = 1 << 0;
pub const SPISTAT_SPITBE: u32 = 1 << 3;
pub const SPISTAT_SPIROV: u32 = 1 << 6;

pub const SPI_IRQ_FAULT: u32 = 0;
pub const SPI_IRQ_TX: u32 = 1;
pub const SPI_IRQ_RX: u32 = 2;

/// Whatever is attached to an SPI unit's data line. Implemented by
/// `disk::sdcard::SdCard`; units with no peripheral never call this.
pub trait SpiPeripheral {
    fn io(&mut self, data: u8) -> u8;
}

#[derive(Default)]
pub struct SpiUnit {
    pub con: u32,
    pub con2: u32,
    pub stat: u32,
    pub brg: u32,
    buf: [u32; 4],
    rfifo: usize,
    wfifo: usize,
}

impl SpiUnit {
    pub fn reset(&mut self) {
        self.con = 0;
        self.con2 = 0;
        self.stat = SPISTAT_SPITBE;
        self.brg = 0;
        self.buf = [0; 4];
        self.rfifo = 0;
        self.wfifo = 0;
    }
}

pub struct SpiBank {
    pub units: Vec<SpiUnit>,
    pub irq_base: Vec<u32>,
    /// Index of the unit wired to the SD card, if any.
    pub sdcard_unit: Option<usize>,
}

impl SpiBank {
    pub fn new(count: usize, irq_base: Vec<u32>, sdcard_unit: Option<usize>) -> Self {
        let mut units = Vec::with_capacity(count);
        units.resize_with(count, SpiUnit::default);
        SpiBank { units, irq_base, sdcard_unit }
    }

    pub fn reset(&mut self) {
        for u in &mut self.units {
            u.reset();
        }
    }

    /// Write to SPIxBUF: run the transfer through the SD card (if this is
    /// the SD-attached unit) or produce 0xFF, store into the FIFO, advance
    /// cursors, and set SPIRBF/SPIROV.
    pub fn writebuf(&mut self, unit: usize, val: u32, sd: Option<&mut dyn SpiPeripheral>) {
        let is_sd = self.sdcard_unit == Some(unit);
        let con = self.units[unit].con;
        let result = if is_sd {
            let sd = sd.expect("sdcard_unit routing without a peripheral attached");
            if con & SPICON_MODE32 != 0 {
                let b0 = sd.io((val >> 24) as u8) as u32;
                let b1 = sd.io((val >> 16) as u8) as u32;
                let b2 = sd.io((val >> 8) as u8) as u32;
                let b3 = sd.io(val as u8) as u32;
                (b0 << 24) | (b1 << 16) | (b2 << 8) | b3
            } else if con & SPICON_MODE16 != 0 {
                let b0 = sd.io((val >> 8) as u8) as u32;
                let b1 = sd.io(val as u8) as u32;
                (b0 << 8) | b1
            } else {
                sd.io(val as u8) as u32
            }
        } else {
            u32::MAX
        };
        let u = &mut self.units[unit];
        u.buf[u.wfifo] = result;
        if u.stat & SPISTAT_SPIRBF != 0 {
            u.stat |= SPISTAT_SPIROV;
        } else if u.con & SPICON_ENHBUF != 0 {
            u.wfifo = (u.wfifo + 1) & 3;
            if u.wfifo == u.rfifo {
                u.stat |= SPISTAT_SPIRBF;
            }
        } else {
            u.stat |= SPISTAT_SPIRBF;
        }
    }

    /// Read of SPIxBUF.
    pub fn readbuf(&mut self, unit: usize) -> u32 {
        let u = &mut self.units[unit];
        let result = u.buf[u.rfifo];
        if u.con & SPICON_ENHBUF != 0 {
            u.rfifo = (u.rfifo + 1) & 3;
        }
        u.stat &= !SPISTAT_SPIRBF;
        result
    }

    /// Write to SPIxCON: returns the IRQs to clear if ON was just cleared.
    pub fn control(&mut self, unit: usize) -> Vec<u32> {
        let mut cleared = Vec::new();
        let u = &mut self.units[unit];
        if u.con & SPICON_ON == 0 {
            cleared.push(self.irq_base[unit] + SPI_IRQ_FAULT);
            cleared.push(self.irq_base[unit] + SPI_IRQ_RX);
            cleared.push(self.irq_base[unit] + SPI_IRQ_TX);
            u.stat = SPISTAT_SPITBE;
        } else if u.con & SPICON_ENHBUF == 0 {
            u.rfifo = 0;
            u.wfifo = 0;
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoCard;
    impl SpiPeripheral for NoCard {
        fn io(&mut self, _data: u8) -> u8 {
            0xFF
        }
    }

    #[test]
    fn enhanced_fifo_round_trip() {
        let mut bank = SpiBank::new(1, vec![0], None);
        bank.units[0].con = SPICON_ON | SPICON_ENHBUF;
        for i in 0..4u32 {
            bank.writebuf(0, i, None);
        }
        assert_ne!(bank.units[0].stat & SPISTAT_SPIRBF, 0);
        for i in 0..4u32 {
            let v = bank.readbuf(0);
            assert_eq!(v, 0xFF);
            let _ = i;
        }
        assert_eq!(bank.units[0].stat & SPISTAT_SPIRBF, 0);
    }

    #[test]
    fn writebuf_with_sd_routes_through_peripheral() {
        let mut bank = SpiBank::new(1, vec![0], Some(0));
        bank.units[0].con = SPICON_ON;
        let mut card = NoCard;
        bank.writebuf(0, 0x42, Some(&mut card));
        assert_eq!(bank.readbuf(0), 0xFF);
    }
}
