//! Wires the register decoder, IRQ controller, UART/SPI/GPIO models and the
//! SD-card/VTTY peripherals into the single `Soc` the embedding CPU loop
//! drives. Owns the two-way sync between `IoFabric`'s raw word storage and
//! the semantic device models (`UartBank`, `SpiBank`, `GpioBank`), since the
//! decoder layer only classifies *which* hook fired and leaves running it
//! to the caller.

use devices::gpio::GpioBank;
use devices::io_fabric::{Effect, IoFabric, IO_MEM_MASK};
use devices::irq::{DirectVectorMap, IrqController, TableVectorMap, VectorMap, Winner};
use devices::register::Hook;
use devices::spi::SpiBank;
use devices::uart::{HostChannel, IrqEdge, UartBank};
use devices::variant::offsets::*;
use devices::variant::{mx7, mz};

use disk::SdCardRouter;
use vtty::VttyUnit;

use crate::config::BoardConfig;
use crate::cpu::CpuAdapter;

const SYSKEY_UNLOCK_1: u32 = 0xAA99_6655;
const SYSKEY_UNLOCK_2: u32 = 0x5566_99AA;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Variant {
    Mx7,
    Mz,
}

enum AnyVectorMap {
    Mx7(TableVectorMap),
    Mz(DirectVectorMap),
}

impl VectorMap for AnyVectorMap {
    fn vector_for(&self, irq: u32) -> Option<u32> {
        match self {
            AnyVectorMap::Mx7(m) => m.vector_for(irq),
            AnyVectorMap::Mz(m) => m.vector_for(irq),
        }
    }

    fn irq_last(&self) -> u32 {
        match self {
            AnyVectorMap::Mx7(m) => m.irq_last(),
            AnyVectorMap::Mz(m) => m.irq_last(),
        }
    }
}

impl Variant {
    fn build_table(self) -> devices::register::RegTable {
        match self {
            Variant::Mx7 => mx7::build(),
            Variant::Mz => mz::build(),
        }
    }

    fn banks(self) -> usize {
        match self {
            Variant::Mx7 => mx7::NUM_BANKS,
            Variant::Mz => mz::NUM_BANKS,
        }
    }

    fn ipc_words(self) -> usize {
        match self {
            Variant::Mx7 => 17,
            Variant::Mz => 48,
        }
    }

    fn num_spi(self) -> usize {
        match self {
            Variant::Mx7 => mx7::NUM_SPI,
            Variant::Mz => mz::NUM_SPI,
        }
    }

    fn spi_irq_base(self) -> Vec<u32> {
        match self {
            Variant::Mx7 => mx7::SPI_IRQ_BASE.to_vec(),
            Variant::Mz => mz::SPI_IRQ_BASE.to_vec(),
        }
    }

    fn uart_irq_base(self) -> [u32; devices::uart::NUM_UART] {
        match self {
            Variant::Mx7 => mx7::UART_IRQ_BASE,
            Variant::Mz => mz::UART_IRQ_BASE,
        }
    }

    fn vector_map(self) -> AnyVectorMap {
        match self {
            Variant::Mx7 => AnyVectorMap::Mx7(TableVectorMap { table: &mx7::IRQ_TO_VECTOR }),
            Variant::Mz => AnyVectorMap::Mz(DirectVectorMap { irq_last: mz::IRQ_LAST }),
        }
    }
}

pub struct Soc<C: CpuAdapter> {
    variant: Variant,
    config: BoardConfig,
    fabric: IoFabric,
    irq: IrqController<AnyVectorMap>,
    uart: UartBank,
    spi: SpiBank,
    gpio: GpioBank,
    sdcards: SdCardRouter,
    vtty: Vec<VttyUnit>,
    sys_unlock: u32,
    cpu: C,
}

fn uart_base(unit: usize) -> u32 {
    UART_BASE + UART_STRIDE * unit as u32
}

fn spi_base(unit: usize) -> u32 {
    SPI_BASE + SPI_STRIDE * unit as u32
}

fn gpio_base(port: usize) -> u32 {
    GPIO_BASE + GPIO_STRIDE * port as u32
}

impl<C: CpuAdapter> Soc<C> {
    pub fn new(
        variant: Variant,
        config: BoardConfig,
        cpu: C,
        sdcards: Vec<disk::SdCard>,
        vtty: Vec<VttyUnit>,
    ) -> Self {
        assert_eq!(vtty.len(), devices::uart::NUM_UART, "one vtty unit per UART line");
        let mut soc = Soc {
            variant,
            fabric: IoFabric::new(variant.build_table()),
            irq: IrqController::new(variant.banks(), variant.ipc_words(), variant.vector_map()),
            uart: UartBank::new(variant.uart_irq_base()),
            spi: SpiBank::new(variant.num_spi(), variant.spi_irq_base(), config.sdcard_spi_unit),
            gpio: GpioBank::default(),
            sdcards: SdCardRouter::new(sdcards),
            vtty,
            sys_unlock: 0,
            config,
            cpu,
        };
        soc.io_reset();
        soc
    }

    pub fn cpu(&self) -> &C {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut C {
        &mut self.cpu
    }

    /// Resets every device model and the boot-configuration words, without
    /// touching the running CPU (the CPU adapter's own reset is driven
    /// separately via `soft_reset`).
    pub fn io_reset(&mut self) {
        self.uart.reset();
        self.spi.reset();
        self.sdcards.reset();
        self.irq.reset();
        self.sys_unlock = 0;
        for port in 0..devices::gpio::NUM_PORTS {
            match self.variant {
                Variant::Mx7 => self.gpio.ports[port].reset_mx7(),
                Variant::Mz => self.gpio.ports[port].reset_mz(),
            }
            self.sync_gpio_to_fabric(port);
        }
        for unit in 0..devices::uart::NUM_UART {
            let base = uart_base(unit);
            self.fabric.set_word(base + U_MODE, self.uart.units[unit].mode);
            self.sync_uart_sta_out(unit);
        }
        for unit in 0..self.spi.units.len() {
            let base = spi_base(unit);
            self.fabric.set_word(base + SPI_CON, self.spi.units[unit].con);
            self.sync_spi_stat_out(unit);
        }
        self.fabric.set_word(DEVID, self.config.devid);
        self.fabric.set_word(OSCCON, self.config.osccon);
        self.fabric.set_word(DEVCFG0, self.config.devcfg0);
        self.fabric.set_word(DEVCFG1, self.config.devcfg1);
        self.fabric.set_word(DEVCFG2, self.config.devcfg2);
        self.fabric.set_word(DEVCFG3, self.config.devcfg3);
        self.notify_cpu();
    }

    fn notify_cpu(&mut self) {
        let Winner { vector, level } = self.irq.winner;
        self.fabric.set_word(INTSTAT, self.irq.intstat());
        self.cpu.set_vector(level, vector);
    }

    /// Current `(vector | level<<8)`, as published to INTSTAT.
    pub fn intstat(&self) -> u32 {
        self.irq.intstat()
    }

    /// Whether the SD card wired to SPI unit `unit` is currently selected.
    pub fn sdcard_selected(&self, unit: usize) -> bool {
        self.sdcards.cards.get(unit).map(|c| c.is_selected()).unwrap_or(false)
    }

    // ---- UART <-> fabric sync -------------------------------------------------

    fn sync_uart_in(&mut self, unit: usize) {
        let base = uart_base(unit);
        self.uart.units[unit].mode = self.fabric.word(base + U_MODE);
        self.uart.units[unit].sta = self.fabric.word(base + U_STA);
    }

    fn sync_uart_sta_out(&mut self, unit: usize) {
        let base = uart_base(unit);
        self.fabric.set_word(base + U_STA, self.uart.units[unit].sta);
    }

    fn apply_uart_edges(&mut self, edges: Vec<IrqEdge>) {
        for edge in edges {
            match edge {
                IrqEdge::Raise(irq) => self.irq.raise(irq),
                IrqEdge::Clear(irq) => self.irq.clear(irq),
            }
        }
        self.notify_cpu();
    }

    // ---- SPI <-> fabric sync --------------------------------------------------

    fn sync_spi_in(&mut self, unit: usize) {
        let base = spi_base(unit);
        self.spi.units[unit].con = self.fabric.word(base + SPI_CON);
        self.spi.units[unit].stat = self.fabric.word(base + SPI_STAT);
    }

    fn sync_spi_stat_out(&mut self, unit: usize) {
        let base = spi_base(unit);
        self.fabric.set_word(base + SPI_STAT, self.spi.units[unit].stat);
    }

    // ---- GPIO <-> fabric sync --------------------------------------------------

    fn sync_gpio_to_fabric(&mut self, port: usize) {
        let base = gpio_base(port);
        let p = &self.gpio.ports[port];
        self.fabric.set_word(base + G_TRIS, p.tris);
        self.fabric.set_word(base + G_LAT, p.lat);
        self.fabric.set_word(base + G_PORT, p.port_read());
        self.fabric.set_word(base + G_ODC, p.odc);
        if self.variant == Variant::Mz {
            self.fabric.set_word(base + G_ANSEL, p.ansel);
        }
    }

    fn gpio_lat_write(&mut self, port: usize, aligned_offset: u32) {
        let base = gpio_base(port);
        // A PORT write and a LAT write are the same physical latch; forward
        // whichever one the CPU just hit into the other's storage too.
        let written = if aligned_offset == base + G_PORT {
            self.fabric.word(base + G_PORT)
        } else {
            self.fabric.word(base + G_LAT)
        };
        self.fabric.set_word(base + G_LAT, written);
        self.fabric.set_word(base + G_PORT, written);

        let old_lat = self.gpio.ports[port].lat;
        self.gpio.ports[port].lat = written;

        let cs0 = Some((self.config.cs0_port, 1u32 << self.config.cs0_pin));
        let cs1 = Some((self.config.cs1_port, 1u32 << self.config.cs1_pin));
        let edges = self.gpio.cs_edge(port, old_lat, cs0, cs1);
        for (unit, selected) in edges {
            self.sdcards.select(unit, selected);
        }
    }

    // ---- public register access -----------------------------------------------

    pub fn read(&mut self, paddr: u32, nbytes: u32) -> u32 {
        let (mut value, effect) = self.fabric.read(paddr, nbytes);
        let Effect::Read(hook) = effect else { return value };
        match hook {
            Hook::UartRxRegRead(unit) => {
                let unit = unit as usize;
                self.sync_uart_in(unit);
                let uart = &mut self.uart;
                let vtty_unit = &mut self.vtty[unit];
                let (popped, edge) = uart.get_char(unit, vtty_unit);
                self.sync_uart_sta_out(unit);
                self.apply_uart_edges(vec![edge]);
                value = popped;
            }
            Hook::UartStaRead(unit) => {
                let unit = unit as usize;
                self.sync_uart_in(unit);
                {
                    let uart = &mut self.uart;
                    let vtty_unit = &self.vtty[unit];
                    uart.poll_status(unit, vtty_unit);
                }
                self.sync_uart_sta_out(unit);
                let (re_value, _) = self.fabric.read(paddr, nbytes);
                value = re_value;
            }
            Hook::SpiBufRead(unit) => {
                let unit = unit as usize;
                self.sync_spi_in(unit);
                let popped = self.spi.readbuf(unit);
                value = match nbytes {
                    1 => popped & 0xFF,
                    2 => popped & 0xFFFF,
                    _ => popped,
                };
                self.sync_spi_stat_out(unit);
            }
            Hook::RswrstRead => {
                let word = self.fabric.word(RSWRST);
                if word & 1 != 0 && self.config.exit_on_reset {
                    log::info!("RSWRST read with reset pending and exit_on_reset set");
                    std::process::exit(0);
                }
            }
            Hook::CnpuCnpdRead => {
                if self.config.debug_trace {
                    log::trace!("gated CNPU/CNPD debug read at {paddr:#x}");
                }
            }
            _ => {}
        }
        value
    }

    pub fn write(&mut self, paddr: u32, nbytes: u32, value: u32) {
        let effect = self.fabric.write(paddr, nbytes, value);
        let Effect::Write(hook) = effect else { return };
        let aligned = (paddr & IO_MEM_MASK) & !3;
        match hook {
            Hook::SysKeyWrite => {
                let written = self.fabric.word(SYSKEY);
                self.sys_unlock = match (self.sys_unlock, written) {
                    (0, SYSKEY_UNLOCK_1) => 1,
                    (1, SYSKEY_UNLOCK_2) => 2,
                    _ => 0,
                };
            }
            Hook::RswrstWrite => {
                let written = self.fabric.word(RSWRST);
                if self.sys_unlock == 2 && written & 1 != 0 {
                    self.io_reset();
                    self.cpu.soft_reset();
                }
            }
            Hook::IrqRecompute => {
                self.sync_irq_bank_from_fabric(aligned);
                self.irq.recompute();
                self.notify_cpu();
            }
            Hook::UartModeWrite(unit) => {
                let unit = unit as usize;
                self.sync_uart_in(unit);
                let edges = self.uart.update_mode(unit);
                self.sync_uart_sta_out(unit);
                self.apply_uart_edges(edges);
            }
            Hook::UartStaWrite(unit) => {
                let unit = unit as usize;
                self.sync_uart_in(unit);
                let edges = self.uart.update_status(unit);
                self.sync_uart_sta_out(unit);
                self.apply_uart_edges(edges);
            }
            Hook::UartTxRegWrite(unit) => {
                let unit = unit as usize;
                self.sync_uart_in(unit);
                let byte = self.fabric.word(uart_base(unit) + U_TXREG) as u8;
                let uart = &mut self.uart;
                let vtty_unit = &mut self.vtty[unit];
                uart.put_char(unit, byte, vtty_unit);
                self.sync_uart_sta_out(unit);
            }
            Hook::SpiConWrite(unit) => {
                let unit = unit as usize;
                self.sync_spi_in(unit);
                let cleared = self.spi.control(unit);
                self.sync_spi_stat_out(unit);
                for irq in cleared {
                    self.irq.clear(irq);
                }
                self.notify_cpu();
            }
            Hook::SpiStatWrite(unit) => {
                // Firmware can only clear SPIROV here; resync the model's
                // shadow copy with whatever the masked quartet produced.
                let unit = unit as usize;
                let base = spi_base(unit);
                self.spi.units[unit].stat = self.fabric.word(base + SPI_STAT);
            }
            Hook::SpiBufWrite(unit) => {
                let unit = unit as usize;
                self.sync_spi_in(unit);
                let base = spi_base(unit);
                let written = self.fabric.word(base + SPI_BUF);
                let spi = &mut self.spi;
                let sdcards = &mut self.sdcards;
                if spi.sdcard_unit == Some(unit) {
                    spi.writebuf(unit, written, Some(sdcards));
                } else {
                    spi.writebuf(unit, written, None);
                }
                self.sync_spi_stat_out(unit);
                if self.spi.units[unit].stat & devices::spi::SPISTAT_SPIRBF != 0 {
                    self.irq.raise(self.spi.irq_base[unit] + devices::spi::SPI_IRQ_RX);
                    self.notify_cpu();
                }
            }
            Hook::GpioLatWrite(port) => self.gpio_lat_write(port as usize, aligned),
            // Read-only hooks never appear as a write effect; the decoder
            // tables only attach them via `with_read_hook`.
            Hook::RswrstRead | Hook::UartRxRegRead(_) | Hook::UartStaRead(_)
            | Hook::SpiBufRead(_) | Hook::CnpuCnpdRead => {}
        }
    }

    fn sync_irq_bank_from_fabric(&mut self, aligned: u32) {
        let banks = self.variant.banks() as u32;
        if aligned >= IFS_BASE && aligned < IFS_BASE + 0x10 * banks && (aligned - IFS_BASE) % 0x10 == 0 {
            let n = ((aligned - IFS_BASE) / 0x10) as usize;
            self.irq.ifs[n] = self.fabric.word(aligned);
        } else if aligned >= IEC_BASE && aligned < IEC_BASE + 0x10 * banks && (aligned - IEC_BASE) % 0x10 == 0 {
            let n = ((aligned - IEC_BASE) / 0x10) as usize;
            self.irq.iec[n] = self.fabric.word(aligned);
        } else {
            let words = self.variant.ipc_words() as u32;
            if aligned >= IPC_BASE && aligned < IPC_BASE + 0x10 * words && (aligned - IPC_BASE) % 0x10 == 0 {
                let n = ((aligned - IPC_BASE) / 0x10) as usize;
                self.irq.ipc[n] = self.fabric.word(aligned);
            }
        }
    }

    /// Called once per CPU instruction slice (or at whatever cadence the
    /// embedder chooses): advances UART TX/RX polling and raises/clears the
    /// IRQs that implies.
    pub fn poll(&mut self) {
        let mut hosts: Vec<&mut dyn HostChannel> =
            self.vtty.iter_mut().map(|v| v as &mut dyn HostChannel).collect();
        let edges = self.uart.poll_all(&mut hosts);
        for unit in 0..devices::uart::NUM_UART {
            self.sync_uart_sta_out(unit);
        }
        self.apply_uart_edges(edges);
    }
}
