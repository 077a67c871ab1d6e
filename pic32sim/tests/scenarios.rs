//! End-to-end coverage of the assembled `Soc`, driven entirely through its
//! public `read`/`write`/`poll` surface: register-decoder round trips, IRQ
//! arbitration, UART-over-VTTY loopback, SD-card command flow and GPIO
//! chip-select wiring.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use devices::io_fabric::IO_MEM_START;
use devices::variant::offsets::*;
use pic32sim::{BoardConfig, CpuAdapter, Soc, Variant};

/// `pic32sim::cpu::test_support::RecordingCpu` is crate-private, so
/// integration tests need their own `CpuAdapter`.
#[derive(Default)]
struct RecordingCpu {
    vectors: Vec<(u8, u32)>,
    resets: u32,
}

impl CpuAdapter for RecordingCpu {
    fn set_vector(&mut self, ripl: u8, vector: u32) {
        self.vectors.push((ripl, vector));
    }

    fn soft_reset(&mut self) {
        self.resets += 1;
    }
}

fn addr(offset: u32) -> u32 {
    IO_MEM_START + offset
}

fn disconnected_vtty() -> Vec<vtty::VttyUnit> {
    (0..devices::uart::NUM_UART)
        .map(|i| vtty::spawn(format!("u{i}"), vtty::Backend::None).unwrap())
        .collect()
}

fn new_soc(variant: Variant, config: BoardConfig) -> Soc<RecordingCpu> {
    Soc::new(variant, config, RecordingCpu::default(), vec![], disconnected_vtty())
}

fn gpio_tris(port: usize) -> u32 {
    GPIO_BASE + GPIO_STRIDE * port as u32 + G_TRIS
}

fn gpio_lat(port: usize) -> u32 {
    GPIO_BASE + GPIO_STRIDE * port as u32 + G_LAT
}

fn uart_reg(unit: usize, sub: u32) -> u32 {
    UART_BASE + UART_STRIDE * unit as u32 + sub
}

fn spi_reg(unit: usize, sub: u32) -> u32 {
    SPI_BASE + SPI_STRIDE * unit as u32 + sub
}

// ---- invariant 1: quartet write-op round trip ------------------------------

#[test]
fn quartet_set_clr_inv_round_trip_through_soc() {
    let mut soc = new_soc(Variant::Mx7, BoardConfig::default());
    let base = gpio_tris(0);
    assert_eq!(soc.read(addr(base), 4), 0xFFFF); // reset default

    soc.write(addr(base) + 4, 4, 0x00FF); // CLR
    assert_eq!(soc.read(addr(base), 4), 0xFF00);

    soc.write(addr(base) + 8, 4, 0x000F); // SET
    assert_eq!(soc.read(addr(base), 4), 0xFF0F);

    soc.write(addr(base) + 12, 4, 0xFFFF); // INV
    assert_eq!(soc.read(addr(base), 4), 0x00F0);
}

// ---- invariant 2: sub-word write matches an equivalent word write ---------

#[test]
fn halfword_write_lands_on_the_targeted_lane() {
    let mut soc = new_soc(Variant::Mx7, BoardConfig::default());
    soc.write(addr(CFGCON), 4, 0);
    soc.write(addr(CFGCON) + 2, 2, 0x1234);
    assert_eq!(soc.read(addr(CFGCON), 4), 0x1234_0000);
}

// ---- invariant 3/4: IRQ priority arbitration --------------------------------

#[test]
fn higher_priority_irq_wins_and_reaches_intstat() {
    let mut soc = new_soc(Variant::Mx7, BoardConfig::default());

    // IRQ 1 -> vector 1 (MX7 table is the identity in this range). Enable
    // it with priority 5: IPC word 0, field at bit 2+(1&3)*8 = 10.
    // IRQ 2 -> vector 2, priority 2 (bit 2+(2&3)*8 = 18): should not win.
    soc.write(addr(IEC_BASE), 4, (1 << 1) | (1 << 2));
    soc.write(addr(IPC_BASE), 4, (5 << 10) | (2 << 18));
    soc.write(addr(IFS_BASE), 4, (1 << 1) | (1 << 2));

    assert_eq!(soc.intstat(), 1 | (5 << 8));
    assert_eq!(soc.cpu().vectors.last(), Some(&(5, 1)));
}

// Scenario (d): cross-bank arbitration. IFS0 bit 1 (irq 1) at priority 5
// beats IFS1 bit 0 (irq 32) at priority 3, exercising `recompute()` across
// more than one IFS/IEC bank. MZ is direct-vector (vector == irq), so irq
// 32's priority lives in IPC word 32>>2 = 8, matching the scenario's own
// numbers.
#[test]
fn cross_bank_irq_priority_arbitration() {
    let mut soc = new_soc(Variant::Mz, BoardConfig::default());

    soc.write(addr(IEC_BASE), 4, 1 << 1);
    soc.write(addr(IPC_BASE), 4, 5 << 10);

    soc.write(addr(IEC_BASE) + 0x10, 4, 1); // IEC1 bit 0 -> irq 32
    soc.write(addr(IPC_BASE) + 0x10 * 8, 4, 3 << 2); // IPC8

    soc.write(addr(IFS_BASE) + 0x10, 4, 1); // IFS1 bit 0
    soc.write(addr(IFS_BASE), 4, 1 << 1); // IFS0 bit 1

    assert_eq!(soc.intstat(), 1 | (5 << 8));
}

#[test]
fn priority_zero_irq_never_wins() {
    let mut soc = new_soc(Variant::Mx7, BoardConfig::default());
    soc.write(addr(IEC_BASE), 4, 1 << 3);
    soc.write(addr(IPC_BASE), 4, 0);
    soc.write(addr(IFS_BASE), 4, 1 << 3);
    assert_eq!(soc.intstat(), 0);
}

// ---- invariant 5: SPI enhanced-buffer FIFO with no SD card attached -------

#[test]
fn spi_enhanced_buffer_fifo_returns_idle_byte_with_no_card() {
    let mut soc = new_soc(Variant::Mx7, BoardConfig::default());
    let con = spi_reg(0, SPI_CON);
    soc.write(addr(con), 4, devices::spi::SPICON_ON | devices::spi::SPICON_ENHBUF);

    let buf = spi_reg(0, SPI_BUF);
    for i in 0..4u32 {
        soc.write(addr(buf), 1, i);
    }
    assert_ne!(soc.read(addr(spi_reg(0, SPI_STAT)), 4) & devices::spi::SPISTAT_SPIRBF, 0);
    for _ in 0..4 {
        assert_eq!(soc.read(addr(buf), 1), 0xFF);
    }
}

// ---- scenario (a): SYSKEY unlock + RSWRST resets every peripheral --------

#[test]
fn syskey_unlock_and_soft_reset_restores_defaults() {
    let mut soc = new_soc(Variant::Mx7, BoardConfig::default());

    // Disturb GPIO, UART and SPI state away from their reset values.
    soc.write(addr(gpio_tris(0)) + 4, 4, 0xFFFF); // clear all TRISA bits
    soc.write(addr(uart_reg(0, U_MODE)), 4, devices::uart::UMODE_ON);
    soc.write(
        addr(uart_reg(0, U_STA)),
        4,
        devices::uart::USTA_UTXEN | devices::uart::USTA_URXEN,
    );
    soc.write(addr(spi_reg(0, SPI_CON)), 4, devices::spi::SPICON_ON);

    assert_eq!(soc.read(addr(gpio_tris(0)), 4), 0);

    soc.write(addr(SYSKEY), 4, 0xAA99_6655);
    soc.write(addr(SYSKEY), 4, 0x5566_99AA);
    soc.write(addr(RSWRST) + 8, 4, 1); // SET alias, bit 0

    assert_eq!(soc.read(addr(gpio_tris(0)), 4), 0xFFFF);
    assert_eq!(
        soc.read(addr(uart_reg(0, U_STA)), 4),
        devices::uart::USTA_RIDLE | devices::uart::USTA_TRMT
    );
    assert_eq!(soc.read(addr(spi_reg(0, SPI_STAT)), 4), devices::spi::SPISTAT_SPITBE);
    assert_eq!(soc.cpu().resets, 1);
}

#[test]
fn rswrst_without_full_unlock_sequence_is_ignored() {
    let mut soc = new_soc(Variant::Mx7, BoardConfig::default());
    soc.write(addr(SYSKEY), 4, 0xAA99_6655); // only the first word
    soc.write(addr(RSWRST) + 8, 4, 1);
    assert_eq!(soc.cpu().resets, 0);
}

// ---- scenario (b): UART TX loopback through a real VTTY TCP connection ----

fn connect_with_retries(port: u16) -> TcpStream {
    for _ in 0..50 {
        if let Ok(stream) = TcpStream::connect(("127.0.0.1", port)) {
            return stream;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("could not connect to vtty test server on port {port}");
}

#[test]
fn uart_tx_reaches_the_host_in_order_with_one_coalesced_irq() {
    let port = 18423;
    let console = vtty::spawn("console", vtty::Backend::Tcp(port)).unwrap();
    let mut vtty_units = disconnected_vtty();
    vtty_units[0] = console;

    let mut soc = Soc::new(
        Variant::Mx7,
        BoardConfig::default(),
        RecordingCpu::default(),
        vec![],
        vtty_units,
    );

    let mut client = connect_with_retries(port);
    client.set_read_timeout(Some(Duration::from_millis(500))).unwrap();
    let mut negotiation = [0u8; 64];
    let n = client.read(&mut negotiation).unwrap();
    assert!(n > 0);
    // Let the accept thread finish installing its writer before TX bytes
    // start flowing (it assigns `shared.writer` right after this write).
    std::thread::sleep(Duration::from_millis(50));

    // Wire up the TX IRQ so the coalesced-raise count is observable via
    // INTSTAT: UART1 TX is irq_base[0]+2 = 28, mapped by the MX7 table to
    // vector 24.
    soc.write(addr(IEC_BASE), 4, 1 << 28);
    soc.write(addr(IPC_BASE) + 0x10 * 6, 4, 3 << 2);

    soc.write(addr(uart_reg(0, U_MODE)), 4, devices::uart::UMODE_ON);
    soc.write(addr(uart_reg(0, U_STA)), 4, devices::uart::USTA_UTXEN);

    for &byte in b"Hi\n" {
        soc.write(addr(uart_reg(0, U_TXREG)), 4, byte as u32);
    }

    let mut rising_edges = 0;
    let mut was_pending = soc.intstat() != 0;
    for _ in 0..8 {
        soc.poll();
        let pending = soc.intstat() != 0;
        if pending && !was_pending {
            rising_edges += 1;
        }
        was_pending = pending;
    }
    assert_eq!(rising_edges, 1);
    assert_eq!(soc.intstat(), 24 | (3 << 8));

    let mut received = [0u8; 3];
    client.read_exact(&mut received).unwrap();
    assert_eq!(&received, b"Hi\n");
}

// ---- scenario (c)/(e): GPIO chip select wiring + SD probe/read -----------

fn soc_with_sdcard_wired(variant: Variant, card: disk::SdCard) -> Soc<RecordingCpu> {
    let mut config = BoardConfig::default();
    config.sdcard_spi_unit = Some(0);
    config.cs0_port = 2; // port C
    config.cs0_pin = 3;
    Soc::new(variant, config, RecordingCpu::default(), vec![card], disconnected_vtty())
}

fn select_sdcard(soc: &mut Soc<RecordingCpu>) {
    // Active-low: clearing the CS pin selects the card.
    soc.write(addr(gpio_lat(2)) + 4, 4, 1 << 3);
}

fn spi_xfer(soc: &mut Soc<RecordingCpu>, unit: usize, byte: u8) -> u8 {
    soc.write(addr(spi_reg(unit, SPI_BUF)), 1, byte as u32);
    soc.read(addr(spi_reg(unit, SPI_BUF)), 1) as u8
}

fn card_with_blocks(nblocks: u64) -> disk::SdCard {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(&vec![0u8; (nblocks * 512) as usize]).unwrap();
    disk::SdCard::open("sd0", f.path()).unwrap()
}

#[test]
fn gpio_lat_write_toggles_sdcard_chip_select() {
    let card = disk::SdCard::empty("sd0");
    let mut soc = soc_with_sdcard_wired(Variant::Mz, card);

    assert!(!soc.sdcard_selected(0));
    select_sdcard(&mut soc);
    assert!(soc.sdcard_selected(0));

    soc.write(addr(gpio_lat(2)) + 8, 4, 1 << 3); // SET: drive CS back high
    assert!(!soc.sdcard_selected(0));
}

#[test]
fn gpio_port_write_is_aliased_to_lat() {
    let mut soc = new_soc(Variant::Mx7, BoardConfig::default());
    soc.write(addr(gpio_lat(1)) + 4, 4, 0xFFFF); // clear all of LATB
    assert_eq!(soc.read(addr(gpio_lat(1)), 4), 0);
    // PORT read mirrors LAT (no separate input-latch model).
    assert_eq!(soc.read(addr(GPIO_BASE + GPIO_STRIDE + G_PORT), 4), 0);
}

#[test]
fn sd_probe_and_read_block_zero() {
    let mut data = vec![0u8; 512 * 4];
    for (i, b) in data.iter_mut().take(512).enumerate() {
        *b = i as u8;
    }
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(&data).unwrap();
    let card = disk::SdCard::open("sd0", f.path()).unwrap();

    let mut soc = soc_with_sdcard_wired(Variant::Mx7, card);
    soc.write(addr(spi_reg(0, SPI_CON)), 4, devices::spi::SPICON_ON);
    select_sdcard(&mut soc);

    // CMD0: GO_IDLE_STATE -> R1 0x01 after 7 clocked bytes.
    for &b in &[0x40, 0, 0, 0, 0, 0x95] {
        spi_xfer(&mut soc, 0, b);
    }
    assert_eq!(spi_xfer(&mut soc, 0, 0xFF), 0x01);

    // CMD17: READ_SINGLE_BLOCK at offset 0.
    let mut replies = Vec::new();
    for &b in &[0x51u8, 0, 0, 0, 0, 0xFF] {
        replies.push(spi_xfer(&mut soc, 0, b));
    }
    replies.push(spi_xfer(&mut soc, 0, 0xFF)); // R1
    for _ in 0..(1 + 512 + 2) {
        replies.push(spi_xfer(&mut soc, 0, 0xFF));
    }
    let token_pos = replies.iter().position(|&b| b == 0xFE).unwrap();
    let block = &replies[token_pos + 1..token_pos + 1 + 512];
    let expected: Vec<u8> = (0..512u32).map(|i| i as u8).collect();
    assert_eq!(block, expected.as_slice());
}

// ---- invariant 7: SD CMD24 write-then-read is idempotent through Soc -----

#[test]
fn sd_write_then_read_round_trips_through_soc() {
    let card = card_with_blocks(4);
    let mut soc = soc_with_sdcard_wired(Variant::Mx7, card);
    soc.write(addr(spi_reg(0, SPI_CON)), 4, devices::spi::SPICON_ON);
    select_sdcard(&mut soc);

    let payload = vec![0xABu8; 512];
    let mut bytes = vec![0x58u8, 0, 0, 0, 0, 0xFF, 0xFF, 0xFEu8];
    bytes.extend_from_slice(&payload);
    // CRC plus one extra clock, per the `7 + blen + 2 + 2` accept check.
    bytes.extend_from_slice(&[0xFF, 0xFF, 0xFF]);

    let mut saw_accept = false;
    for &b in &bytes {
        if spi_xfer(&mut soc, 0, b) == 0x05 {
            saw_accept = true;
        }
    }
    assert!(saw_accept);

    let mut replies = Vec::new();
    for &b in &[0x51u8, 0, 0, 0, 0, 0xFF] {
        replies.push(spi_xfer(&mut soc, 0, b));
    }
    replies.push(spi_xfer(&mut soc, 0, 0xFF)); // R1
    for _ in 0..(1 + 512 + 2) {
        replies.push(spi_xfer(&mut soc, 0, 0xFF));
    }
    let token_pos = replies.iter().position(|&b| b == 0xFE).unwrap();
    let data = &replies[token_pos + 1..token_pos + 1 + 512];
    assert_eq!(data, payload.as_slice());
}

// ---- scenario (f): unknown register access -------------------------------
//
// The decoder's unknown-register path calls `base::fatal`, which exits the
// process outright — not something an in-process test can trigger without
// killing the test binary itself. What *is* testable without a subprocess
// harness is the precondition that makes that path reachable: confirming
// the address scenario (f) names is genuinely absent from the MZ table.
#[test]
fn scenario_f_unknown_address_is_absent_from_the_mz_table() {
    let table = devices::variant::mz::build();
    assert!(!table.contains_key(&0x4000));
}
