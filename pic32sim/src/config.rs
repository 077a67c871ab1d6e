//! Board profile: the handful of wiring facts a concrete PIC32 board fixes
//! (which SPI unit carries the SD card, which GPIO pin is its chip select,
//! which UART is the console) plus the boot configuration words a real
//! board's linker script burns into DEVCFG.

use serde::Deserialize;

/// Wiring and boot-configuration facts for one simulated board.
///
/// Constructing one from a file is out of scope for this crate (the board
/// profile is an external collaborator, per the simulator's own purpose
/// statement) — only [`BoardConfig::default`] and direct struct literals
/// are provided here. `Deserialize` lets an embedder parse its own format.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Index into the SPI bank that the SD card is wired to, if any.
    pub sdcard_spi_unit: Option<usize>,
    pub cs0_port: usize,
    pub cs0_pin: u32,
    pub cs1_port: usize,
    pub cs1_pin: u32,
    /// Index into the UART bank used as the console/VTTY line.
    pub console_uart: usize,
    pub devcfg0: u32,
    pub devcfg1: u32,
    pub devcfg2: u32,
    pub devcfg3: u32,
    pub devid: u32,
    pub osccon: u32,
    /// When set, a read of RSWRST with bit 0 set calls `process::exit(0)`
    /// instead of leaving the reset pending for the embedding CPU loop.
    pub exit_on_reset: bool,
    /// Gates the CNPUG/CNPDG debug-trace read side effect (§4.8).
    pub debug_trace: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            sdcard_spi_unit: None,
            cs0_port: 0,
            cs0_pin: 0,
            cs1_port: 0,
            cs1_pin: 1,
            console_uart: 0,
            devcfg0: 0xFFFF_FFFF,
            devcfg1: 0xFFFF_FFFF,
            devcfg2: 0xFFFF_FFFF,
            devcfg3: 0xFFFF_FFFF,
            devid: 0,
            osccon: 0,
            exit_on_reset: false,
            debug_trace: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_leaves_sdcard_unwired() {
        let cfg = BoardConfig::default();
        assert_eq!(cfg.sdcard_spi_unit, None);
        assert!(!cfg.exit_on_reset);
    }
}
