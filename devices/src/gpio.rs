//! Per-port GPIO registers. TRIS/LAT/PORT/ODC on both variants; MZ adds
//! ANSEL/CNPU/CNPD/CNCON/CNEN/CNSTAT. All are write-op-quartet storage;
//! LAT writes additionally run the SD chip-select hook.

/// One port's worth of GPIO storage. `port_read`/`port_write` share
/// backing storage with `lat` (a PORT write is a LAT write, per the
/// datasheet's "write forwards to LAT").
#[derive(Default, Clone, Copy)]
pub struct GpioPort {
    pub tris: u32,
    pub lat: u32,
    pub odc: u32,
    /// MZ-only; unused (stays zero) on MX7.
    pub ansel: u32,
    pub cnpu: u32,
    pub cnpd: u32,
    pub cncon: u32,
    pub cnen: u32,
    pub cnstat: u32,
}

impl GpioPort {
    pub fn reset_mx7(&mut self) {
        self.tris = 0xFFFF;
        self.lat = 0xFFFF;
        self.odc = 0;
    }

    pub fn reset_mz(&mut self) {
        self.reset_mx7();
        self.ansel = 0xFFFF;
        self.cnpu = 0;
        self.cnpd = 0;
        self.cncon = 0;
        self.cnen = 0;
        self.cnstat = 0;
    }

    /// PORT read returns the current LAT value (no separate input latch
    /// model; this simulator does not drive external pin state).
    pub fn port_read(&self) -> u32 {
        self.lat
    }
}

pub const NUM_PORTS: usize = 7; // A..G

pub struct GpioBank {
    pub ports: [GpioPort; NUM_PORTS],
}

impl Default for GpioBank {
    fn default() -> Self {
        GpioBank { ports: [GpioPort::default(); NUM_PORTS] }
    }
}

impl GpioBank {
    /// Checks whether a LAT write on `port` changed the SD chip-select
    /// bit; if so, returns `(unit, now_selected)` per the active-low CS
    /// convention (`sdcard_select(unit, !bit)`).
    pub fn cs_edge(
        &self,
        port: usize,
        old_lat: u32,
        cs_port0: Option<(usize, u32)>,
        cs_port1: Option<(usize, u32)>,
    ) -> Vec<(usize, bool)> {
        let mut edges = Vec::new();
        let new_lat = self.ports[port].lat;
        if let Some((cs_port, cs_mask)) = cs_port0 {
            if cs_port == port && cs_mask != 0 && (old_lat & cs_mask) != (new_lat & cs_mask) {
                edges.push((0, new_lat & cs_mask == 0));
            }
        }
        if let Some((cs_port, cs_mask)) = cs_port1 {
            if cs_port == port && cs_mask != 0 && (old_lat & cs_mask) != (new_lat & cs_mask) {
                edges.push((1, new_lat & cs_mask == 0));
            }
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lat_write_toggles_chip_select() {
        let mut bank = GpioBank::default();
        let old = bank.ports[2].lat; // port C, all-ones reset default
        bank.ports[2].lat = old & !(1 << 3); // clear bit 3 (active pin low)
        let edges = bank.cs_edge(2, old, Some((2, 1 << 3)), None);
        assert_eq!(edges, vec![(0, true)]);
    }

    #[test]
    fn no_edge_when_unrelated_bits_change() {
        let mut bank = GpioBank::default();
        let old = bank.ports[2].lat;
        bank.ports[2].lat = old & !(1 << 5);
        let edges = bank.cs_edge(2, old, Some((2, 1 << 3)), None);
        assert!(edges.is_empty());
    }
}
