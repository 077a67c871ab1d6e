//! The narrow seam this crate calls into the embedding MIPS interpreter
//! through. `read_callback`/`write_callback` from the original interface
//! are realized directly as `IoFabric::read`/`IoFabric::write` rather than
//! a redundant adapter method, since their shape already matches.

/// Implemented by the embedding CPU: receives interrupt vector/priority
/// updates and soft-reset notifications from the simulated peripherals.
pub trait CpuAdapter {
    /// The IRQ controller picked a new winning vector at priority `ripl`
    /// (0 means no interrupt pending).
    fn set_vector(&mut self, ripl: u8, vector: u32);

    /// RSWRST was written with bit 0 set and the unlock sequence was
    /// satisfied: the CPU should restart execution at its reset vector.
    fn soft_reset(&mut self);
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::CpuAdapter;

    #[derive(Default)]
    pub struct RecordingCpu {
        pub vectors: Vec<(u8, u32)>,
        pub resets: u32,
    }

    impl CpuAdapter for RecordingCpu {
        fn set_vector(&mut self, ripl: u8, vector: u32) {
            self.vectors.push((ripl, vector));
        }

        fn soft_reset(&mut self) {
            self.resets += 1;
        }
    }
}
