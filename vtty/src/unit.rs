//! One virtual TTY line: a ring buffer fed by a background reader thread,
//! plus a writer half the UART model pushes transmitted bytes into.
//! Grounded on `vtty_get_char`/`vtty_put_char`/`vtty_is_char_avail`.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use devices::uart::HostChannel;

use crate::ring::RingBuffer;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConnState {
    /// No backend configured at all (`VTTY_STATE_TCP_INVALID` equivalent,
    /// also covers a plain local tty that is simply always "running").
    Invalid,
    Waiting,
    Running,
}

pub(crate) struct Shared {
    pub ring: Mutex<RingBuffer>,
    pub writer: Mutex<Option<Box<dyn Write + Send>>>,
    pub state: Mutex<ConnState>,
    /// Set once a dropped-output warning has been logged for this unit, so
    /// further drops stay silent (spec's single documented exception to
    /// "silently-handled" conditions going unlogged).
    pub warned_dropped: AtomicBool,
}

/// Host-side endpoint for one UART unit. Implements [`HostChannel`] so a
/// `devices::uart::UartBank` can be wired straight to it.
pub struct VttyUnit {
    pub(crate) name: String,
    pub(crate) shared: Arc<Shared>,
}

impl VttyUnit {
    pub(crate) fn new(name: impl Into<String>, initial: ConnState) -> (Self, Arc<Shared>) {
        let shared = Arc::new(Shared {
            ring: Mutex::new(RingBuffer::new()),
            writer: Mutex::new(None),
            state: Mutex::new(initial),
            warned_dropped: AtomicBool::new(false),
        });
        (VttyUnit { name: name.into(), shared: shared.clone() }, shared)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ConnState {
        *self.shared.state.lock().unwrap()
    }
}

impl HostChannel for VttyUnit {
    fn get_char(&mut self) -> Option<u8> {
        self.shared.ring.lock().unwrap().get()
    }

    fn put_char(&mut self, byte: u8) {
        let mut writer = self.shared.writer.lock().unwrap();
        match writer.as_mut() {
            Some(w) => {
                if let Err(e) = w.write_all(&[byte]) {
                    log::warn!("{}: write failed: {e}", self.name);
                }
            }
            None => {
                if !self.shared.warned_dropped.swap(true, Ordering::Relaxed) {
                    log::warn!("{}: not configured, dropping output", self.name);
                }
            }
        }
    }

    fn is_char_avail(&self) -> bool {
        self.shared.ring.lock().unwrap().is_avail()
    }
}
