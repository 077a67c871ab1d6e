//! Background I/O threads that feed a [`VttyUnit`]'s ring buffer and own
//! its transmit writer. Grounded on `vtty_thread_main`/`vtty_wait`: a TCP
//! backend waits for a client, negotiates Telnet options, then shuttles
//! bytes through a [`TelnetFilter`](crate::telnet::TelnetFilter) until the
//! client drops, at which point it goes back to waiting.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use crate::telnet::TelnetFilter;
use crate::unit::{ConnState, Shared, VttyUnit};

/// How a [`VttyUnit`] gets its bytes.
pub enum Backend {
    /// No host connection; reads never produce data, writes are dropped.
    None,
    /// The process's own stdin/stdout.
    Local,
    /// A TCP server socket on `127.0.0.1:port`; one client at a time.
    Tcp(u16),
}

/// Spawns whatever background threads `backend` needs and returns the
/// [`VttyUnit`] the UART model drives.
pub fn spawn(name: impl Into<String>, backend: Backend) -> base::Result<VttyUnit> {
    let name = name.into();
    match backend {
        Backend::None => {
            let (unit, _shared) = VttyUnit::new(name, ConnState::Invalid);
            Ok(unit)
        }
        Backend::Local => {
            let (unit, shared) = VttyUnit::new(name.clone(), ConnState::Running);
            *shared.writer.lock().unwrap() = Some(Box::new(std::io::stdout()));
            spawn_reader(name, shared, Box::new(std::io::stdin()), false);
            Ok(unit)
        }
        Backend::Tcp(port) => {
            let listener = TcpListener::bind(("127.0.0.1", port))?;
            let (unit, shared) = VttyUnit::new(name.clone(), ConnState::Waiting);
            thread::Builder::new()
                .name(format!("vtty-{name}-accept"))
                .spawn(move || accept_loop(name, listener, shared))
                .expect("failed to spawn vtty accept thread");
            Ok(unit)
        }
    }
}

fn accept_loop(name: String, listener: TcpListener, shared: Arc<Shared>) {
    loop {
        let (stream, peer) = match listener.accept() {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("{name}: accept failed: {e}");
                continue;
            }
        };
        log::info!("{name}: connection from {peer}");
        *shared.state.lock().unwrap() = ConnState::Running;
        let mut writer = stream.try_clone().expect("tcp stream clone");
        if let Err(e) = writer.write_all(&TelnetFilter::initial_negotiation()) {
            log::warn!("{name}: negotiation write failed: {e}");
        }
        *shared.writer.lock().unwrap() = Some(Box::new(writer));
        // Blocks until the client disconnects; only one connection is
        // serviced at a time, matching the original's single active fd.
        spawn_reader_blocking(&name, &shared, Box::new(stream), true);
        *shared.writer.lock().unwrap() = None;
        *shared.state.lock().unwrap() = ConnState::Waiting;
        log::info!("{name}: connection from {peer} closed");
    }
}

fn spawn_reader(name: String, shared: Arc<Shared>, reader: Box<dyn Read + Send>, telnet: bool) {
    thread::Builder::new()
        .name(format!("vtty-{name}-read"))
        .spawn(move || spawn_reader_blocking(&name, &shared, reader, telnet))
        .expect("failed to spawn vtty reader thread");
}

fn spawn_reader_blocking(
    name: &str,
    shared: &Arc<Shared>,
    mut reader: Box<dyn Read + Send>,
    telnet: bool,
) {
    let mut filter = TelnetFilter::new();
    let mut chunk = [0u8; 256];
    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                log::warn!("{name}: read failed: {e}");
                break;
            }
        };
        for &byte in &chunk[..n] {
            for app_byte in filter.feed(byte) {
                if let Err(e) = shared.ring.lock().unwrap().store(app_byte) {
                    log::warn!("{name}: {e}");
                }
            }
        }
        if telnet {
            let replies = filter.take_replies();
            if !replies.is_empty() {
                if let Some(w) = shared.writer.lock().unwrap().as_mut() {
                    let _ = w.write_all(&replies);
                }
            }
        }
    }
}
