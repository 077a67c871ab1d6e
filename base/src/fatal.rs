/// Log `msg` at error level and terminate the process with a non-zero
/// status.
///
/// Used for the handful of conditions the design treats as fail-fast:
/// an unknown peripheral register, a non-word-sized I/O write, or a CPU
/// machine-check. These almost always mean firmware built for the wrong
/// chip variant is running, and must never be silently tolerated.
pub fn fatal(msg: impl AsRef<str>) -> ! {
    log::error!("{}", msg.as_ref());
    std::process::exit(1)
}
