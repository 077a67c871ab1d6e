use once_cell::sync::OnceCell;

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize the process-wide logger exactly once.
///
/// Safe to call from every crate's test module and from the simulator's
/// own startup path; later calls are no-ops.
pub fn init_logging() {
    LOGGER_INIT.get_or_init(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .format_timestamp_millis()
            .try_init();
    });
}
