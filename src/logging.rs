//! Logger installation.
//!
//! The crate logs through the `log` facade only. Hosts that already install
//! a logger skip [`init`]. A second call returns an error and leaves the
//! first logger in place.

use log::LevelFilter;

use crate::error::{GridError, Result};

/// Install a logger for the current target: the browser console on wasm32,
/// a stderr terminal logger natively.
pub fn init(level: LevelFilter) -> Result<()> {
    install(level).map_err(|e| GridError::Other(format!("logger: {e}")))
}

#[cfg(not(target_arch = "wasm32"))]
fn install(level: LevelFilter) -> std::result::Result<(), log::SetLoggerError> {
    use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)
}

#[cfg(target_arch = "wasm32")]
fn install(level: LevelFilter) -> std::result::Result<(), log::SetLoggerError> {
    log::set_logger(&CONSOLE_LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(target_arch = "wasm32")]
static CONSOLE_LOGGER: ConsoleLogger = ConsoleLogger;

/// Forwards records to `console.*` by level.
#[cfg(target_arch = "wasm32")]
struct ConsoleLogger;

#[cfg(target_arch = "wasm32")]
impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = wasm_bindgen::JsValue::from_str(&format!(
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        ));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&line),
            log::Level::Warn => web_sys::console::warn_1(&line),
            log::Level::Info => web_sys::console::info_1(&line),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}
