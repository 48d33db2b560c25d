//! Diagnostic sink glue for the `log` facade.
//!
//! The crate only emits records; where they end up (a UART, a ring buffer)
//! is up to whoever calls [`init_logger`].

use ::log::{LevelFilter, Metadata, Record, SetLoggerError};
use spin::Mutex;

/// Receives every enabled record.
pub type Sink = fn(&Record<'_>);

struct KernelLogger {
    sink: Mutex<Option<Sink>>,
}

impl ::log::Log for KernelLogger {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        self.sink.lock().is_some()
    }
    fn log(&self, record: &Record<'_>) {
        // Copy the sink out so a sink that logs cannot deadlock on us
        let sink = *self.sink.lock();
        if let Some(sink) = sink {
            sink(record);
        }
    }
    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger {
    sink: Mutex::new(None),
};

pub fn init_logger(sink: Sink, level: LevelFilter) -> Result<(), SetLoggerError> {
    *LOGGER.sink.lock() = Some(sink);
    ::log::set_logger(&LOGGER)?;
    ::log::set_max_level(level);
    ::log::info!("Logger initialized.");
    Ok(())
}

pub use ::log::{debug, error, info, trace, warn};
