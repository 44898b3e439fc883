// Copyright The Rusted TEE Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Glue between the `log` facade and the active console.
//!
//! The sink registered here is normally the console slot of the bring-up
//! context, which is how a console "registered with the trace subsystem"
//! is rendered: swapping the active console descriptor redirects all trace
//! output without touching the logger again.

use crate::debug::DEBUG;
use core::fmt::Arguments;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Once;

static LOGGER: Once<Logger> = Once::new();

struct Logger {
    sink: &'static dyn LogSink,
}

impl Log for Logger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        writeln!(self.sink, "{}: {}", record.level(), record.args());
    }

    fn flush(&self) {
        self.sink.flush();
    }
}

/// Initialises the logger with the given sink.
///
/// Logs sent before this is called are ignored. Only the first call installs
/// its sink; later calls fail with [`SetLoggerError`].
pub fn init(sink: &'static dyn LogSink) -> Result<(), SetLoggerError> {
    let logger = LOGGER.call_once(|| Logger { sink });
    log::set_logger(logger)?;
    log::set_max_level(build_time_log_level());
    Ok(())
}

/// Returns the logging [`LevelFilter`] set by the build-time environment variable `LOG_LEVEL`.
/// `LOG_LEVEL` can have the lower-case string values "off", "error", "warn", "info", "debug", or
/// "trace", corresponding to the named values of [`LevelFilter`]. If `LOG_LEVEL` is absent or has
/// some other value, this function returns `LevelFilter::Debug` if [`DEBUG`] is true, otherwise
/// `LevelFilter::Info`.
pub const fn build_time_log_level() -> LevelFilter {
    let level = match option_env!("LOG_LEVEL") {
        Some(level) => level,
        None => "",
    };
    match level.as_bytes() {
        b"off" => LevelFilter::Off,
        b"error" => LevelFilter::Error,
        b"warn" => LevelFilter::Warn,
        b"info" => LevelFilter::Info,
        b"debug" => LevelFilter::Debug,
        b"trace" => LevelFilter::Trace,
        _ => {
            if DEBUG {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            }
        }
    }
}

/// Something to which logs can be sent.
///
/// Note that unlike `core::fmt::Write`, the `write_fmt` method on this trait takes `&self` rather
/// than `&mut self`. This means that the implementation is responsible for handling locking if
/// necessary, or can be made lock-free.
pub trait LogSink: Sync {
    /// Writes the given format arguments to the log sink.
    fn write_fmt(&self, args: Arguments);

    /// Blocks until everything written so far has reached the device.
    fn flush(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct VecSink(Mutex<String>);

    impl LogSink for VecSink {
        fn write_fmt(&self, args: Arguments) {
            use core::fmt::Write;
            let _ = self.0.lock().unwrap().write_fmt(args);
        }

        fn flush(&self) {}
    }

    #[test]
    fn sink_receives_lines() {
        let sink = VecSink(Mutex::new(String::new()));
        writeln!(&sink, "hello {}", 42);
        assert_eq!(sink.0.lock().unwrap().as_str(), "hello 42\n");
    }

    #[test]
    fn default_level_tracks_debug() {
        let level = build_time_log_level();
        if DEBUG {
            assert_eq!(level, LevelFilter::Debug);
        } else {
            assert_eq!(level, LevelFilter::Info);
        }
    }
}
